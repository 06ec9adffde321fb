use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Tri-state review marking attached to an asset by Lightroom.
///
/// Serialized as `"reject"`, `"pick"` or `null`, which is the shape the
/// rejected-records file has always used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReviewFlag {
    Reject,
    Pick,
    #[default]
    None,
}

impl ReviewFlag {
    /// Parse the `flag` value found under `payload.reviews.<user>.flag`.
    /// Anything other than the two known markers counts as unflagged.
    pub fn from_api(value: Option<&str>) -> Self {
        match value {
            Some("reject") => Self::Reject,
            Some("pick") => Self::Pick,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Self::Reject => Some("reject"),
            Self::Pick => Some("pick"),
            Self::None => None,
        }
    }
}

impl std::fmt::Display for ReviewFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str().unwrap_or("UNFLAGGED"))
    }
}

impl Serialize for ReviewFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_str() {
            Some(s) => serializer.serialize_str(s),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for ReviewFlag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(Self::from_api(raw.as_deref()))
    }
}

/// Which of the asset's dates drives year filtering and date buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DateField {
    /// When the photo was imported into Lightroom.
    #[default]
    Import,
    /// When the asset record was last synced to the cloud.
    Sync,
    /// When the photo was taken.
    Capture,
}

impl DateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Sync => "sync",
            Self::Capture => "capture",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_flag_from_api() {
        assert_eq!(ReviewFlag::from_api(Some("reject")), ReviewFlag::Reject);
        assert_eq!(ReviewFlag::from_api(Some("pick")), ReviewFlag::Pick);
        assert_eq!(ReviewFlag::from_api(Some("unflagged")), ReviewFlag::None);
        assert_eq!(ReviewFlag::from_api(None), ReviewFlag::None);
    }

    #[test]
    fn test_review_flag_serializes_none_as_null() {
        assert_eq!(serde_json::to_string(&ReviewFlag::None).unwrap(), "null");
        assert_eq!(
            serde_json::to_string(&ReviewFlag::Reject).unwrap(),
            "\"reject\""
        );
    }

    #[test]
    fn test_review_flag_deserialize() {
        let flag: ReviewFlag = serde_json::from_str("\"pick\"").unwrap();
        assert_eq!(flag, ReviewFlag::Pick);
        let flag: ReviewFlag = serde_json::from_str("null").unwrap();
        assert_eq!(flag, ReviewFlag::None);
    }

    #[test]
    fn test_review_flag_display() {
        assert_eq!(ReviewFlag::Reject.to_string(), "reject");
        assert_eq!(ReviewFlag::None.to_string(), "UNFLAGGED");
    }
}
