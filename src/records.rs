//! The rejected-records JSON file handed from `list-rejected` to `delete-pairs`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::dates;
use crate::lightroom::asset::link_href;
use crate::lightroom::{Asset, AssetMetadata};
use crate::types::{DateField, ReviewFlag};

#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{}: expected a JSON array or an object with a `photos` array", .0.display())]
    Shape(PathBuf),
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_href<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(link_href))
}

/// Persisted snapshot of an asset.
///
/// Reconciliation works from this form only, so every date source it needs
/// lives in `updated_date` or `metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub updated_date: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default, deserialize_with = "lenient_href")]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub album_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: AssetMetadata,
    #[serde(default)]
    pub flag: ReviewFlag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_api_data: Option<Value>,
}

impl RejectedRecord {
    /// Filename, if present and non-empty.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref().filter(|f| !f.is_empty())
    }

    /// Resolve the record's date from one source only.
    pub fn date(&self, field: DateField) -> Option<DateTime<FixedOffset>> {
        match field {
            DateField::Import => self.metadata.import_date(),
            DateField::Capture => self.metadata.capture_date(),
            DateField::Sync => self
                .updated_date
                .as_deref()
                .and_then(dates::parse_timestamp),
        }
    }
}

impl From<&Asset> for RejectedRecord {
    fn from(asset: &Asset) -> Self {
        Self {
            id: asset.id().to_string(),
            filename: Some(asset.filename().to_string()),
            updated_date: asset.updated_at().map(|d| d.to_rfc3339()),
            file_size: asset.file_size_bytes(),
            format: asset.format().map(String::from),
            thumbnail_url: asset.thumbnail_url().map(String::from),
            album_id: None,
            metadata: asset.metadata().clone(),
            flag: asset.review_flag(),
            raw_api_data: Some(asset.raw_payload().clone()),
        }
    }
}

/// Load records from either a bare array or `{"photos": [...]}`.
pub fn read_records(path: &Path) -> Result<Vec<RejectedRecord>, RecordsError> {
    let text = std::fs::read_to_string(path).map_err(|source| RecordsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let json_err = |source: serde_json::Error| RecordsError::Json {
        path: path.to_path_buf(),
        source,
    };
    let value: Value = serde_json::from_str(&text).map_err(json_err)?;
    let items = match value {
        Value::Array(_) => value,
        Value::Object(mut obj) => match obj.remove("photos") {
            Some(photos @ Value::Array(_)) => photos,
            _ => return Err(RecordsError::Shape(path.to_path_buf())),
        },
        _ => return Err(RecordsError::Shape(path.to_path_buf())),
    };
    serde_json::from_value(items).map_err(json_err)
}

/// Write records as a pretty-printed JSON array.
pub fn write_records(path: &Path, records: &[RejectedRecord]) -> Result<(), RecordsError> {
    let json = serde_json::to_string_pretty(records).map_err(|source| RecordsError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| RecordsError::Write {
        path: path.to_path_buf(),
        source,
    })
}
