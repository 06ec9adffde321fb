use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::dates;
use crate::types::{DateField, ReviewFlag};

/// Filename used when the payload carries neither an import filename nor a name.
pub const UNKNOWN_FILENAME: &str = "Unknown";

/// A link given either as a bare string or as an `{"href": ...}` object.
pub(crate) fn link_href(link: &Value) -> Option<String> {
    match link {
        Value::String(s) => Some(s.clone()),
        other => other.get("href").and_then(Value::as_str).map(String::from),
    }
}

/// Keep string values, drop anything else (numbers, objects) to `None`.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// The `importSource` block as carried in the metadata bag.
///
/// Only `importTimestamp` is interpreted; every other key is round-tripped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSource {
    #[serde(
        rename = "importTimestamp",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub import_timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Metadata bag extracted from an asset payload.
///
/// The same shape is written to and read back from the rejected-records
/// file, so date fields survive the hand-off between `list-rejected` and
/// `delete-pairs` without another API call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub import_timestamp: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub capture_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_source: Option<ImportSource>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AssetMetadata {
    /// Import date, preferring the nested `import_source.importTimestamp`
    /// and falling back to the flattened `import_timestamp` copy.
    pub fn import_date(&self) -> Option<DateTime<FixedOffset>> {
        self.import_source
            .as_ref()
            .and_then(|src| src.import_timestamp.as_deref())
            .and_then(dates::parse_timestamp)
            .or_else(|| {
                self.import_timestamp
                    .as_deref()
                    .and_then(dates::parse_timestamp)
            })
    }

    /// Capture date, with the all-zero sentinel treated as absent.
    pub fn capture_date(&self) -> Option<DateTime<FixedOffset>> {
        self.capture_date
            .as_deref()
            .and_then(dates::parse_capture_date)
    }
}

/// One remote catalog entry.
///
/// Built once by [`Asset::from_api`]; the untyped source record is kept in
/// `raw_payload` for `dump` and JSON export but never inspected again.
#[derive(Debug, Clone)]
pub struct Asset {
    id: String,
    filename: String,
    review_flag: ReviewFlag,
    created_at: Option<DateTime<FixedOffset>>,
    updated_at: Option<DateTime<FixedOffset>>,
    file_size_bytes: Option<u64>,
    format: Option<String>,
    thumbnail_url: Option<String>,
    metadata: AssetMetadata,
    raw_payload: Value,
}

fn str_at<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

impl Asset {
    /// Parse a resource from `GET /catalogs/{id}/assets`.
    pub fn from_api(data: Value) -> Self {
        let payload = &data["payload"];
        let import_source = &payload["importSource"];
        let develop = &payload["develop"]["settings"];
        let exif_camera = &develop["exif"]["camera"];

        // Reviews are keyed by user id; a catalog has a single owner.
        let flag = payload["reviews"]
            .as_object()
            .and_then(|reviews| reviews.values().next())
            .and_then(|review| review.get("flag"))
            .and_then(Value::as_str);
        let review_flag = ReviewFlag::from_api(flag);

        let filename = str_at(import_source, "fileName")
            .or_else(|| str_at(payload, "name"))
            .unwrap_or(UNKNOWN_FILENAME)
            .to_string();

        let thumbnail_url = link_href(&data["links"]["/rels/thumbnail"]);

        let import_timestamp = str_at(import_source, "importTimestamp").map(String::from);
        let import_source_meta = import_source.as_object().map(|obj| {
            let mut extra = obj.clone();
            extra.remove("importTimestamp");
            ImportSource {
                import_timestamp: import_timestamp.clone(),
                extra,
            }
        });

        let mut extra = Map::new();
        let candidates = [
            ("develop_settings", develop.clone()),
            ("original_filename", import_source["fileName"].clone()),
            ("flag", json!(flag)),
            ("imported_device", import_source["importedOnDevice"].clone()),
            ("content_type", import_source["contentType"].clone()),
            ("sha256", import_source["sha256"].clone()),
            (
                "camera_info",
                json!({
                    "make": exif_camera["make"],
                    "model": exif_camera["model"],
                    "lens": develop["exif"]["lens"]["model"],
                }),
            ),
            (
                "exposure_info",
                json!({
                    "iso": exif_camera["iso"],
                    "aperture": exif_camera["aperture"],
                    "shutter_speed": exif_camera["shutterSpeed"],
                    "focal_length": exif_camera["focalLength"],
                }),
            ),
            (
                "ratings",
                json!({
                    "picked": develop.get("picked").cloned().unwrap_or(json!(0)),
                    "rating": develop.get("rating").cloned().unwrap_or(json!(0)),
                    "color_label": develop["colorLabel"],
                }),
            ),
            (
                "dimensions",
                json!({
                    "width": import_source["originalWidth"],
                    "height": import_source["originalHeight"],
                }),
            ),
            ("keywords", develop.get("keywords").cloned().unwrap_or(json!([]))),
            ("title", develop["title"].clone()),
            ("caption", develop["caption"].clone()),
        ];
        for (key, value) in candidates {
            if !value.is_null() {
                extra.insert(key.to_string(), value);
            }
        }

        let metadata = AssetMetadata {
            import_timestamp,
            capture_date: str_at(payload, "captureDate").map(String::from),
            import_source: import_source_meta,
            extra,
        };

        Self {
            id: data["id"].as_str().unwrap_or_default().to_string(),
            filename,
            review_flag,
            created_at: data["created"].as_str().and_then(dates::parse_timestamp),
            updated_at: data["updated"].as_str().and_then(dates::parse_timestamp),
            file_size_bytes: import_source["fileSize"].as_u64(),
            format: data["subtype"].as_str().map(String::from),
            thumbnail_url,
            metadata,
            raw_payload: data,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn review_flag(&self) -> ReviewFlag {
        self.review_flag
    }

    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<FixedOffset>> {
        self.updated_at
    }

    pub fn file_size_bytes(&self) -> Option<u64> {
        self.file_size_bytes
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnail_url.as_deref()
    }

    pub fn metadata(&self) -> &AssetMetadata {
        &self.metadata
    }

    pub fn raw_payload(&self) -> &Value {
        &self.raw_payload
    }

    /// Resolve exactly one date source, with no fallback to other fields.
    pub fn date(&self, field: DateField) -> Option<DateTime<FixedOffset>> {
        match field {
            DateField::Import => self.metadata.import_date(),
            DateField::Sync => self.updated_at,
            DateField::Capture => self.metadata.capture_date(),
        }
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Asset: id={} filename={}>", self.id, self.filename)
    }
}
