//! Text rendering for command output. Everything returns a `String` so the
//! caller decides between stdout and `--save-to`.

use std::fmt::Write;

use serde_json::Value;

use crate::lightroom::Asset;
use crate::reconcile::ReconciliationReport;
use crate::records::RejectedRecord;

const RULE: &str = "==================================================";

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

fn size_kb(bytes: Option<u64>) -> String {
    bytes.map_or_else(|| "Unknown".to_string(), |b| format!("{}KB", b / 1024))
}

/// Tab-separated listing used by `list-rejected`.
pub fn asset_table(assets: &[Asset]) -> String {
    let mut out = String::from("ID\tFilename\tCreated\tSize\tFormat\n");
    out.push_str(&"-".repeat(80));
    out.push('\n');
    for asset in assets {
        let created = asset
            .created_at()
            .map_or_else(|| "Unknown".to_string(), |d| d.format("%Y-%m-%d %H:%M").to_string());
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            short_id(asset.id()),
            truncate(asset.filename(), 30),
            created,
            size_kb(asset.file_size_bytes()),
            asset.format().unwrap_or("Unknown"),
        );
    }
    let _ = write!(out, "\nTotal rejected photos: {}", assets.len());
    out
}

/// One line per asset with its review flag, used by `search`.
pub fn search_lines(assets: &[Asset]) -> String {
    let mut out = format!("Found {} photos:\n{RULE}\n", assets.len());
    for asset in assets {
        let _ = writeln!(
            out,
            "{} [{}] - {}",
            asset.filename(),
            asset.review_flag(),
            short_id(asset.id())
        );
    }
    out
}

fn field_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

pub fn catalog_table(catalogs: &[Value]) -> String {
    let mut out = format!("Available Catalogs:\n{RULE}\n");
    for catalog in catalogs {
        let name = catalog_name(catalog).unwrap_or("Unnamed");
        let _ = writeln!(out, "ID: {}", field_str(catalog, "id").unwrap_or("?"));
        let _ = writeln!(out, "Name: {name}");
        let _ = writeln!(
            out,
            "Created: {}",
            field_str(catalog, "created").unwrap_or("Unknown")
        );
        out.push_str("------------------------------\n");
    }
    out
}

pub fn album_table(albums: &[Value]) -> String {
    let mut out = format!("Available Albums:\n{RULE}\n");
    for album in albums {
        let payload = &album["payload"];
        let _ = writeln!(out, "ID: {}", field_str(album, "id").unwrap_or("?"));
        let _ = writeln!(out, "Name: {}", field_str(payload, "name").unwrap_or("Unnamed"));
        for (label, key) in [
            ("Created", "created"),
            ("Updated", "updated"),
            ("Subtype", "subtype"),
        ] {
            let _ = writeln!(out, "{label}: {}", field_str(album, key).unwrap_or("Unknown"));
        }
        if let Some(description) = field_str(payload, "description").filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "Description: {description}");
        }
        out.push_str("------------------------------\n");
    }
    out
}

/// Display name for the catalog chosen by default.
pub fn catalog_name(catalog: &Value) -> Option<&str> {
    catalog
        .pointer("/payload/name")
        .and_then(Value::as_str)
        .or_else(|| field_str(catalog, "name"))
}

pub fn asset_details(asset: &Asset) -> String {
    let unknown = || "Unknown".to_string();
    let mut out = format!("Photo Details for {}\n{RULE}\n", asset.filename());
    let _ = writeln!(out, "ID: {}", asset.id());
    let _ = writeln!(out, "Filename: {}", asset.filename());
    let _ = writeln!(out, "Status: {}", asset.review_flag());
    let _ = writeln!(
        out,
        "Created: {}",
        asset.created_at().map_or_else(unknown, |d| d.to_rfc3339())
    );
    let _ = writeln!(
        out,
        "Updated: {}",
        asset.updated_at().map_or_else(unknown, |d| d.to_rfc3339())
    );
    let _ = writeln!(
        out,
        "File Size: {}",
        asset.file_size_bytes().map_or_else(unknown, |b| b.to_string())
    );
    let _ = writeln!(out, "Format: {}", asset.format().unwrap_or("Unknown"));

    let metadata = asset.metadata();
    let _ = writeln!(out, "\nMetadata:");
    if let Some(ts) = &metadata.import_timestamp {
        let _ = writeln!(out, "  import_timestamp: {ts}");
    }
    if let Some(cd) = &metadata.capture_date {
        let _ = writeln!(out, "  capture_date: {cd}");
    }
    for (key, value) in &metadata.extra {
        let _ = writeln!(out, "  {key}: {value}");
    }
    out
}

/// Human-readable dump of raw payloads, top-level fields first.
pub fn dump_table(catalog_id: &str, assets: &[Asset]) -> String {
    let mut out = format!(
        "RAW API Data Dump for Catalog: {catalog_id}\nTotal Photos Retrieved: {}\n{}\n\n",
        assets.len(),
        "=".repeat(80)
    );
    for (i, asset) in assets.iter().enumerate() {
        let _ = writeln!(out, "Photo #{} - {}", i + 1, asset.filename());
        out.push_str(&"-".repeat(50));
        out.push('\n');
        match asset.raw_payload().as_object() {
            Some(fields) => {
                for (key, value) in fields {
                    let rendered = match value {
                        Value::Object(_) | Value::Array(_) => {
                            serde_json::to_string_pretty(value).unwrap_or_default()
                        }
                        other => other.to_string(),
                    };
                    let _ = writeln!(out, "  {key}: {}", rendered.replace('\n', "\n    "));
                }
            }
            None => {
                let _ = writeln!(out, "  {}", asset.raw_payload());
            }
        }
        out.push('\n');
    }
    out
}

/// Filename prefix tallies reported by `count-all`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PrefixBreakdown {
    pub total: usize,
    pub wjd: usize,
    pub dsc: usize,
    pub other: usize,
}

impl PrefixBreakdown {
    pub fn from_assets(assets: &[Asset]) -> Self {
        let wjd = assets
            .iter()
            .filter(|a| a.filename().starts_with("WJD"))
            .count();
        let dsc = assets
            .iter()
            .filter(|a| a.filename().starts_with("DSC"))
            .count();
        Self {
            total: assets.len(),
            wjd,
            dsc,
            other: assets.len() - wjd - dsc,
        }
    }
}

pub fn records_json(records: &[RejectedRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

/// Summary printed after matching and deletion.
pub fn reconciliation_summary(report: &ReconciliationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Loaded {} rejected records", report.records);
    if report.skipped_no_filename > 0 {
        let _ = writeln!(
            out,
            "Skipped {} records without a filename",
            report.skipped_no_filename
        );
    }
    if report.skipped_bad_filename > 0 {
        let _ = writeln!(
            out,
            "Skipped {} records with path-like filenames",
            report.skipped_bad_filename
        );
    }
    if report.dated > 0 {
        let _ = writeln!(out, "Found date information for {} photos", report.dated);
    }

    let found: Vec<_> = report
        .buckets
        .iter()
        .filter(|(_, c)| c.jpg > 0 || c.raw > 0)
        .collect();
    if !found.is_empty() {
        out.push_str("Files found by directory:\n");
        for (bucket, counts) in found {
            let _ = writeln!(out, "   {bucket}: {} jpg, {} raw", counts.jpg, counts.raw);
        }
    }
    let missing: Vec<_> = report
        .buckets
        .iter()
        .filter(|(_, c)| c.not_found > 0)
        .collect();
    if !missing.is_empty() {
        out.push_str("Files not found by directory:\n");
        for (bucket, counts) in missing {
            let _ = writeln!(out, "   {bucket}: {} files", counts.not_found);
        }
    }

    let _ = writeln!(
        out,
        "Found {} rejected jpg files to process",
        report.matches.len()
    );
    let _ = writeln!(out, "  - {} found using date-based directories", report.found_by_date);
    let _ = writeln!(out, "  - {} found using recursive search", report.found_by_search);
    let _ = writeln!(out, "  - {} not found", report.not_found);

    if report.dry_run {
        for m in &report.matches {
            let _ = writeln!(out, "\n{} ({})", m.jpg_path.display(), m.method);
            match &m.bucket {
                Some(bucket) => {
                    let _ = writeln!(out, "  Date folder: {bucket}");
                }
                None => out.push_str("  Date folder: none\n"),
            }
            if m.raw_exists {
                let _ = writeln!(out, "  RAW: {}", m.raw_path.display());
            } else {
                let _ = writeln!(out, "  RAW: {} (not found)", m.raw_path.display());
            }
        }
        let _ = write!(
            out,
            "\nDRY RUN SUMMARY:\n  Would delete {} jpg files\n  Would delete {} raw files\n  {} raw files not found",
            report.matches.len(),
            report.raw_present(),
            report.raw_not_found
        );
    } else {
        let _ = write!(
            out,
            "\nDELETION SUMMARY:\n  Deleted {} jpg files\n  Deleted {} raw files\n  Skipped {} jpg files\n  Skipped {} raw files\n  Failed {} jpg files\n  Failed {} raw files\n  {} raw files not found",
            report.jpg_deleted,
            report.raw_deleted,
            report.jpg_skipped,
            report.raw_skipped,
            report.jpg_failed,
            report.raw_failed,
            report.raw_not_found
        );
    }
    out
}
