//! Locating local JPEG files and their raw sidecars.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use tracing::warn;
use walkdir::WalkDir;

use crate::dates;

/// Extension variants tried, in order, when looking for a record's JPEG.
pub const JPEG_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".JPG", ".JPEG"];

/// Extension of the raw sidecar that accompanies every JPEG.
pub const RAW_EXTENSION: &str = "RAF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    DateBucket,
    RecursiveSearch,
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::DateBucket => "date_bucket",
            Self::RecursiveSearch => "recursive_search",
        })
    }
}

/// A local JPEG paired with the raw sidecar path derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileMatch {
    /// Filename from the rejected record that produced this match.
    pub record_filename: String,
    pub jpg_path: PathBuf,
    pub raw_path: PathBuf,
    pub raw_exists: bool,
    pub method: MatchMethod,
    pub date: Option<DateTime<FixedOffset>>,
    /// `YYYY/MM-DD` of the record's date, when it had one.
    pub bucket: Option<String>,
}

impl LocalFileMatch {
    fn new(
        record_filename: &str,
        jpg_path: PathBuf,
        raw_dir: &Path,
        method: MatchMethod,
        date: Option<DateTime<FixedOffset>>,
    ) -> Self {
        let raw_path = raw_sidecar_path(&jpg_path, raw_dir);
        let raw_exists = raw_path.is_file();
        Self {
            record_filename: record_filename.to_string(),
            jpg_path,
            raw_path,
            raw_exists,
            method,
            date,
            bucket: date.as_ref().map(dates::bucket_key),
        }
    }
}

/// `<raw_dir>/<jpg stem>.RAF`
pub fn raw_sidecar_path(jpg_path: &Path, raw_dir: &Path) -> PathBuf {
    let stem = jpg_path.file_stem().unwrap_or_default();
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(RAW_EXTENSION);
    raw_dir.join(name)
}

fn has_jpeg_extension(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    lower.ends_with(".jpg") || lower.ends_with(".jpeg")
}

/// True when `filename` is a single path component with no separators.
///
/// Record filenames come from a JSON file and are joined onto local
/// directories, so anything else could reach outside the tree.
pub fn is_plain_file_name(filename: &str) -> bool {
    !filename.contains(['/', '\\'])
        && matches!(
            Path::new(filename).components().collect::<Vec<_>>().as_slice(),
            [Component::Normal(_)]
        )
}

/// File names a record may appear under locally, in priority order:
/// the stem with each JPEG extension, then the exact filename if it is
/// itself a JPEG name not already covered.
pub fn candidate_names(filename: &str) -> Vec<String> {
    if !is_plain_file_name(filename) {
        return Vec::new();
    }
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let mut names: Vec<String> = JPEG_EXTENSIONS
        .iter()
        .map(|ext| format!("{stem}{ext}"))
        .collect();
    if has_jpeg_extension(filename) && !names.iter().any(|n| n == filename) {
        names.push(filename.to_string());
    }
    names
}

/// Look for the record's JPEG in `jpg_root/YYYY/MM-DD`; first hit wins.
pub fn find_in_bucket(
    jpg_root: &Path,
    raw_root: &Path,
    filename: &str,
    date: DateTime<FixedOffset>,
) -> Option<LocalFileMatch> {
    let (year, month_day) = dates::bucket_components(&date);
    let jpg_dir = jpg_root.join(&year).join(&month_day);
    if !jpg_dir.is_dir() {
        return None;
    }
    let raw_dir = raw_root.join(&year).join(&month_day);
    candidate_names(filename)
        .into_iter()
        .map(|name| jpg_dir.join(name))
        .find(|path| path.is_file())
        .map(|path| {
            LocalFileMatch::new(filename, path, &raw_dir, MatchMethod::DateBucket, Some(date))
        })
}

/// Filename index over the JPEG tree, built once per reconciliation.
pub struct SearchIndex {
    jpg_root: PathBuf,
    by_name: HashMap<OsString, Vec<PathBuf>>,
}

impl SearchIndex {
    /// Index regular files under `jpg_root`; only the top level unless
    /// `recursive`. Unreadable entries are logged and skipped.
    pub fn build(jpg_root: &Path, recursive: bool) -> Self {
        let mut walker = WalkDir::new(jpg_root).min_depth(1).sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut by_name: HashMap<OsString, Vec<PathBuf>> = HashMap::new();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", jpg_root.display(), e);
                    continue;
                }
            };
            if entry.file_type().is_file() {
                by_name
                    .entry(entry.file_name().to_os_string())
                    .or_default()
                    .push(entry.into_path());
            }
        }

        Self {
            jpg_root: jpg_root.to_path_buf(),
            by_name,
        }
    }

    /// All files matching the first candidate name that has any hit, each
    /// paired with a raw dir mirroring its location under `raw_root`.
    pub fn find(
        &self,
        raw_root: &Path,
        filename: &str,
        date: Option<DateTime<FixedOffset>>,
    ) -> Vec<LocalFileMatch> {
        for name in candidate_names(filename) {
            let Some(paths) = self.by_name.get(std::ffi::OsStr::new(&name)) else {
                continue;
            };
            return paths
                .iter()
                .map(|jpg_path| {
                    let relative_parent = jpg_path
                        .strip_prefix(&self.jpg_root)
                        .ok()
                        .and_then(Path::parent)
                        .unwrap_or_else(|| Path::new(""));
                    let raw_dir = raw_root.join(relative_parent);
                    LocalFileMatch::new(
                        filename,
                        jpg_path.clone(),
                        &raw_dir,
                        MatchMethod::RecursiveSearch,
                        date,
                    )
                })
                .collect();
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_candidate_names_order() {
        assert_eq!(
            candidate_names("WJD00123.JPG"),
            ["WJD00123.jpg", "WJD00123.jpeg", "WJD00123.JPG", "WJD00123.JPEG"]
        );
        assert_eq!(candidate_names("a.Jpg").last().unwrap(), "a.Jpg");
        assert_eq!(candidate_names("raw.RAF").len(), 4);
    }

    #[test]
    fn test_path_like_filenames_have_no_candidates() {
        assert!(is_plain_file_name("WJD00123.JPG"));
        for name in ["x/../../../victim.jpg", "../victim.JPG", "..", "a\\b.jpg", "/etc/x.jpg"] {
            assert!(!is_plain_file_name(name), "{name}");
            assert!(candidate_names(name).is_empty(), "{name}");
        }
    }

    #[test]
    fn test_raw_sidecar_path() {
        let raw = raw_sidecar_path(
            Path::new("/p/jpg/2024/03-15/WJD1.JPG"),
            Path::new("/p/raw/2024/03-15"),
        );
        assert_eq!(raw, PathBuf::from("/p/raw/2024/03-15/WJD1.RAF"));
    }

    #[test]
    fn test_find_in_bucket() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("jpg");
        let raw = dir.path().join("raw");
        touch(&jpg.join("2024/03-15/WJD00123.JPG"));
        touch(&raw.join("2024/03-15/WJD00123.RAF"));

        let date = dates::parse_timestamp("2024-03-15T10:00:00Z").unwrap();
        let found = find_in_bucket(&jpg, &raw, "WJD00123.JPG", date).unwrap();
        assert_eq!(found.method, MatchMethod::DateBucket);
        assert!(found.jpg_path.is_file());
        assert!(found.raw_exists);
        assert_eq!(found.raw_path, raw.join("2024/03-15/WJD00123.RAF"));
        assert_eq!(found.bucket.as_deref(), Some("2024/03-15"));

        let other_day = dates::parse_timestamp("2024-03-16T10:00:00Z").unwrap();
        assert!(find_in_bucket(&jpg, &raw, "WJD00123.JPG", other_day).is_none());
    }

    #[test]
    fn test_index_recursive_vs_shallow() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("jpg");
        let raw = dir.path().join("raw");
        touch(&jpg.join("top.JPG"));
        touch(&jpg.join("trip/day1/deep.JPG"));
        touch(&raw.join("trip/day1/deep.RAF"));

        let shallow = SearchIndex::build(&jpg, false);
        assert_eq!(shallow.find(&raw, "top.JPG", None).len(), 1);
        assert!(shallow.find(&raw, "deep.JPG", None).is_empty());

        let deep = SearchIndex::build(&jpg, true);
        let found = deep.find(&raw, "deep.JPG", None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].method, MatchMethod::RecursiveSearch);
        assert_eq!(found[0].raw_path, raw.join("trip/day1/deep.RAF"));
        assert!(found[0].raw_exists);
    }

    #[test]
    fn test_index_keeps_all_hits_for_first_extension() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("jpg");
        let raw = dir.path().join("raw");
        touch(&jpg.join("a/dup.jpg"));
        touch(&jpg.join("b/dup.jpg"));
        touch(&jpg.join("c/dup.JPG"));

        let index = SearchIndex::build(&jpg, true);
        let found = index.find(&raw, "dup.JPG", None);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|m| m.jpg_path.extension().unwrap() == "jpg"));
        assert_eq!(found[0].raw_path, raw.join("a/dup.RAF"));
        assert_eq!(found[1].raw_path, raw.join("b/dup.RAF"));
    }

    #[test]
    fn test_index_requires_exact_name() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("jpg");
        touch(&jpg.join("XWJD1.JPG"));
        let index = SearchIndex::build(&jpg, true);
        assert!(index.find(&dir.path().join("raw"), "WJD1.JPG", None).is_empty());
    }
}
