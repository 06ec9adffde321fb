//! Matching rejected records to local JPEG/RAF pairs and deleting them.

pub mod error;
pub mod matching;

use std::collections::{BTreeMap, HashSet};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::records::RejectedRecord;
use crate::types::DateField;

pub use error::ReconcileError;
pub use matching::{LocalFileMatch, SearchIndex};

#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    pub root: PathBuf,
    pub jpg_subdir: String,
    pub raw_subdir: String,
    pub date_field: DateField,
    /// Look in the date bucket before searching.
    pub use_dates: bool,
    /// Search subdirectories of the JPEG tree, not just its top level.
    pub recursive: bool,
    pub dry_run: bool,
    pub confirm_each: bool,
}

impl ReconcileConfig {
    pub fn jpg_root(&self) -> PathBuf {
        self.root.join(&self.jpg_subdir)
    }

    pub fn raw_root(&self) -> PathBuf {
        self.root.join(&self.raw_subdir)
    }
}

/// Per date-bucket tallies for the operator-facing breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketCounts {
    pub jpg: usize,
    pub raw: usize,
    pub not_found: usize,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub dry_run: bool,
    /// Distinct filenames considered.
    pub records: usize,
    pub skipped_no_filename: usize,
    /// Filenames containing path separators or `..`.
    pub skipped_bad_filename: usize,
    pub dated: usize,

    pub found_by_date: usize,
    pub found_by_search: usize,
    pub not_found: usize,

    pub jpg_deleted: usize,
    pub jpg_failed: usize,
    pub jpg_skipped: usize,
    pub raw_deleted: usize,
    pub raw_failed: usize,
    pub raw_skipped: usize,
    pub raw_not_found: usize,

    /// Keyed by `YYYY/MM-DD`; only records that had a date appear here.
    pub buckets: BTreeMap<String, BucketCounts>,
    pub matches: Vec<LocalFileMatch>,
}

impl ReconciliationReport {
    /// Raw sidecars that exist alongside the matched JPEGs.
    pub fn raw_present(&self) -> usize {
        self.matches.iter().filter(|m| m.raw_exists).count()
    }
}

/// Per-match deletion gate.
pub trait Confirm {
    fn confirm(&mut self, m: &LocalFileMatch) -> bool;
}

/// Approves everything (`--yes`, or no `--confirm`).
pub struct AlwaysYes;

impl Confirm for AlwaysYes {
    fn confirm(&mut self, _m: &LocalFileMatch) -> bool {
        true
    }
}

/// Interactive `[y/N]` prompt on stdin; anything but `y` declines.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, m: &LocalFileMatch) -> bool {
        let jpg_name = m.jpg_path.file_name().unwrap_or_default().to_string_lossy();
        if m.raw_exists {
            let raw_name = m.raw_path.file_name().unwrap_or_default().to_string_lossy();
            print!("Delete {jpg_name} and {raw_name}? [y/N] ");
        } else {
            print!("Delete {jpg_name}? [y/N] ");
        }
        if std::io::stdout().flush().is_err() {
            return false;
        }
        let mut input = String::new();
        match std::io::stdin().read_line(&mut input) {
            Ok(_) => input.trim().eq_ignore_ascii_case("y"),
            Err(_) => false,
        }
    }
}

pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    fn check_dir(kind: &'static str, path: &Path) -> Result<(), ReconcileError> {
        if !path.exists() {
            return Err(ReconcileError::MissingDirectory {
                kind,
                path: path.to_path_buf(),
            });
        }
        if !path.is_dir() {
            return Err(ReconcileError::NotADirectory {
                kind,
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Match every record, then delete (or, in dry-run, only report) each
    /// matched pair. Only the directory precondition is fatal.
    pub fn run(
        &self,
        records: &[RejectedRecord],
        confirm: &mut dyn Confirm,
    ) -> Result<ReconciliationReport, ReconcileError> {
        let jpg_root = self.config.jpg_root();
        let raw_root = self.config.raw_root();
        Self::check_dir("jpg", &jpg_root)?;
        Self::check_dir("raw", &raw_root)?;

        let mut report = self.locate(records, &jpg_root, &raw_root);
        self.delete(&mut report, confirm);
        Ok(report)
    }

    fn locate(
        &self,
        records: &[RejectedRecord],
        jpg_root: &Path,
        raw_root: &Path,
    ) -> ReconciliationReport {
        let mut report = ReconciliationReport {
            dry_run: self.config.dry_run,
            ..Default::default()
        };
        let mut seen_filenames: HashSet<&str> = HashSet::new();
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        let mut index: Option<SearchIndex> = None;

        for record in records {
            let Some(filename) = record.filename() else {
                report.skipped_no_filename += 1;
                continue;
            };
            if !matching::is_plain_file_name(filename) {
                warn!("Skipping record {} with path-like filename {:?}", record.id, filename);
                report.skipped_bad_filename += 1;
                continue;
            }
            if !seen_filenames.insert(filename) {
                debug!("Duplicate record for {}, keeping the first", filename);
                continue;
            }
            report.records += 1;

            let date = if self.config.use_dates {
                record.date(self.config.date_field)
            } else {
                None
            };
            if date.is_some() {
                report.dated += 1;
            }

            let mut found = Vec::new();
            if let Some(date) = date {
                let hit = matching::find_in_bucket(jpg_root, raw_root, filename, date);
                let bucket = report
                    .buckets
                    .entry(crate::dates::bucket_key(&date))
                    .or_default();
                match &hit {
                    Some(m) => {
                        bucket.jpg += 1;
                        if m.raw_exists {
                            bucket.raw += 1;
                        }
                        report.found_by_date += 1;
                    }
                    None => bucket.not_found += 1,
                }
                found.extend(hit);
            }

            if found.is_empty() {
                let index = index.get_or_insert_with(|| {
                    debug!("Indexing {} (recursive={})", jpg_root.display(), self.config.recursive);
                    SearchIndex::build(jpg_root, self.config.recursive)
                });
                found = index.find(raw_root, filename, date);
                if !found.is_empty() {
                    report.found_by_search += 1;
                }
            }

            if found.is_empty() {
                debug!("No local file for {}", filename);
                report.not_found += 1;
                continue;
            }

            for m in found {
                if claimed.insert(m.jpg_path.clone()) {
                    report.matches.push(m);
                }
            }
        }

        info!(
            "Matched {} files: {} by date, {} by search, {} not found",
            report.matches.len(),
            report.found_by_date,
            report.found_by_search,
            report.not_found
        );
        report
    }

    fn delete(&self, report: &mut ReconciliationReport, confirm: &mut dyn Confirm) {
        for m in &report.matches {
            if !m.raw_exists {
                report.raw_not_found += 1;
            }

            if self.config.dry_run {
                info!("[DRY RUN] Would delete {}", m.jpg_path.display());
                if m.raw_exists {
                    info!("[DRY RUN] Would delete {}", m.raw_path.display());
                }
                continue;
            }

            if self.config.confirm_each && !confirm.confirm(m) {
                debug!("Declined {}", m.jpg_path.display());
                report.jpg_skipped += 1;
                if m.raw_exists {
                    report.raw_skipped += 1;
                }
                continue;
            }

            match std::fs::remove_file(&m.jpg_path) {
                Ok(()) => {
                    info!("Deleted {}", m.jpg_path.display());
                    report.jpg_deleted += 1;
                }
                Err(e) => {
                    error!("Failed to delete {}: {}", m.jpg_path.display(), e);
                    report.jpg_failed += 1;
                }
            }

            if m.raw_exists {
                match std::fs::remove_file(&m.raw_path) {
                    Ok(()) => {
                        info!("Deleted {}", m.raw_path.display());
                        report.raw_deleted += 1;
                    }
                    Err(e) => {
                        error!("Failed to delete {}: {}", m.raw_path.display(), e);
                        report.raw_failed += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::matching::MatchMethod;
    use super::*;
    use crate::lightroom::asset::ImportSource;
    use crate::lightroom::AssetMetadata;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("jpg")).unwrap();
        fs::create_dir_all(dir.path().join("raw")).unwrap();
        dir
    }

    fn config(root: &Path, dry_run: bool) -> ReconcileConfig {
        ReconcileConfig {
            root: root.to_path_buf(),
            jpg_subdir: "jpg".into(),
            raw_subdir: "raw".into(),
            date_field: DateField::Import,
            use_dates: true,
            recursive: true,
            dry_run,
            confirm_each: false,
        }
    }

    fn record(filename: &str, import: Option<&str>) -> RejectedRecord {
        RejectedRecord {
            id: format!("id-{filename}"),
            filename: Some(filename.to_string()),
            metadata: AssetMetadata {
                import_source: import.map(|ts| ImportSource {
                    import_timestamp: Some(ts.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Replays fixed answers, declining once they run out.
    struct Scripted(Vec<bool>);

    impl Confirm for Scripted {
        fn confirm(&mut self, _m: &LocalFileMatch) -> bool {
            if self.0.is_empty() {
                false
            } else {
                self.0.remove(0)
            }
        }
    }

    #[test]
    fn test_missing_directories_fatal() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("jpg")).unwrap();
        let err = Reconciler::new(config(dir.path(), true))
            .run(&[], &mut AlwaysYes)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::MissingDirectory { kind: "raw", .. }));

        fs::write(dir.path().join("raw"), b"").unwrap();
        let err = Reconciler::new(config(dir.path(), true))
            .run(&[], &mut AlwaysYes)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::NotADirectory { kind: "raw", .. }));
    }

    #[test]
    fn test_pair_in_date_bucket_deleted() {
        let dir = tree();
        let jpg = dir.path().join("jpg/2024/03-15/WJD00123.JPG");
        let raw = dir.path().join("raw/2024/03-15/WJD00123.RAF");
        touch(&jpg);
        touch(&raw);

        let records = [record("WJD00123.JPG", Some("2024-03-15T10:00:00Z"))];
        let report = Reconciler::new(config(dir.path(), false))
            .run(&records, &mut AlwaysYes)
            .unwrap();

        assert_eq!(report.found_by_date, 1);
        assert_eq!(report.found_by_search, 0);
        assert_eq!(report.matches[0].method, MatchMethod::DateBucket);
        assert_eq!(report.jpg_deleted, 1);
        assert_eq!(report.raw_deleted, 1);
        assert_eq!(
            report.buckets["2024/03-15"],
            BucketCounts { jpg: 1, raw: 1, not_found: 0 }
        );
        assert!(!jpg.exists());
        assert!(!raw.exists());
    }

    #[test]
    fn test_offset_timestamp_uses_wall_clock_bucket() {
        let dir = tree();
        touch(&dir.path().join("jpg/2024/03-15/A.JPG"));
        let mut cfg = config(dir.path(), true);
        cfg.recursive = false;

        let records = [record("A.JPG", Some("2024-03-15T20:00:00-08:00"))];
        let report = Reconciler::new(cfg).run(&records, &mut AlwaysYes).unwrap();

        assert_eq!(report.found_by_date, 1);
        assert_eq!(report.not_found, 0);
        assert_eq!(report.buckets["2024/03-15"].jpg, 1);
        assert!(!report.buckets.contains_key("2024/03-16"));
    }

    #[test]
    fn test_missing_raw_counted_not_failed() {
        let dir = tree();
        let jpg = dir.path().join("jpg/2024/03-15/WJD00123.JPG");
        touch(&jpg);

        let records = [record("WJD00123.JPG", Some("2024-03-15T10:00:00Z"))];
        let report = Reconciler::new(config(dir.path(), false))
            .run(&records, &mut AlwaysYes)
            .unwrap();

        assert_eq!(report.jpg_deleted, 1);
        assert_eq!(report.raw_not_found, 1);
        assert_eq!(report.raw_deleted, 0);
        assert_eq!(report.raw_failed, 0);
        assert!(!jpg.exists());
    }

    #[test]
    fn test_dateless_record_found_by_search() {
        let dir = tree();
        let jpg = dir.path().join("jpg/trips/iceland/DSC0042.JPG");
        let raw = dir.path().join("raw/trips/iceland/DSC0042.RAF");
        touch(&jpg);
        touch(&raw);

        let records = [record("DSC0042.JPG", Some("not a timestamp"))];
        let report = Reconciler::new(config(dir.path(), false))
            .run(&records, &mut AlwaysYes)
            .unwrap();

        assert_eq!(report.dated, 0);
        assert_eq!(report.found_by_search, 1);
        assert!(report.buckets.is_empty());
        let m = &report.matches[0];
        assert_eq!(m.method, MatchMethod::RecursiveSearch);
        assert_eq!(m.raw_path, raw);
        assert_eq!(report.jpg_deleted, 1);
        assert_eq!(report.raw_deleted, 1);
    }

    #[test]
    fn test_bucket_miss_falls_back_to_search() {
        let dir = tree();
        touch(&dir.path().join("jpg/2024/03-16/WJD1.JPG"));

        let records = [record("WJD1.JPG", Some("2024-03-15T10:00:00Z"))];
        let report = Reconciler::new(config(dir.path(), true))
            .run(&records, &mut AlwaysYes)
            .unwrap();

        assert_eq!(report.found_by_date, 0);
        assert_eq!(report.found_by_search, 1);
        assert_eq!(report.buckets["2024/03-15"].not_found, 1);
        assert_eq!(
            report.matches[0].raw_path,
            dir.path().join("raw/2024/03-16/WJD1.RAF")
        );
    }

    #[test]
    fn test_capture_sentinel_record_still_searched() {
        let dir = tree();
        touch(&dir.path().join("jpg/misc/IMG1.JPG"));

        let mut rec = record("IMG1.JPG", None);
        rec.metadata.capture_date = Some(crate::dates::CAPTURE_DATE_SENTINEL.to_string());
        rec.updated_date = Some("2023-05-05T00:00:00Z".into());
        let mut cfg = config(dir.path(), true);
        cfg.date_field = DateField::Capture;

        let report = Reconciler::new(cfg).run(&[rec], &mut AlwaysYes).unwrap();
        assert_eq!(report.dated, 0);
        assert_eq!(report.found_by_search, 1);
    }

    #[test]
    fn test_not_found_tallied() {
        let dir = tree();
        let records = [
            record("GONE.JPG", Some("2024-01-02T00:00:00Z")),
            record("ALSO_GONE.JPG", None),
        ];
        let report = Reconciler::new(config(dir.path(), false))
            .run(&records, &mut AlwaysYes)
            .unwrap();
        assert_eq!(report.not_found, 2);
        assert_eq!(report.buckets["2024/01-02"].not_found, 1);
        assert!(report.matches.is_empty());
    }

    #[test]
    fn test_dry_run_idempotent() {
        let dir = tree();
        let jpg = dir.path().join("jpg/2024/03-15/A.JPG");
        touch(&jpg);
        touch(&dir.path().join("raw/2024/03-15/A.RAF"));
        touch(&dir.path().join("jpg/other/B.jpeg"));

        let records = [
            record("A.JPG", Some("2024-03-15T10:00:00Z")),
            record("B.JPG", None),
            record("C.JPG", None),
        ];
        let reconciler = Reconciler::new(config(dir.path(), true));
        let first = reconciler.run(&records, &mut AlwaysYes).unwrap();
        let second = reconciler.run(&records, &mut AlwaysYes).unwrap();

        assert_eq!(first, second);
        assert!(first.dry_run);
        assert_eq!(first.matches.len(), 2);
        assert_eq!(first.raw_present(), 1);
        assert_eq!(first.raw_not_found, 1);
        assert_eq!(first.jpg_deleted, 0);
        assert!(jpg.exists());
    }

    #[test]
    fn test_declined_confirmation_skips_both() {
        let dir = tree();
        let a = dir.path().join("jpg/2024/03-15/A.JPG");
        let a_raw = dir.path().join("raw/2024/03-15/A.RAF");
        let b = dir.path().join("jpg/2024/03-15/B.JPG");
        touch(&a);
        touch(&a_raw);
        touch(&b);

        let records = [
            record("A.JPG", Some("2024-03-15T10:00:00Z")),
            record("B.JPG", Some("2024-03-15T10:00:00Z")),
        ];
        let mut cfg = config(dir.path(), false);
        cfg.confirm_each = true;
        let report = Reconciler::new(cfg)
            .run(&records, &mut Scripted(vec![false, true]))
            .unwrap();

        assert_eq!(report.jpg_skipped, 1);
        assert_eq!(report.raw_skipped, 1);
        assert_eq!(report.jpg_deleted, 1);
        assert!(a.exists());
        assert!(a_raw.exists());
        assert!(!b.exists());
    }

    #[test]
    fn test_raw_deleted_even_if_jpg_delete_fails() {
        let dir = tree();
        // JPEG vanished between matching and deletion.
        let jpg = dir.path().join("jpg/2024/03-15/A.JPG");
        let raw = dir.path().join("raw/2024/03-15/A.RAF");
        touch(&raw);

        let m = LocalFileMatch {
            record_filename: "A.JPG".into(),
            jpg_path: jpg.clone(),
            raw_path: raw.clone(),
            raw_exists: true,
            method: MatchMethod::DateBucket,
            date: None,
            bucket: None,
        };
        let mut report = ReconciliationReport {
            matches: vec![m],
            ..Default::default()
        };
        Reconciler::new(config(dir.path(), false)).delete(&mut report, &mut AlwaysYes);

        assert_eq!(report.jpg_failed, 1);
        assert_eq!(report.raw_deleted, 1);
        assert!(!raw.exists());
    }

    #[test]
    fn test_records_without_filename_and_duplicates() {
        let dir = tree();
        touch(&dir.path().join("jpg/X.JPG"));
        let mut nameless = record("", None);
        nameless.filename = None;
        let records = [record("X.JPG", None), record("X.JPG", None), nameless];

        let report = Reconciler::new(config(dir.path(), true))
            .run(&records, &mut AlwaysYes)
            .unwrap();
        assert_eq!(report.records, 1);
        assert_eq!(report.skipped_no_filename, 1);
        assert_eq!(report.matches.len(), 1);
    }

    #[test]
    fn test_path_like_filename_never_deleted() {
        let dir = tree();
        let victim = dir.path().join("victim.JPG");
        touch(&victim);
        touch(&dir.path().join("jpg/2024/03-15/x/keep.txt"));

        let records = [record("x/../../../../victim.JPG", Some("2024-03-15T10:00:00Z"))];
        let report = Reconciler::new(config(dir.path(), false))
            .run(&records, &mut AlwaysYes)
            .unwrap();

        assert_eq!(report.skipped_bad_filename, 1);
        assert_eq!(report.records, 0);
        assert!(report.matches.is_empty());
        assert!(victim.exists());
    }

    #[test]
    fn test_use_dates_disabled_searches_only() {
        let dir = tree();
        touch(&dir.path().join("jpg/2024/03-15/A.JPG"));
        let mut cfg = config(dir.path(), true);
        cfg.use_dates = false;
        let report = Reconciler::new(cfg)
            .run(&[record("A.JPG", Some("2024-03-15T10:00:00Z"))], &mut AlwaysYes)
            .unwrap();
        assert_eq!(report.found_by_date, 0);
        assert_eq!(report.found_by_search, 1);
    }
}
