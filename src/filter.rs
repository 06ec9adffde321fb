//! Review-flag and year filtering over fetched assets.

use chrono::{Datelike, Local};
use thiserror::Error;

use crate::lightroom::Asset;
use crate::types::{DateField, ReviewFlag};

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;

/// Asset subtype Lightroom uses for internal sync/task records.
const TASK_FORMAT: &str = "task";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("--rejected-only and --accepted-only cannot be used together")]
    ConflictingFlags,

    #[error("--year and --this-year cannot be used together")]
    ConflictingYear,

    #[error("Year must be between 1900 and 2100, got {0}")]
    YearOutOfRange(i32),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub review_flag: Option<ReviewFlag>,
    pub year: Option<i32>,
    pub date_field: DateField,
}

impl FilterCriteria {
    /// Build criteria from CLI switches, validating before any filtering.
    pub fn new(
        rejected_only: bool,
        picked_only: bool,
        year: Option<i32>,
        date_field: DateField,
    ) -> Result<Self, FilterError> {
        let review_flag = match (rejected_only, picked_only) {
            (true, true) => return Err(FilterError::ConflictingFlags),
            (true, false) => Some(ReviewFlag::Reject),
            (false, true) => Some(ReviewFlag::Pick),
            (false, false) => None,
        };
        if let Some(y) = year {
            validate_year(y)?;
        }
        Ok(Self {
            review_flag,
            year,
            date_field,
        })
    }

    /// Rejected assets only, optionally restricted to one year.
    pub fn rejected(year: Option<i32>, date_field: DateField) -> Result<Self, FilterError> {
        Self::new(true, false, year, date_field)
    }

    pub fn matches(&self, asset: &Asset) -> bool {
        if let Some(flag) = self.review_flag {
            if asset.review_flag() != flag {
                return false;
            }
        }
        match self.year {
            Some(year) => asset
                .date(self.date_field)
                .is_some_and(|d| d.year() == year),
            None => true,
        }
    }
}

pub fn validate_year(year: i32) -> Result<i32, FilterError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(year)
    } else {
        Err(FilterError::YearOutOfRange(year))
    }
}

/// The current calendar year in local time.
pub fn this_year() -> i32 {
    Local::now().year()
}

/// Combine `--year` and `--this-year` into a single optional year.
pub fn resolve_year(year: Option<i32>, this_year_flag: bool) -> Result<Option<i32>, FilterError> {
    match (year, this_year_flag) {
        (Some(_), true) => Err(FilterError::ConflictingYear),
        (None, true) => Ok(Some(this_year())),
        (Some(y), false) => validate_year(y).map(Some),
        (None, false) => Ok(None),
    }
}

/// Keep the assets matching `criteria`, preserving order.
pub fn filter(assets: Vec<Asset>, criteria: &FilterCriteria) -> Vec<Asset> {
    assets.into_iter().filter(|a| criteria.matches(a)).collect()
}

/// Drop internal task records.
pub fn exclude_tasks(assets: Vec<Asset>) -> Vec<Asset> {
    assets
        .into_iter()
        .filter(|a| a.format() != Some(TASK_FORMAT))
        .collect()
}

/// Case-insensitive substring match on the filename.
pub fn filename_matches(asset: &Asset, pattern: &str) -> bool {
    asset
        .filename()
        .to_lowercase()
        .contains(&pattern.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn asset(
        id: &str,
        flag: Option<&str>,
        import: Option<&str>,
        updated: Option<&str>,
        capture: Option<&str>,
    ) -> Asset {
        let mut import_source = json!({"fileName": format!("{id}.JPG")});
        if let Some(ts) = import {
            import_source["importTimestamp"] = json!(ts);
        }
        Asset::from_api(json!({
            "id": id,
            "updated": updated,
            "payload": {
                "importSource": import_source,
                "captureDate": capture,
                "reviews": flag.map(|f| json!({"u": {"flag": f}})).unwrap_or(json!({}))
            }
        }))
    }

    fn ids(assets: &[Asset]) -> Vec<&str> {
        assets.iter().map(|a| a.id()).collect()
    }

    #[test]
    fn test_conflicting_flags_rejected() {
        assert_eq!(
            FilterCriteria::new(true, true, None, DateField::Import),
            Err(FilterError::ConflictingFlags)
        );
    }

    #[test]
    fn test_year_bounds() {
        assert_eq!(
            FilterCriteria::new(false, false, Some(1899), DateField::Import),
            Err(FilterError::YearOutOfRange(1899))
        );
        assert_eq!(
            FilterCriteria::new(false, false, Some(2101), DateField::Import),
            Err(FilterError::YearOutOfRange(2101))
        );
        assert!(FilterCriteria::new(false, false, Some(1900), DateField::Import).is_ok());
        assert!(FilterCriteria::new(false, false, Some(2100), DateField::Import).is_ok());
    }

    #[test]
    fn test_resolve_year() {
        assert_eq!(resolve_year(Some(2020), true), Err(FilterError::ConflictingYear));
        assert_eq!(resolve_year(None, true), Ok(Some(this_year())));
        assert_eq!(resolve_year(Some(2020), false), Ok(Some(2020)));
        assert_eq!(resolve_year(None, false), Ok(None));
        assert_eq!(resolve_year(Some(3000), false), Err(FilterError::YearOutOfRange(3000)));
    }

    #[test]
    fn test_flag_filter_exact() {
        let assets = vec![
            asset("r", Some("reject"), None, None, None),
            asset("p", Some("pick"), None, None, None),
            asset("n", None, None, None, None),
        ];
        let rejected = FilterCriteria::rejected(None, DateField::Import).unwrap();
        assert_eq!(ids(&filter(assets.clone(), &rejected)), ["r"]);

        let picked = FilterCriteria::new(false, true, None, DateField::Import).unwrap();
        assert_eq!(ids(&filter(assets.clone(), &picked)), ["p"]);

        let all = FilterCriteria::default();
        assert_eq!(filter(assets, &all).len(), 3);
    }

    #[test]
    fn test_year_by_import_date() {
        let assets = vec![
            asset("a", None, Some("2023-06-01T00:00:00Z"), Some("2024-01-01T00:00:00Z"), None),
            asset("b", None, Some("2024-06-01T00:00:00Z"), None, None),
        ];
        let criteria = FilterCriteria::new(false, false, Some(2023), DateField::Import).unwrap();
        assert_eq!(ids(&filter(assets, &criteria)), ["a"]);
    }

    #[test]
    fn test_no_cross_field_fallback() {
        // Only a sync date: invisible to import and capture year filters.
        let assets = vec![asset("a", None, None, Some("2023-02-02T00:00:00Z"), None)];
        for field in [DateField::Import, DateField::Capture] {
            let criteria = FilterCriteria::new(false, false, Some(2023), field).unwrap();
            assert!(filter(assets.clone(), &criteria).is_empty());
        }
        let criteria = FilterCriteria::new(false, false, Some(2023), DateField::Sync).unwrap();
        assert_eq!(filter(assets, &criteria).len(), 1);
    }

    #[test]
    fn test_capture_sentinel_excluded() {
        let assets = vec![
            asset("zero", None, None, None, Some("0000-00-00T00:00:00")),
            asset("real", None, None, None, Some("2022-08-08T10:00:00")),
        ];
        let criteria = FilterCriteria::new(false, false, Some(2022), DateField::Capture).unwrap();
        assert_eq!(ids(&filter(assets, &criteria)), ["real"]);
    }

    #[test]
    fn test_unparseable_date_excluded() {
        let assets = vec![asset("bad", None, Some("last tuesday"), None, None)];
        let criteria = FilterCriteria::new(false, false, Some(2024), DateField::Import).unwrap();
        assert!(filter(assets, &criteria).is_empty());
    }

    #[test]
    fn test_flag_and_year_combined() {
        let assets = vec![
            asset("r23", Some("reject"), Some("2023-01-01T00:00:00Z"), None, None),
            asset("r24", Some("reject"), Some("2024-01-01T00:00:00Z"), None, None),
            asset("p23", Some("pick"), Some("2023-01-01T00:00:00Z"), None, None),
        ];
        let criteria = FilterCriteria::rejected(Some(2023), DateField::Import).unwrap();
        assert_eq!(ids(&filter(assets, &criteria)), ["r23"]);
    }

    #[test]
    fn test_exclude_tasks_and_pattern() {
        let task = Asset::from_api(json!({"id": "t", "subtype": "task", "payload": {}}));
        let image = asset("WJD0001", None, None, None, None);
        let kept = exclude_tasks(vec![task, image]);
        assert_eq!(ids(&kept), ["WJD0001"]);
        assert!(filename_matches(&kept[0], "wjd"));
        assert!(!filename_matches(&kept[0], "DSC"));
    }
}
