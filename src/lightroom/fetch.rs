use indicatif::ProgressBar;
use tracing::{debug, warn};

use super::asset::Asset;
use super::error::ApiError;

/// One page of the remote asset listing.
#[derive(Debug, Default)]
pub struct AssetPage {
    pub assets: Vec<Asset>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Anything that can serve asset pages by cursor.
///
/// `LightroomClient` is the production implementation; tests script pages.
#[async_trait::async_trait]
pub trait AssetSource: Send + Sync {
    async fn list_assets(
        &self,
        catalog_id: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<AssetPage, ApiError>;
}

/// Why pagination ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The server reported no further page.
    Exhausted,
    /// The server handed back the cursor we had just sent.
    CursorStalled,
    /// The configured page ceiling was reached.
    PageLimit,
}

#[derive(Debug)]
pub struct FetchResult {
    pub assets: Vec<Asset>,
    pub pages: usize,
    pub stop: StopReason,
}

/// Drive cursor pagination to completion.
///
/// Assets are concatenated in page order without de-duplication. A stalled
/// cursor or the page ceiling ends the loop with a warning but still
/// returns everything gathered; any page error aborts with no partial result.
pub async fn fetch_all(
    source: &dyn AssetSource,
    catalog_id: &str,
    page_size: usize,
    max_pages: usize,
    progress: Option<&ProgressBar>,
) -> Result<FetchResult, ApiError> {
    let mut assets: Vec<Asset> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    let stop = loop {
        let page = source
            .list_assets(catalog_id, page_size, cursor.as_deref())
            .await?;
        pages += 1;
        debug!(
            "Fetched page {}, cursor={:?}, batch={}",
            pages,
            cursor,
            page.assets.len()
        );
        assets.extend(page.assets);

        if let Some(pb) = progress {
            pb.set_message(format!("{} assets, {} pages", assets.len(), pages));
            pb.tick();
        }

        let next = match page.next_cursor {
            Some(next) if page.has_more => next,
            _ => break StopReason::Exhausted,
        };
        if cursor.as_deref() == Some(next.as_str()) {
            warn!(
                "Cursor did not advance ({}), stopping pagination after {} pages",
                next, pages
            );
            break StopReason::CursorStalled;
        }
        if pages >= max_pages {
            warn!(
                "Reached page limit of {}, stopping pagination with {} assets",
                max_pages,
                assets.len()
            );
            break StopReason::PageLimit;
        }
        cursor = Some(next);
    };

    Ok(FetchResult {
        assets,
        pages,
        stop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lightroom::asset::tests::api_asset;
    use std::sync::Mutex;

    /// Serves pre-scripted pages and records the cursor of every call.
    struct ScriptedSource {
        pages: Mutex<Vec<Result<AssetPage, ApiError>>>,
        cursors: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Result<AssetPage, ApiError>>) -> Self {
            let mut pages = pages;
            pages.reverse();
            Self {
                pages: Mutex::new(pages),
                cursors: Mutex::new(Vec::new()),
            }
        }

        fn cursors(&self) -> Vec<Option<String>> {
            self.cursors.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl AssetSource for ScriptedSource {
        async fn list_assets(
            &self,
            _catalog_id: &str,
            _page_size: usize,
            cursor: Option<&str>,
        ) -> Result<AssetPage, ApiError> {
            self.cursors.lock().unwrap().push(cursor.map(String::from));
            self.pages
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(AssetPage::default()))
        }
    }

    fn page(ids: &[&str], next: Option<&str>) -> Result<AssetPage, ApiError> {
        Ok(AssetPage {
            assets: ids
                .iter()
                .map(|id| Asset::from_api(api_asset(id, &format!("{id}.JPG"), None)))
                .collect(),
            has_more: next.is_some(),
            next_cursor: next.map(String::from),
        })
    }

    fn ids(result: &FetchResult) -> Vec<&str> {
        result.assets.iter().map(|a| a.id()).collect()
    }

    #[tokio::test]
    async fn test_concatenates_pages_in_order() {
        let source = ScriptedSource::new(vec![
            page(&["a", "b"], Some("T1")),
            page(&["c"], Some("T2")),
            page(&["d", "e"], None),
        ]);
        let result = fetch_all(&source, "cat", 2, 100, None).await.unwrap();
        assert_eq!(ids(&result), ["a", "b", "c", "d", "e"]);
        assert_eq!(result.pages, 3);
        assert_eq!(result.stop, StopReason::Exhausted);
        assert_eq!(
            source.cursors(),
            [None, Some("T1".to_string()), Some("T2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_stalled_cursor_stops_after_second_page() {
        let source = ScriptedSource::new(vec![
            page(&["a", "b"], Some("T1")),
            page(&["c", "d"], Some("T1")),
            page(&["never"], None),
        ]);
        let result = fetch_all(&source, "cat", 2, 100, None).await.unwrap();
        assert_eq!(ids(&result), ["a", "b", "c", "d"]);
        assert_eq!(result.pages, 2);
        assert_eq!(result.stop, StopReason::CursorStalled);
    }

    #[tokio::test]
    async fn test_page_ceiling() {
        let source = ScriptedSource::new(vec![
            page(&["a"], Some("T1")),
            page(&["b"], Some("T2")),
            page(&["c"], Some("T3")),
            page(&["d"], Some("T4")),
        ]);
        let result = fetch_all(&source, "cat", 1, 3, None).await.unwrap();
        assert_eq!(ids(&result), ["a", "b", "c"]);
        assert_eq!(result.pages, 3);
        assert_eq!(result.stop, StopReason::PageLimit);
    }

    #[tokio::test]
    async fn test_has_more_without_cursor_is_exhausted() {
        let source = ScriptedSource::new(vec![Ok(AssetPage {
            assets: Vec::new(),
            has_more: true,
            next_cursor: None,
        })]);
        let result = fetch_all(&source, "cat", 10, 100, None).await.unwrap();
        assert!(result.assets.is_empty());
        assert_eq!(result.stop, StopReason::Exhausted);
    }

    #[tokio::test]
    async fn test_page_error_discards_partial_result() {
        let source = ScriptedSource::new(vec![
            page(&["a"], Some("T1")),
            Err(ApiError::RateLimited),
        ]);
        let err = fetch_all(&source, "cat", 1, 100, None).await.unwrap_err();
        assert!(matches!(err, ApiError::RateLimited));
    }

    #[tokio::test]
    async fn test_duplicates_across_pages_are_kept() {
        let source = ScriptedSource::new(vec![
            page(&["a", "b"], Some("T1")),
            page(&["b", "c"], None),
        ]);
        let result = fetch_all(&source, "cat", 2, 100, None).await.unwrap();
        assert_eq!(ids(&result), ["a", "b", "b", "c"]);
    }

    #[tokio::test]
    async fn test_progress_message_updated() {
        let source = ScriptedSource::new(vec![page(&["a", "b"], None)]);
        let pb = ProgressBar::hidden();
        fetch_all(&source, "cat", 2, 100, Some(&pb)).await.unwrap();
        assert_eq!(pb.message(), "2 assets, 1 pages");
    }
}
