use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::asset::Asset;
use super::error::ApiError;
use super::fetch::{AssetPage, AssetSource};
use crate::retry::{retry_with_backoff, RetryConfig};

pub const API_BASE_URL: &str = "https://lr.adobe.io/v2/";

/// Anti-JSON-hijacking prefix Lightroom puts in front of every JSON body.
const GUARD_PREFIX: &str = "while (1) {}";

/// Embeds requested with every asset page.
const ASSET_EMBEDS: &str = "asset;develop_settings";

/// Strip the guard prefix (if any) and surrounding whitespace.
pub fn strip_guard(body: &str) -> &str {
    let body = body.trim_start();
    body.strip_prefix(GUARD_PREFIX).unwrap_or(body).trim()
}

/// Extract the `updated_since` boundary from a page's `links.next.href`.
///
/// The href may be absolute or relative to the API base.
pub fn next_cursor(base: &Url, links: &Value) -> Option<String> {
    let href = links["next"]["href"].as_str()?;
    let next = base.join(href).ok()?;
    next.query_pairs()
        .find(|(k, _)| k == "updated_since")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Authenticated client for the Lightroom partner API.
///
/// Holds one bearer token for its lifetime; refresh happens before the
/// client is built, never mid-command.
pub struct LightroomClient {
    http: Client,
    base_url: Url,
    headers: HeaderMap,
    retry: RetryConfig,
}

impl LightroomClient {
    pub fn new(access_token: &str, api_key: &str) -> Result<Self, ApiError> {
        Self::with_base_url(API_BASE_URL, access_token, api_key)
    }

    pub fn with_base_url(
        base_url: &str,
        access_token: &str,
        api_key: &str,
    ) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|_| ApiError::NotAuthenticated)?;
        headers.insert(AUTHORIZATION, bearer);
        let key = HeaderValue::from_str(api_key).map_err(|_| ApiError::NotAuthenticated)?;
        headers.insert("X-API-Key", key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            base_url,
            headers,
            retry: RetryConfig::default(),
        })
    }

    /// Send one request and return the guard-stripped body of a 2xx reply.
    async fn request(&self, method: Method, url: Url) -> Result<String, ApiError> {
        debug!("{} {}", method, url);
        let response = retry_with_backoff(&self.retry, ApiError::is_retryable, || {
            let req = self
                .http
                .request(method.clone(), url.clone())
                .headers(self.headers.clone());
            async move { req.send().await.map_err(ApiError::from) }
        })
        .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), url.as_str(), text));
        }
        Ok(strip_guard(&text).to_string())
    }

    async fn get_json(&self, url: Url) -> Result<Value, ApiError> {
        let body = self.request(Method::GET, url.clone()).await?;
        if body.is_empty() {
            return Err(ApiError::EmptyBody(url.to_string()));
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    /// Fetch one page of catalog assets, starting at `updated_since`.
    pub async fn list_assets(
        &self,
        catalog_id: &str,
        limit: usize,
        updated_since: Option<&str>,
    ) -> Result<AssetPage, ApiError> {
        let mut url = self.endpoint(&format!("catalogs/{catalog_id}/assets"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.to_string());
            query.append_pair("embed", ASSET_EMBEDS);
            if let Some(since) = updated_since {
                query.append_pair("updated_since", since);
            }
        }

        let mut response = self.get_json(url).await?;
        if !response.is_object() {
            return Err(ApiError::UnexpectedShape(
                "asset page is not a JSON object".into(),
            ));
        }

        let resources = match response.get_mut("resources") {
            Some(Value::Array(items)) => std::mem::take(items),
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                return Err(ApiError::UnexpectedShape(
                    "`resources` is not an array".into(),
                ))
            }
        };
        let assets: Vec<Asset> = resources.into_iter().map(Asset::from_api).collect();

        let next_cursor = next_cursor(&self.base_url, &response["links"]);
        debug!(
            "Page of {} assets, next cursor: {:?}",
            assets.len(),
            next_cursor
        );
        Ok(AssetPage {
            assets,
            has_more: next_cursor.is_some(),
            next_cursor,
        })
    }

    /// Fetch a single asset with full payload.
    pub async fn asset(&self, catalog_id: &str, asset_id: &str) -> Result<Asset, ApiError> {
        let url = self.endpoint(&format!("catalogs/{catalog_id}/assets/{asset_id}"))?;
        Ok(Asset::from_api(self.get_json(url).await?))
    }

    /// Remove an asset from the catalog. An empty success body is fine.
    pub async fn delete_asset(&self, catalog_id: &str, asset_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("catalogs/{catalog_id}/assets/{asset_id}"))?;
        self.request(Method::DELETE, url).await?;
        Ok(())
    }

    /// List the user's catalogs.
    ///
    /// Accounts expose either `catalog` (single) or `catalogs`; both are
    /// tried in that order and the first success wins.
    pub async fn catalogs(&self) -> Result<Vec<Value>, ApiError> {
        let mut last_err = None;
        for path in ["catalog", "catalogs"] {
            match self.get_json(self.endpoint(path)?).await {
                Ok(response) => return Ok(catalogs_from_response(response)),
                Err(e) => {
                    debug!("Catalog endpoint `{}` failed: {}", path, e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            ApiError::UnexpectedShape("no catalog endpoint responded".into())
        }))
    }

    /// List the albums in a catalog.
    pub async fn albums(&self, catalog_id: &str) -> Result<Vec<Value>, ApiError> {
        let url = self.endpoint(&format!("catalogs/{catalog_id}/albums"))?;
        let Value::Object(mut response) = self.get_json(url).await? else {
            return Err(ApiError::UnexpectedShape(
                "album list is not a JSON object".into(),
            ));
        };
        match response.remove("resources") {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(ApiError::UnexpectedShape(
                "`resources` is not an array".into(),
            )),
        }
    }
}

fn catalogs_from_response(response: Value) -> Vec<Value> {
    match response {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("resources") {
            Some(Value::Array(items)) => items,
            _ if obj.contains_key("id") => vec![Value::Object(obj)],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[async_trait::async_trait]
impl AssetSource for LightroomClient {
    async fn list_assets(
        &self,
        catalog_id: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<AssetPage, ApiError> {
        LightroomClient::list_assets(self, catalog_id, page_size, cursor).await
    }
}
