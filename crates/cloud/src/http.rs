//! HTTP client for a remote earth-observation service.
//!
//! Wire protocol (JSON, bearer token from the shared [`Session`]):
//! - `POST {endpoint}/catalog/search` with a [`SceneFilter`] body, paginated
//!   through a `next` token
//! - `POST {endpoint}/evaluate` with `{"query": ...}`, answered by
//!   `{"result": ...}` or `{"error": "..."}`

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::CloudAuth;
use crate::error::{CloudError, Result};
use crate::query::{Query, QueryOutput, SceneFilter, SceneInfo};
use crate::reos::Reos;
use crate::session::Session;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for [`HttpReos`].
#[derive(Debug, Clone)]
pub struct ReosOptions {
    /// Per-request timeout (default: none, a hung request waits indefinitely).
    pub request_timeout: Option<Duration>,
    /// Maximum total scenes to fetch across catalog pages (default 5000).
    pub max_items: usize,
}

impl Default for ReosOptions {
    fn default() -> Self {
        Self {
            request_timeout: None,
            max_items: 5000,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CatalogRequest<'a> {
    #[serde(flatten)]
    filter: &'a SceneFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
}

#[derive(Deserialize)]
struct CatalogPage {
    scenes: Vec<SceneInfo>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Serialize)]
struct EvaluateRequest<'a> {
    query: &'a Query,
}

#[derive(Deserialize)]
struct EvaluateResponse {
    #[serde(default)]
    result: Option<QueryOutput>,
    #[serde(default)]
    error: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`Reos`] implementation talking JSON over HTTP.
pub struct HttpReos {
    endpoint: String,
    client: reqwest::Client,
    session: Arc<Session>,
    options: ReosOptions,
}

impl HttpReos {
    /// Create a client for `endpoint` (e.g. `"https://reos.example.com/v1"`).
    pub fn new(endpoint: &str, session: Arc<Session>, options: ReosOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CloudError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
            session,
            options,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Full URL for a service path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let mut auth_headers = Vec::new();
        self.session.sign_request(url, "POST", &mut auth_headers)?;

        let mut req = self.client.post(url).json(body);
        for (key, value) in &auth_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| CloudError::Network(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| CloudError::Network(format!("reading response body: {e}")))?;

        if !status.is_success() {
            return Err(CloudError::Network(format!(
                "{} returned HTTP {}: {}",
                url,
                status,
                text.chars().take(500).collect::<String>()
            )));
        }

        serde_json::from_str(&text)
            .map_err(|e| CloudError::InvalidResponse(format!("parsing response from {url}: {e}")))
    }
}

#[async_trait]
impl Reos for HttpReos {
    async fn list_scenes(&self, filter: &SceneFilter) -> Result<Vec<SceneInfo>> {
        let url = self.url("catalog/search");
        let url = url.as_str();

        collect_pages(self.options.max_items, |token| async move {
            let request = CatalogRequest {
                filter,
                token: token.as_deref(),
            };
            self.post_json(url, &request).await
        })
        .await
    }

    async fn evaluate(&self, query: &Query) -> Result<QueryOutput> {
        let url = self.url("evaluate");
        let response: EvaluateResponse = self.post_json(&url, &EvaluateRequest { query }).await?;
        into_output(response)
    }
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

/// Follow catalog pages from the first one until the `next` token runs out,
/// a page comes back empty, or `max_items` scenes are collected.
///
/// `fetch_page` receives the continuation token (`None` for the first page).
async fn collect_pages<F, Fut>(max_items: usize, mut fetch_page: F) -> Result<Vec<SceneInfo>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<CatalogPage>>,
{
    let mut scenes: Vec<SceneInfo> = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let mut page = fetch_page(token.take()).await?;
        debug!("catalog page with {} scenes", page.scenes.len());

        let page_empty = page.scenes.is_empty();
        scenes.append(&mut page.scenes);

        if scenes.len() >= max_items || page_empty {
            break;
        }
        match page.next {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    scenes.truncate(max_items);
    Ok(scenes)
}

/// An `error` payload wins over any `result` sent alongside it.
fn into_output(response: EvaluateResponse) -> Result<QueryOutput> {
    match (response.result, response.error) {
        (_, Some(message)) => Err(CloudError::Remote(message)),
        (Some(result), None) => Ok(result),
        (None, None) => Err(CloudError::InvalidResponse(
            "evaluation response has neither result nor error".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{DateRange, Image, Reducer};
    use chrono::NaiveDate;
    use fieldcheck_core::vector::parse_geometry;

    fn unready_client() -> HttpReos {
        HttpReos::new(
            "https://reos.example.com/v1/",
            Arc::new(Session::new()),
            ReosOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_url_joining() {
        let reos = unready_client();
        assert_eq!(reos.url("evaluate"), "https://reos.example.com/v1/evaluate");
        assert_eq!(
            reos.url("/catalog/search"),
            "https://reos.example.com/v1/catalog/search"
        );
    }

    #[tokio::test]
    async fn test_unready_session_fails_without_request() {
        let reos = unready_client();
        let region = parse_geometry("[[[0,0],[10,0],[10,10],[0,0]]]").unwrap();
        let query = Query::ReduceRegion {
            region,
            reducer: Reducer::Mean,
            scale: 10.0,
            images: vec![Image::band("a", "B8")],
        };

        let err = reos.evaluate(&query).await.unwrap_err();
        assert!(matches!(err, CloudError::SessionUnavailable(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_catalog_request_flattens_filter() {
        let filter = SceneFilter {
            collection: "COPERNICUS/S2".into(),
            bounds: parse_geometry("[[[0,0],[10,0],[10,10],[0,0]]]").unwrap(),
            date_range: DateRange::new(
                NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2099, 5, 1).unwrap(),
            ),
            cloud_property: "CLOUDY_PIXEL_PERCENTAGE".into(),
            cloud_cover_max: 15.0,
        };
        let json = serde_json::to_value(CatalogRequest {
            filter: &filter,
            token: Some("page-2"),
        })
        .unwrap();

        assert_eq!(json["collection"], "COPERNICUS/S2");
        assert_eq!(json["dateRange"]["start"], "2015-01-01");
        assert_eq!(json["cloudCoverMax"], 15.0);
        assert_eq!(json["token"], "page-2");
    }

    fn scene(id: &str) -> SceneInfo {
        SceneInfo {
            id: id.into(),
            timestamp: "2023-06-01T10:00:00Z".parse().unwrap(),
            cloud_cover: Some(1.0),
            bands: vec!["B4".into(), "B8".into()],
        }
    }

    fn page(ids: &[&str], next: Option<&str>) -> CatalogPage {
        CatalogPage {
            scenes: ids.iter().map(|id| scene(id)).collect(),
            next: next.map(String::from),
        }
    }

    /// Serve `pages` in order, recording the token each request carried.
    async fn paginate(
        pages: Vec<CatalogPage>,
        max_items: usize,
    ) -> (Result<Vec<SceneInfo>>, Vec<Option<String>>) {
        let mut pages = pages.into_iter();
        let mut tokens = Vec::new();
        let result = collect_pages(max_items, |token| {
            tokens.push(token);
            let page = pages.next();
            async move { page.ok_or_else(|| CloudError::InvalidResponse("no more pages".into())) }
        })
        .await;
        (result, tokens)
    }

    fn ids(scenes: &[SceneInfo]) -> Vec<&str> {
        scenes.iter().map(|s| s.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_pages_joined_in_order() {
        let (result, tokens) = paginate(
            vec![
                page(&["a", "b"], Some("p2")),
                page(&["c"], Some("p3")),
                page(&["d"], None),
            ],
            100,
        )
        .await;

        assert_eq!(ids(&result.unwrap()), vec!["a", "b", "c", "d"]);
        assert_eq!(tokens, vec![None, Some("p2".to_string()), Some("p3".to_string())]);
    }

    #[tokio::test]
    async fn test_max_items_caps_and_truncates() {
        let (result, tokens) = paginate(
            vec![
                page(&["a", "b"], Some("p2")),
                page(&["c", "d"], Some("p3")),
                page(&["e"], None),
            ],
            3,
        )
        .await;

        assert_eq!(ids(&result.unwrap()), vec!["a", "b", "c"]);
        assert_eq!(tokens.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_page_ends_paging() {
        let (result, tokens) = paginate(
            vec![page(&["a"], Some("p2")), page(&[], Some("p3")), page(&["z"], None)],
            100,
        )
        .await;

        assert_eq!(ids(&result.unwrap()), vec!["a"]);
        assert_eq!(tokens.len(), 2);
    }

    #[tokio::test]
    async fn test_page_error_aborts_listing() {
        let (result, tokens) = paginate(vec![page(&["a"], Some("p2"))], 100).await;

        assert!(matches!(result, Err(CloudError::InvalidResponse(_))));
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_error_payload_is_remote_failure() {
        let response: EvaluateResponse =
            serde_json::from_str(r#"{"error": "quota exceeded"}"#).unwrap();
        match into_output(response) {
            Err(CloudError::Remote(message)) => assert_eq!(message, "quota exceeded"),
            other => panic!("expected remote failure, got {other:?}"),
        }

        let both: EvaluateResponse = serde_json::from_str(
            r#"{"result": {"kind": "area", "value": 1.0}, "error": "partial failure"}"#,
        )
        .unwrap();
        assert!(matches!(into_output(both), Err(CloudError::Remote(_))));
    }

    #[test]
    fn test_empty_payload_is_invalid_response() {
        let response: EvaluateResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(into_output(response), Err(CloudError::InvalidResponse(_))));
    }

    #[test]
    fn test_result_payload_is_output() {
        let response: EvaluateResponse =
            serde_json::from_str(r#"{"result": {"kind": "area", "value": 12.5}}"#).unwrap();
        assert_eq!(into_output(response).unwrap(), QueryOutput::Area(12.5));
    }
}
