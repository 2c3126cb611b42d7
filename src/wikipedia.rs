//! Encyclopedia resolver backed by the Wikipedia API
//!
//! A place is resolved through an ordered list of lookup strategies, tried in
//! sequence until one yields a page with a non-empty extract. The resolved
//! title then drives a secondary gallery lookup. A place no strategy can
//! resolve is a soft-miss, not an error.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::PanelConfig;
use crate::models::WikiSummary;
use crate::{PanelError, Result, USER_AGENT};

/// Maximum number of gallery images requested per page
const GALLERY_LIMIT: u8 = 5;

/// Extensions accepted into the image gallery
const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

/// One page-lookup attempt in the fallback chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageQuery {
    /// Exact-title lookup
    Title(String),
    /// Full-text search, top result only
    Search(String),
}

/// The ordered strategies tried for a place, most specific first
#[must_use]
pub fn lookup_strategies(place: &str, title_suffix: &str) -> Vec<PageQuery> {
    vec![
        PageQuery::Title(format!("{place} ({title_suffix})")),
        PageQuery::Title(place.to_string()),
        PageQuery::Search(place.to_string()),
    ]
}

/// A raw page as returned by the backend, before cleaning
#[derive(Debug, Clone)]
pub struct WikiPage {
    /// Canonical page title
    pub title: String,
    /// Raw HTML intro extract
    pub extract: String,
    /// URL of the page's lead image, when it has one
    pub lead_image: Option<String>,
}

/// Backend the resolver runs its lookups against
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the page matching one query shape; `None` when the page is missing
    async fn fetch_page(&self, query: &PageQuery) -> Result<Option<WikiPage>>;

    /// Fetch URLs of images linked from the titled page
    async fn fetch_gallery(&self, title: &str) -> Result<Vec<String>>;
}

/// Produces the encyclopedia portion of the aggregated response
#[async_trait]
pub trait WikiProvider: Send + Sync {
    async fn resolve(&self, place: &str) -> Result<WikiSummary>;
}

/// Resolver running the fallback chain over a [`PageSource`]
pub struct WikiResolver<S> {
    source: S,
    title_suffix: String,
}

impl<S: PageSource> WikiResolver<S> {
    pub fn new(source: S, title_suffix: String) -> Self {
        Self {
            source,
            title_suffix,
        }
    }
}

#[async_trait]
impl<S: PageSource> WikiProvider for WikiResolver<S> {
    #[instrument(skip(self))]
    async fn resolve(&self, place: &str) -> Result<WikiSummary> {
        for query in lookup_strategies(place, &self.title_suffix) {
            let Some(page) = self.source.fetch_page(&query).await? else {
                debug!("No page for {query:?}, trying next strategy");
                continue;
            };
            if page.extract.trim().is_empty() {
                debug!("Empty extract for {query:?}, trying next strategy");
                continue;
            }

            // Gallery failures are swallowed: a summary without images is
            // still a usable result.
            let gallery = match self.source.fetch_gallery(&page.title).await {
                Ok(urls) => urls,
                Err(err) => {
                    warn!("Gallery lookup for '{}' failed: {err}", page.title);
                    Vec::new()
                }
            };

            let image_urls = collect_images(page.lead_image.as_deref(), gallery);
            info!(
                "Resolved '{place}' to page '{}' with {} images",
                page.title,
                image_urls.len()
            );
            return Ok(WikiSummary {
                summary: clean_extract(&page.extract),
                page_title: Some(page.title),
                image_urls,
            });
        }

        info!("No encyclopedia page found for '{place}'");
        Ok(WikiSummary::not_found())
    }
}

/// Filter the gallery to raster images, deduplicate, and put the lead image
/// first when it is not already present.
fn collect_images(lead_image: Option<&str>, gallery: Vec<String>) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    if let Some(lead) = lead_image {
        images.push(lead.to_string());
    }
    for url in gallery {
        if is_raster_image(&url) && !images.contains(&url) {
            images.push(url);
        }
    }
    images
}

fn is_raster_image(url: &str) -> bool {
    let lower = url.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static PRONUNCIATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*/[^()]+/[^()]*\)").expect("valid pronunciation regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Clean a raw HTML extract into plain display text.
///
/// Strips markup tags, drops pronunciation-guide parentheticals (slash-
/// bracketed IPA inside parens), collapses non-breaking-space entities and
/// whitespace runs, and trims.
#[must_use]
pub fn clean_extract(raw: &str) -> String {
    let text = TAG_RE.replace_all(raw, "");
    let text = PRONUNCIATION_RE.replace_all(&text, "");
    let text = text.replace("&nbsp;", " ").replace("&#160;", " ");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    text.trim().to_string()
}

/// HTTP client for the MediaWiki query API
pub struct WikipediaApi {
    client: Client,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    query: Option<ApiQuery>,
}

#[derive(Debug, Deserialize)]
struct ApiQuery {
    #[serde(default)]
    pages: Vec<ApiPage>,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    title: String,
    #[serde(default)]
    missing: bool,
    extract: Option<String>,
    original: Option<ApiImage>,
    #[serde(default)]
    imageinfo: Vec<ApiImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    source: String,
}

#[derive(Debug, Deserialize)]
struct ApiImageInfo {
    url: String,
}

impl WikipediaApi {
    /// Create a new client from configuration
    pub fn new(config: &PanelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.providers.timeout_seconds.into()))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PanelError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.providers.wikipedia_api_url.clone(),
        })
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<ApiResponse> {
        let mut query = vec![("action", "query"), ("format", "json"), ("formatversion", "2")];
        query.extend_from_slice(params);

        let response = self
            .client
            .get(&self.api_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| PanelError::network(format!("Wikipedia request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PanelError::api(format!(
                "Wikipedia request failed with status {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PanelError::api(format!("Failed to parse Wikipedia response: {e}")))
    }
}

#[async_trait]
impl PageSource for WikipediaApi {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Option<WikiPage>> {
        let mut params = vec![
            ("prop", "extracts|pageimages"),
            ("exintro", "1"),
            ("piprop", "original"),
            ("redirects", "1"),
        ];
        match query {
            PageQuery::Title(title) => params.push(("titles", title.as_str())),
            PageQuery::Search(term) => {
                params.push(("generator", "search"));
                params.push(("gsrsearch", term.as_str()));
                params.push(("gsrlimit", "1"));
            }
        }

        let response = self.query(&params).await?;
        let page = response
            .query
            .and_then(|q| q.pages.into_iter().next())
            .filter(|page| !page.missing);

        Ok(page.map(|page| WikiPage {
            title: page.title,
            extract: page.extract.unwrap_or_default(),
            lead_image: page.original.map(|image| image.source),
        }))
    }

    async fn fetch_gallery(&self, title: &str) -> Result<Vec<String>> {
        let limit = GALLERY_LIMIT.to_string();
        let params = vec![
            ("titles", title),
            ("generator", "images"),
            ("gimlimit", limit.as_str()),
            ("prop", "imageinfo"),
            ("iiprop", "url"),
        ];

        let response = self.query(&params).await?;
        let urls = response
            .query
            .map(|q| {
                q.pages
                    .into_iter()
                    .flat_map(|page| page.imageinfo)
                    .map(|info| info.url)
                    .collect()
            })
            .unwrap_or_default();
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[test]
    fn strategies_are_ordered_most_specific_first() {
        let strategies = lookup_strategies("Rio de Janeiro", "city");
        assert_eq!(
            strategies,
            vec![
                PageQuery::Title("Rio de Janeiro (city)".to_string()),
                PageQuery::Title("Rio de Janeiro".to_string()),
                PageQuery::Search("Rio de Janeiro".to_string()),
            ]
        );
    }

    #[rstest]
    #[case(
        "Rio de Janeiro (/\u{2c8}ri\u{2d0}o\u{28a}/) is a city.&nbsp;&nbsp;Nice.",
        "Rio de Janeiro is a city. Nice."
    )]
    #[case("<p>Plain <b>bold</b> text.</p>", "Plain bold text.")]
    #[case("  spaced   out \n text ", "spaced out text")]
    #[case("No markup at all.", "No markup at all.")]
    fn clean_extract_pipeline(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(clean_extract(raw), expected);
    }

    #[test]
    fn clean_extract_keeps_ordinary_parentheticals() {
        assert_eq!(
            clean_extract("Paris (France) is large."),
            "Paris (France) is large."
        );
    }

    #[rstest]
    #[case("https://upload.example/a.JPG", true)]
    #[case("https://upload.example/a.jpeg", true)]
    #[case("https://upload.example/map.svg", false)]
    #[case("https://upload.example/logo.png", true)]
    #[case("https://upload.example/audio.ogg", false)]
    fn raster_image_filter(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(is_raster_image(url), expected);
    }

    #[test]
    fn lead_image_is_first_and_deduplicated() {
        let images = collect_images(
            Some("https://img/lead.jpg"),
            vec![
                "https://img/a.png".to_string(),
                "https://img/lead.jpg".to_string(),
                "https://img/a.png".to_string(),
                "https://img/chart.svg".to_string(),
            ],
        );
        assert_eq!(
            images,
            vec![
                "https://img/lead.jpg".to_string(),
                "https://img/a.png".to_string(),
            ]
        );
    }

    #[test]
    fn parses_formatversion2_page_payload() {
        let body = r#"{
            "query": {"pages": [{
                "pageid": 1,
                "title": "Rio de Janeiro",
                "extract": "<p>A city.</p>",
                "original": {"source": "https://img/lead.jpg"}
            }]}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(body).unwrap();
        let page = parsed.query.unwrap().pages.into_iter().next().unwrap();
        assert_eq!(page.title, "Rio de Janeiro");
        assert!(!page.missing);
        assert_eq!(page.original.unwrap().source, "https://img/lead.jpg");
    }

    #[test]
    fn missing_page_marker_is_parsed() {
        let body = r#"{"query": {"pages": [{"title": "Nowhere (city)", "missing": true}]}}"#;
        let parsed: ApiResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.query.unwrap().pages[0].missing);
    }

    /// Scripted page source recording every lookup it serves
    struct FakeSource {
        pages: HashMap<String, WikiPage>,
        gallery_fails: bool,
        log: Arc<Mutex<Vec<PageQuery>>>,
    }

    impl FakeSource {
        fn new(pages: Vec<WikiPage>) -> (Self, Arc<Mutex<Vec<PageQuery>>>) {
            let log = Arc::new(Mutex::new(Vec::new()));
            let source = Self {
                pages: pages
                    .into_iter()
                    .map(|page| (page.title.clone(), page))
                    .collect(),
                gallery_fails: false,
                log: log.clone(),
            };
            (source, log)
        }

        fn with_failing_gallery(mut self) -> Self {
            self.gallery_fails = true;
            self
        }
    }

    #[async_trait]
    impl PageSource for FakeSource {
        async fn fetch_page(&self, query: &PageQuery) -> Result<Option<WikiPage>> {
            self.log.lock().unwrap().push(query.clone());
            let key = match query {
                PageQuery::Title(title) => title,
                PageQuery::Search(term) => term,
            };
            Ok(self.pages.get(key).cloned())
        }

        async fn fetch_gallery(&self, _title: &str) -> Result<Vec<String>> {
            if self.gallery_fails {
                return Err(PanelError::network("gallery unavailable"));
            }
            Ok(Vec::new())
        }
    }

    fn page(title: &str, extract: &str) -> WikiPage {
        WikiPage {
            title: title.to_string(),
            extract: extract.to_string(),
            lead_image: None,
        }
    }

    #[tokio::test]
    async fn bare_title_wins_when_suffixed_title_is_missing() {
        let (source, log) = FakeSource::new(vec![page("Niter\u{f3}i", "<p>A city in Brazil.</p>")]);
        let resolver = WikiResolver::new(source, "city".to_string());

        let summary = resolver.resolve("Niter\u{f3}i").await.unwrap();
        assert_eq!(summary.page_title.as_deref(), Some("Niter\u{f3}i"));
        assert_eq!(summary.summary, "A city in Brazil.");

        // The search fallback must not have run.
        let queries = log.lock().unwrap();
        assert_eq!(queries.len(), 2);
        assert!(matches!(queries[1], PageQuery::Title(_)));
    }

    #[tokio::test]
    async fn all_strategies_missing_is_a_soft_miss() {
        let (source, log) = FakeSource::new(vec![]);
        let resolver = WikiResolver::new(source, "city".to_string());

        let summary = resolver.resolve("Atlantis").await.unwrap();
        assert!(summary.is_not_found());
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn empty_extract_falls_through_to_search() {
        let (source, log) = FakeSource::new(vec![
            page("Ghost Town", "   "),
            page("Ghost Town (city)", ""),
        ]);
        let resolver = WikiResolver::new(source, "city".to_string());

        let summary = resolver.resolve("Ghost Town").await.unwrap();
        assert!(summary.is_not_found());
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn gallery_failure_is_swallowed() {
        let (source, _log) = FakeSource::new(vec![page("Rio de Janeiro", "A city.")]);
        let resolver = WikiResolver::new(source.with_failing_gallery(), "city".to_string());

        let summary = resolver.resolve("Rio de Janeiro").await.unwrap();
        assert_eq!(summary.page_title.as_deref(), Some("Rio de Janeiro"));
        assert!(summary.image_urls.is_empty());
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        struct BrokenSource;

        #[async_trait]
        impl PageSource for BrokenSource {
            async fn fetch_page(&self, _query: &PageQuery) -> Result<Option<WikiPage>> {
                Err(PanelError::network("connection reset"))
            }

            async fn fetch_gallery(&self, _title: &str) -> Result<Vec<String>> {
                Ok(Vec::new())
            }
        }

        let resolver = WikiResolver::new(BrokenSource, "city".to_string());
        let result = resolver.resolve("Rio de Janeiro").await;
        assert!(matches!(result, Err(PanelError::Network { .. })));
    }
}
