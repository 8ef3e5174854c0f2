//! # Web Search Tool
//!
//! DuckDuckGo HTML search, exposed to the search agent as the `web_search`
//! rig tool. DuckDuckGo has no free JSON API, so result links are pulled out
//! of the HTML results page.

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::SearchError;

const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Web search backed by the DuckDuckGo HTML endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchTool {
    /// Maximum results returned per search
    max_results: usize,

    /// Results page URL; the query is appended as `?q=`
    endpoint: String,

    /// Pause before each request to stay under the provider's rate limit
    #[serde(with = "millis")]
    request_delay: Duration,
}

impl WebSearchTool {
    pub fn new(max_results: usize) -> Self {
        Self {
            max_results,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_delay: Duration::from_millis(500),
        }
    }

    /// Point the tool at a different results page (used by tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Search the web for `query`.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        info!(query = %query, "Performing web search");

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        let url = format!("{}?q={}", self.endpoint, urlencoding::encode(query));
        debug!(url = %url, "Fetching search results");

        let response = client.get(&url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited);
        }
        if !status.is_success() {
            return Err(SearchError::SearchFailed(format!("HTTP {}", status)));
        }

        let body = response.text().await?;
        let results = self.parse_results(&body);

        if results.is_empty() {
            warn!(query = %query, "No search results found");
        } else {
            info!(query = %query, count = results.len(), "Search completed");
        }
        Ok(results)
    }

    /// Pull result links out of a results page.
    ///
    /// Redirect links (`uddg=`) carry the real target and come first; the
    /// visible `result__url` anchors fill up whatever is left.
    fn parse_results(&self, html: &str) -> Vec<SearchResult> {
        let mut seen = HashSet::new();
        let redirect_targets = html
            .split("uddg=")
            .skip(1)
            .filter_map(|segment| {
                let end = segment.find(['&', '"', '\''])?;
                urlencoding::decode(&segment[..end])
                    .ok()
                    .map(|url| url.into_owned())
            });
        let visible_links = html.split("result__url").skip(1).filter_map(|segment| {
            let start = segment.find("href=\"")? + "href=\"".len();
            let href = &segment[start..];
            let href = &href[..href.find('"')?];
            if let Some(rest) = href.strip_prefix("//") {
                Some(format!("https://{}", rest))
            } else if href.starts_with("http") {
                Some(href.to_string())
            } else {
                None
            }
        });

        redirect_targets
            .chain(visible_links)
            .filter(|url| url.starts_with("http") && !url.contains("duckduckgo.com"))
            .filter(|url| seen.insert(url.clone()))
            .take(self.max_results)
            .map(|url| SearchResult {
                title: extract_domain(&url).unwrap_or_else(|| "Result".to_string()),
                url,
                snippet: "Search result from DuckDuckGo".to_string(),
            })
            .collect()
    }
}

/// Extract the host part of a URL.
fn extract_domain(url: &str) -> Option<String> {
    url.split("//")
        .nth(1)?
        .split('/')
        .next()
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

/// Render results as the markdown list the search agent reads.
pub fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results found for: {}", query);
    }

    let listed = results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. **{}**\n   URL: {}\n   {}\n", i + 1, r.title, r.url, r.snippet))
        .collect::<Vec<_>>()
        .join("\n");

    format!("## Search Results for: {}\n\n{}", query, listed)
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Arguments the model passes to `web_search`.
#[derive(Debug, Deserialize, Serialize)]
pub struct SearchArgs {
    pub query: String,
}

impl Tool for WebSearchTool {
    const NAME: &'static str = "web_search";

    type Args = SearchArgs;
    type Output = String;
    type Error = SearchError;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search the web using DuckDuckGo. Use this to find current information about any topic.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query to find information about"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let results = self.search(&args.query).await?;
        Ok(format_results(&args.query, &results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESULTS_PAGE: &str = r#"
        <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.example.com%2Fpizza&rut=1">Pizza</a>
        <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.example.com%2Fpizza&rut=2">Pizza again</a>
        <a class="result__url" href="//rome.example.org/guide">rome.example.org</a>
        <a class="result__url" href="/relative/link">ignored</a>
    "#;

    fn tool(max_results: usize) -> WebSearchTool {
        WebSearchTool::new(max_results).with_request_delay(Duration::ZERO)
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://www.example.com/page"),
            Some("www.example.com".to_string())
        );
        assert_eq!(extract_domain("not a url"), None);
    }

    #[test]
    fn test_parse_results_dedupes_and_orders() {
        let results = tool(5).parse_results(RESULTS_PAGE);
        let urls: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://www.example.com/pizza", "https://rome.example.org/guide"]
        );
        assert_eq!(results[0].title, "www.example.com");
    }

    #[test]
    fn test_parse_results_respects_limit() {
        assert_eq!(tool(1).parse_results(RESULTS_PAGE).len(), 1);
    }

    #[test]
    fn test_format_results_empty() {
        assert_eq!(format_results("rust", &[]), "No results found for: rust");
    }

    #[tokio::test]
    async fn test_search_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "pizza rome"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
            .mount(&server)
            .await;

        let results = tool(5)
            .with_endpoint(format!("{}/html/", server.uri()))
            .search("pizza rome")
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_search_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = tool(5)
            .with_endpoint(format!("{}/html/", server.uri()))
            .search("pizza")
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::RateLimited));
    }

    #[tokio::test]
    async fn test_search_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = tool(5)
            .with_endpoint(format!("{}/html/", server.uri()))
            .search("pizza")
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::SearchFailed(_)));
    }
}
