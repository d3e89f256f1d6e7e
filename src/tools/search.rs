use log::{ info, warn };
use serde::{ Deserialize, Serialize };
use std::time::Duration;

use crate::cli::Args;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Deserialize, Debug)]
struct WebSearchResponse {
    #[serde(default, rename = "webPages")]
    web_pages: Option<WebPages>,
}

#[derive(Deserialize, Debug)]
struct WebPages {
    #[serde(default)]
    value: Vec<WebPage>,
}

#[derive(Deserialize, Debug)]
struct WebPage {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Serialize, Debug)]
struct GroundingRequest<'a> {
    query: &'a str,
    count: usize,
}

#[derive(Deserialize, Debug)]
struct GroundingResponse {
    #[serde(default)]
    results: Vec<GroundingResult>,
}

#[derive(Deserialize, Debug)]
struct GroundingResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// Web search with two remote backends and a canned last resort: the
/// grounding endpoint is tried first, then the direct search API, and a
/// static hint result when neither is configured or both fail.
pub struct SearchTool {
    http: reqwest::Client,
    grounding_endpoint: String,
    grounding_api_key: String,
    search_endpoint: String,
    search_api_key: String,
    site_filter: String,
}

impl SearchTool {
    pub fn from_args(args: &Args) -> Self {
        let http = reqwest::Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            grounding_endpoint: args.grounding_endpoint.clone(),
            grounding_api_key: args.grounding_api_key.clone(),
            search_endpoint: args.search_endpoint.clone(),
            search_api_key: args.search_api_key.clone(),
            site_filter: args.search_site_filter.clone(),
        }
    }

    pub async fn search(&self, query: &str, count: usize) -> Vec<SearchResult> {
        let query = self.scoped_query(query);

        if !self.grounding_endpoint.is_empty() {
            match self.grounding_search(&query, count).await {
                Ok(results) if !results.is_empty() => return results,
                Ok(_) => info!("Grounding search returned no results for: {}", query),
                Err(e) => warn!("Grounding search failed: {}", e),
            }
        }

        if !self.search_api_key.is_empty() {
            match self.direct_search(&query, count).await {
                Ok(results) if !results.is_empty() => return results,
                Ok(_) => info!("Direct search returned no results for: {}", query),
                Err(e) => warn!("Direct search failed: {}", e),
            }
        }

        vec![SearchResult {
            title: "Search unavailable".to_string(),
            url: String::new(),
            snippet: format!(
                "No search backend is configured or reachable. Unable to look up: {}",
                query
            ),
        }]
    }

    fn scoped_query(&self, query: &str) -> String {
        if self.site_filter.is_empty() {
            query.to_string()
        } else {
            format!("site:{} {}", self.site_filter, query)
        }
    }

    async fn grounding_search(
        &self,
        query: &str,
        count: usize
    ) -> Result<Vec<SearchResult>, reqwest::Error> {
        let response = self.http
            .post(&self.grounding_endpoint)
            .header("api-key", &self.grounding_api_key)
            .json(&(GroundingRequest { query, count }))
            .send().await?
            .error_for_status()?;
        let body: GroundingResponse = response.json().await?;
        Ok(body.results
            .into_iter()
            .map(|r| SearchResult { title: r.title, url: r.url, snippet: r.content })
            .collect())
    }

    async fn direct_search(
        &self,
        query: &str,
        count: usize
    ) -> Result<Vec<SearchResult>, reqwest::Error> {
        let response = self.http
            .get(&self.search_endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.search_api_key)
            .query(&[("q", query), ("count", &count.to_string())])
            .send().await?
            .error_for_status()?;
        let body: WebSearchResponse = response.json().await?;
        Ok(body.web_pages
            .map(|pages| {
                pages.value
                    .into_iter()
                    .map(|p| SearchResult { title: p.name, url: p.url, snippet: p.snippet })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Renders results as a numbered block for inclusion in a prompt.
pub fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results found.".to_string();
    }
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n   {}\n   {}", i + 1, r.title, r.url, r.snippet))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn unconfigured_search_yields_fallback_result() {
        let tool = SearchTool::from_args(&Args::parse_from(["foundry-agent"]));
        let results = tool.search("rust async runtimes", 3).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Search unavailable");
        assert!(results[0].snippet.contains("rust async runtimes"));
    }

    #[test]
    fn site_filter_prefixes_query() {
        let mut args = Args::parse_from(["foundry-agent"]);
        args.search_site_filter = "docs.example.com".into();
        let tool = SearchTool::from_args(&args);
        assert_eq!(tool.scoped_query("widgets"), "site:docs.example.com widgets");
    }

    #[test]
    fn formatting_numbers_results() {
        let results = vec![
            SearchResult {
                title: "One".into(),
                url: "https://a".into(),
                snippet: "first".into(),
            },
            SearchResult {
                title: "Two".into(),
                url: "https://b".into(),
                snippet: "second".into(),
            }
        ];
        let block = format_results(&results);
        assert!(block.starts_with("1. One"));
        assert!(block.contains("2. Two"));
        assert_eq!(format_results(&[]), "No results found.");
    }
}
