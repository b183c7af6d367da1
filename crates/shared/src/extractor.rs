use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::models::SerpListing;

/// How many top results to fetch when sizing competitor content.
const TOP_RESULTS: usize = 4;

const FETCH_CONCURRENCY: usize = 4;

/// Pages below this word count are boilerplate or consent walls, not
/// article content.
const MIN_PAGE_WORDS: usize = 100;

/// Assumed length for a competitor page that could not be fetched.
const DEFAULT_PAGE_WORDS: usize = 2000;

/// Word count observed for one competitor page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageWordCount {
    pub position: u32,
    pub domain: String,
    pub words: usize,
    pub fetched: bool,
}

/// Competitor content-length statistics with a recommended range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentLengthAnalysis {
    pub average: f64,
    pub median: usize,
    pub min: usize,
    pub max: usize,
    pub recommended_min: u32,
    pub recommended_max: u32,
    pub pages: Vec<PageWordCount>,
}

impl Default for ContentLengthAnalysis {
    /// Fallback statistics when no competitor page could be measured.
    fn default() -> Self {
        Self {
            average: 3000.0,
            median: 3000,
            min: 1500,
            max: 5000,
            recommended_min: 3000,
            recommended_max: 4000,
            pages: Vec::new(),
        }
    }
}

pub struct ContentExtractor {
    client: Client,
    semaphore: Arc<Semaphore>,
}

impl ContentExtractor {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; SeoStrategy/1.0)")
            .build()
            .context("Failed to create HTTP client")?;

        let semaphore = Arc::new(Semaphore::new(FETCH_CONCURRENCY));

        Ok(Self { client, semaphore })
    }

    /// Fetch one page and count its words. Returns None when the page is
    /// unreachable, forbidden, or too thin to be article content.
    pub async fn word_count(&self, url: &str) -> Result<Option<usize>> {
        let _permit = self.semaphore.acquire().await?;

        for attempt in 0..3 {
            match self.try_word_count(url).await {
                Ok(count) => return Ok(count),
                Err(e) => {
                    if attempt == 2 {
                        log::warn!("Failed to fetch {url}: {e}");
                        return Ok(None);
                    }
                    let backoff = std::time::Duration::from_millis(500 * (2_u64.pow(attempt)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        Ok(None)
    }

    async fn try_word_count(&self, url: &str) -> Result<Option<usize>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send HTTP request")?;

        let status = response.status();
        if status == 401 || status == 403 || status == 404 {
            return Ok(None);
        }

        if !status.is_success() {
            anyhow::bail!("HTTP error: {}", status);
        }

        let html = response.text().await.context("Failed to read response body")?;

        let text = html2text::from_read(html.as_bytes(), 100);
        let words = text.split_whitespace().count();

        if words < MIN_PAGE_WORDS {
            return Ok(None);
        }

        Ok(Some(words))
    }

    /// Measure the top SERP results and derive a recommended word-count
    /// range. Pages that cannot be fetched count as the default length so
    /// one dead link does not skew the recommendation.
    pub async fn analyze_serp(&self, listings: &[SerpListing]) -> ContentLengthAnalysis {
        let top: Vec<&SerpListing> = listings.iter().take(TOP_RESULTS).collect();
        if top.is_empty() {
            return ContentLengthAnalysis::default();
        }

        let counts: Vec<Option<usize>> = stream::iter(top.iter().map(|l| l.url.clone()))
            .map(|url| async move { self.word_count(&url).await.ok().flatten() })
            .buffered(FETCH_CONCURRENCY)
            .collect()
            .await;

        let pages: Vec<PageWordCount> = top
            .iter()
            .zip(counts)
            .map(|(listing, count)| PageWordCount {
                position: listing.position,
                domain: listing.domain.clone(),
                words: count.unwrap_or(DEFAULT_PAGE_WORDS),
                fetched: count.is_some(),
            })
            .collect();

        analyze_counts(pages)
    }
}

/// Statistics over the measured pages; recommendation runs 10-20% above
/// the competitor average.
fn analyze_counts(pages: Vec<PageWordCount>) -> ContentLengthAnalysis {
    if pages.is_empty() {
        return ContentLengthAnalysis::default();
    }

    let counts: Vec<usize> = pages.iter().map(|p| p.words).collect();
    let average = counts.iter().sum::<usize>() as f64 / counts.len() as f64;

    let mut sorted = counts.clone();
    sorted.sort_unstable();
    let median = sorted[sorted.len() / 2];

    ContentLengthAnalysis {
        average,
        median,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        recommended_min: (average * 1.1) as u32,
        recommended_max: (average * 1.2) as u32,
        pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(position: u32, words: usize) -> PageWordCount {
        PageWordCount {
            position,
            domain: format!("site{position}.example"),
            words,
            fetched: true,
        }
    }

    #[test]
    fn test_analyze_counts_statistics() {
        let analysis = analyze_counts(vec![
            page(1, 3000),
            page(2, 2000),
            page(3, 1000),
            page(4, 2000),
        ]);

        assert_eq!(analysis.average, 2000.0);
        assert_eq!(analysis.median, 2000);
        assert_eq!(analysis.min, 1000);
        assert_eq!(analysis.max, 3000);
        assert_eq!(analysis.recommended_min, 2200);
        assert_eq!(analysis.recommended_max, 2400);
        assert_eq!(analysis.pages.len(), 4);
    }

    #[test]
    fn test_analyze_counts_empty_falls_back_to_defaults() {
        let analysis = analyze_counts(Vec::new());
        assert_eq!(analysis.recommended_min, 3000);
        assert_eq!(analysis.recommended_max, 4000);
        assert!(analysis.pages.is_empty());
    }

    #[test]
    fn test_single_page() {
        let analysis = analyze_counts(vec![page(1, 1500)]);
        assert_eq!(analysis.median, 1500);
        assert_eq!(analysis.min, 1500);
        assert_eq!(analysis.max, 1500);
        assert_eq!(analysis.recommended_min, 1650);
    }
}
