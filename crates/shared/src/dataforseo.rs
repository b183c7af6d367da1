use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::{DomainAuthority, KeywordRecord, RankedKeyword, SerpListing};

const BASE_URL: &str = "https://api.dataforseo.com/v3";
const STATUS_OK: u32 = 20000;

const LOCATION_CODE_US: u32 = 2840;
const LANGUAGE_CODE_EN: &str = "en";

/// Fixed pause after every call; the provider meters requests, so calls
/// are strictly sequential with a constant inter-request delay.
const REQUEST_DELAY: std::time::Duration = std::time::Duration::from_millis(1000);

const TREND_MONTHS: usize = 12;

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "R: DeserializeOwned"))]
struct Envelope<R> {
    status_code: u32,
    #[serde(default)]
    status_message: String,
    #[serde(default)]
    tasks: Vec<Task<R>>,
}

#[derive(Debug, Deserialize)]
struct Task<R> {
    status_code: u32,
    #[serde(default)]
    status_message: String,
    result: Option<Vec<R>>,
}

#[derive(Debug, Deserialize)]
struct VolumeRow {
    keyword: Option<String>,
    search_volume: Option<u64>,
    competition_index: Option<u32>,
    cpc: Option<f64>,
    #[serde(default)]
    monthly_searches: Vec<MonthlySearch>,
}

#[derive(Debug, Deserialize)]
struct MonthlySearch {
    search_volume: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RelatedRow {
    #[serde(default)]
    keywords: Vec<VolumeRow>,
}

#[derive(Debug, Deserialize)]
struct SerpPage {
    #[serde(default)]
    items: Vec<SerpItem>,
}

#[derive(Debug, Deserialize)]
struct SerpItem {
    #[serde(rename = "type")]
    item_type: Option<String>,
    rank_group: Option<u32>,
    title: Option<String>,
    url: Option<String>,
    domain: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RankOverviewPage {
    #[serde(default)]
    items: Vec<RankOverviewItem>,
}

#[derive(Debug, Deserialize)]
struct RankOverviewItem {
    metrics: Option<RankMetrics>,
}

#[derive(Debug, Deserialize)]
struct RankMetrics {
    organic: Option<OrganicMetrics>,
}

#[derive(Debug, Deserialize)]
struct OrganicMetrics {
    pos_1: Option<u64>,
    pos_2_3: Option<u64>,
    pos_4_10: Option<u64>,
    count: Option<u64>,
    etv: Option<f64>,
    estimated_paid_traffic_cost: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RankedPage {
    #[serde(default)]
    items: Vec<RankedItem>,
}

#[derive(Debug, Deserialize)]
struct RankedItem {
    keyword_data: Option<RankedKeywordData>,
    ranked_serp_element: Option<RankedSerpElement>,
}

#[derive(Debug, Deserialize)]
struct RankedKeywordData {
    keyword: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RankedSerpElement {
    serp_item: Option<RankedSerpItem>,
}

#[derive(Debug, Deserialize)]
struct RankedSerpItem {
    rank_absolute: Option<u32>,
}

pub struct DataForSeoClient {
    client: Client,
    auth_header: String,
}

impl DataForSeoClient {
    pub fn new(login: &str, password: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let credentials = STANDARD.encode(format!("{login}:{password}"));

        Ok(Self {
            client,
            auth_header: format!("Basic {credentials}"),
        })
    }

    async fn call<R: DeserializeOwned>(&self, endpoint: &str, payload: Value) -> Result<Vec<R>> {
        let url = format!("{BASE_URL}{endpoint}");

        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.auth_header)
            .json(&payload)
            .send()
            .await
            .context("Failed to send request to DataForSEO")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("DataForSEO API returned error: {} - {}", status, error_text);
        }

        let envelope = response
            .json::<Envelope<R>>()
            .await
            .context("Failed to parse DataForSEO response")?;

        if envelope.status_code != STATUS_OK {
            anyhow::bail!(
                "DataForSEO API error: {} - {}",
                envelope.status_code,
                envelope.status_message
            );
        }

        let task = envelope
            .tasks
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("DataForSEO returned no tasks"))?;

        if task.status_code != STATUS_OK {
            anyhow::bail!(
                "DataForSEO task error: {} - {}",
                task.status_code,
                task.status_message
            );
        }

        tokio::time::sleep(REQUEST_DELAY).await;

        Ok(task.result.unwrap_or_default())
    }

    /// Search-volume metrics for a batch of keywords.
    pub async fn search_volume(
        &self,
        keywords: &[String],
        seed: &str,
    ) -> Result<Vec<KeywordRecord>> {
        let payload = json!([{
            "keywords": keywords,
            "location_code": LOCATION_CODE_US,
            "language_code": LANGUAGE_CODE_EN,
            "search_partners": false,
            "include_adult_keywords": false,
        }]);

        let rows: Vec<VolumeRow> = self
            .call("/keywords_data/google_ads/search_volume/live", payload)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| volume_row_to_record(row, seed))
            .collect())
    }

    /// Keyword ideas related to a seed keyword.
    pub async fn related_keywords(&self, seed: &str) -> Result<Vec<KeywordRecord>> {
        let payload = json!([{
            "keywords": [seed],
            "location_code": LOCATION_CODE_US,
            "language_code": LANGUAGE_CODE_EN,
            "search_partners": false,
            "include_adult_keywords": false,
        }]);

        let pages: Vec<RelatedRow> = self
            .call(
                "/keywords_data/google_ads/keywords_for_keywords/live",
                payload,
            )
            .await?;

        Ok(pages
            .into_iter()
            .flat_map(|page| page.keywords)
            .filter_map(|row| volume_row_to_record(row, seed))
            .collect())
    }

    /// Top organic SERP listings for a keyword.
    pub async fn serp_listings(&self, keyword: &str, depth: u32) -> Result<Vec<SerpListing>> {
        let payload = json!([{
            "keyword": keyword,
            "location_code": LOCATION_CODE_US,
            "language_code": LANGUAGE_CODE_EN,
            "device": "desktop",
            "os": "windows",
            "depth": depth,
        }]);

        let pages: Vec<SerpPage> = self
            .call("/serp/google/organic/live/advanced", payload)
            .await?;

        Ok(pages
            .into_iter()
            .flat_map(|page| page.items)
            .filter_map(serp_item_to_listing)
            .collect())
    }

    /// Organic rank overview for one domain. Returns None when the
    /// provider has no data for the domain.
    pub async fn domain_rank(&self, domain: &str) -> Result<Option<DomainAuthority>> {
        let payload = json!([{
            "target": clean_domain(domain),
            "location_code": LOCATION_CODE_US,
            "language_code": LANGUAGE_CODE_EN,
        }]);

        let pages: Vec<RankOverviewPage> = self
            .call("/dataforseo_labs/google/domain_rank_overview/live", payload)
            .await?;

        Ok(pages
            .into_iter()
            .flat_map(|page| page.items)
            .filter_map(|item| item.metrics.and_then(|m| m.organic))
            .map(|organic| DomainAuthority {
                pos_1: organic.pos_1.unwrap_or(0),
                pos_2_3: organic.pos_2_3.unwrap_or(0),
                pos_4_10: organic.pos_4_10.unwrap_or(0),
                keywords: organic.count.unwrap_or(0),
                etv: organic.etv.unwrap_or(0.0),
                traffic_cost: organic.estimated_paid_traffic_cost.unwrap_or(0.0),
            })
            .next())
    }

    /// Keywords the domain currently ranks for.
    pub async fn ranked_keywords(&self, domain: &str, limit: u32) -> Result<Vec<RankedKeyword>> {
        let payload = json!([{
            "target": clean_domain(domain),
            "location_code": LOCATION_CODE_US,
            "language_code": LANGUAGE_CODE_EN,
            "limit": limit,
        }]);

        let pages: Vec<RankedPage> = self
            .call("/dataforseo_labs/google/ranked_keywords/live", payload)
            .await?;

        Ok(pages
            .into_iter()
            .flat_map(|page| page.items)
            .filter_map(|item| {
                let keyword = item.keyword_data.and_then(|d| d.keyword)?;
                let position = item
                    .ranked_serp_element
                    .and_then(|e| e.serp_item)
                    .and_then(|s| s.rank_absolute)?;
                Some(RankedKeyword { keyword, position })
            })
            .collect())
    }
}

fn volume_row_to_record(row: VolumeRow, seed: &str) -> Option<KeywordRecord> {
    let keyword = row.keyword?;
    Some(KeywordRecord {
        keyword,
        search_volume: row.search_volume.unwrap_or(0),
        competition: row.competition_index.unwrap_or(0).min(100),
        cpc: row.cpc,
        monthly_searches: row
            .monthly_searches
            .into_iter()
            .take(TREND_MONTHS)
            .map(|m| m.search_volume.unwrap_or(0))
            .collect(),
        seed_keyword: seed.to_string(),
    })
}

fn serp_item_to_listing(item: SerpItem) -> Option<SerpListing> {
    if item.item_type.as_deref() != Some("organic") {
        return None;
    }
    Some(SerpListing {
        position: item.rank_group?,
        title: item.title.unwrap_or_default(),
        url: item.url?,
        domain: item.domain?,
        description: item.description,
    })
}

/// Strip protocol, leading www. and any path so the Labs endpoints get a
/// bare hostname.
pub fn clean_domain(domain: &str) -> String {
    let stripped = domain
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");
    stripped
        .split('/')
        .next()
        .unwrap_or(stripped)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_domain() {
        assert_eq!(clean_domain("https://www.example.com/path/page"), "example.com");
        assert_eq!(clean_domain("http://example.com"), "example.com");
        assert_eq!(clean_domain("example.com"), "example.com");
        assert_eq!(clean_domain("  example.com/docs  "), "example.com");
    }

    #[test]
    fn test_volume_row_missing_metrics_parse_as_zero() {
        let row: VolumeRow =
            serde_json::from_str(r#"{"keyword": "gpu as a service"}"#).expect("valid row");

        let record = volume_row_to_record(row, "gpu as a service").expect("record");

        assert_eq!(record.keyword, "gpu as a service");
        assert_eq!(record.search_volume, 0);
        assert_eq!(record.competition, 0);
        assert_eq!(record.cpc, None);
        assert!(record.monthly_searches.is_empty());
    }

    #[test]
    fn test_volume_row_full_parse() {
        let row: VolumeRow = serde_json::from_str(
            r#"{
                "keyword": "cloud gpu",
                "search_volume": 2400,
                "competition": "HIGH",
                "competition_index": 87,
                "cpc": 6.12,
                "monthly_searches": [
                    {"year": 2026, "month": 7, "search_volume": 2900},
                    {"year": 2026, "month": 6, "search_volume": 2400}
                ]
            }"#,
        )
        .expect("valid row");

        let record = volume_row_to_record(row, "cloud gpu").expect("record");
        assert_eq!(record.search_volume, 2400);
        assert_eq!(record.competition, 87);
        assert_eq!(record.cpc, Some(6.12));
        assert_eq!(record.monthly_searches, vec![2900, 2400]);
    }

    #[test]
    fn test_serp_items_filter_non_organic() {
        let page: SerpPage = serde_json::from_str(
            r#"{
                "items": [
                    {"type": "paid", "rank_group": 1, "url": "https://ad.example", "domain": "ad.example"},
                    {"type": "organic", "rank_group": 1, "title": "Top", "url": "https://a.example/x", "domain": "a.example", "description": "d"},
                    {"type": "people_also_ask"}
                ]
            }"#,
        )
        .expect("valid page");

        let listings: Vec<SerpListing> =
            page.items.into_iter().filter_map(serp_item_to_listing).collect();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].domain, "a.example");
        assert_eq!(listings[0].position, 1);
    }

    #[test]
    fn test_ranked_keywords_nested_parse() {
        let page: RankedPage = serde_json::from_str(
            r#"{
                "items": [{
                    "keyword_data": {"keyword": "gpu cluster", "keyword_info": {"search_volume": 880}},
                    "ranked_serp_element": {"serp_item": {"rank_absolute": 7}}
                }]
            }"#,
        )
        .expect("valid page");

        let item = page.items.into_iter().next().unwrap();
        assert_eq!(
            item.keyword_data.as_ref().and_then(|d| d.keyword.as_deref()),
            Some("gpu cluster")
        );
        assert_eq!(
            item.ranked_serp_element
                .and_then(|e| e.serp_item)
                .and_then(|s| s.rank_absolute),
            Some(7)
        );
    }

    #[test]
    fn test_task_error_surface() {
        let envelope: Envelope<VolumeRow> = serde_json::from_str(
            r#"{
                "status_code": 20000,
                "tasks": [{"status_code": 40501, "status_message": "Invalid Field"}]
            }"#,
        )
        .expect("valid envelope");
        assert_eq!(envelope.tasks[0].status_code, 40501);
        assert!(envelope.tasks[0].result.is_none());
    }
}
