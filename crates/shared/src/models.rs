use serde::{Deserialize, Serialize};

use crate::clustering::{Cluster, ContentHub};
use crate::composer::CalendarEntry;
use crate::scoring::ScoredKeyword;

/// A single fetched keyword with its metrics. Immutable once built;
/// missing volume/competition fields are normalized to zero at parse time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordRecord {
    pub keyword: String,
    pub search_volume: u64,
    /// Competition index on a 0-100 scale.
    pub competition: u32,
    pub cpc: Option<f64>,
    /// Monthly search volumes, most recent first, at most twelve entries.
    pub monthly_searches: Vec<u64>,
    pub seed_keyword: String,
}

impl KeywordRecord {
    /// A record with zeroed metrics, used when the keyword-data provider
    /// fails and the run degrades rather than aborts.
    pub fn zeroed(keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        Self {
            seed_keyword: keyword.clone(),
            keyword,
            search_volume: 0,
            competition: 0,
            cpc: None,
            monthly_searches: Vec::new(),
        }
    }
}

/// One organic SERP result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerpListing {
    pub position: u32,
    pub title: String,
    pub url: String,
    pub domain: String,
    pub description: Option<String>,
}

/// Organic rank-overview metrics for a domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainAuthority {
    pub pos_1: u64,
    pub pos_2_3: u64,
    pub pos_4_10: u64,
    pub keywords: u64,
    pub etv: f64,
    pub traffic_cost: f64,
}

/// A keyword the target domain already ranks for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedKeyword {
    pub keyword: String,
    pub position: u32,
}

/// Complete analysis data set for serialization.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisData {
    pub version: String,
    pub created_at: String,
    pub domain: String,
    pub keywords: Vec<ScoredKeyword>,
    pub clusters: Vec<Cluster>,
    pub hubs: Vec<ContentHub>,
    pub calendar: Vec<CalendarEntry>,
}

impl AnalysisData {
    pub fn new(
        domain: impl Into<String>,
        keywords: Vec<ScoredKeyword>,
        clusters: Vec<Cluster>,
        hubs: Vec<ContentHub>,
        calendar: Vec<CalendarEntry>,
    ) -> Self {
        Self {
            version: "1.0".to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            domain: domain.into(),
            keywords,
            clusters,
            hubs,
            calendar,
        }
    }
}

/// Headline numbers summarizing a full analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisStats {
    pub total_keywords: usize,
    pub total_search_volume: u64,
    pub avg_authority: f64,
    pub high_priority_gaps: usize,
    pub keywords_ranking: usize,
    pub top_3_rankings: usize,
    pub content_hubs: usize,
    pub calendar_items: usize,
}

impl AnalysisStats {
    pub fn collect(
        keywords: &[ScoredKeyword],
        hubs: &[ContentHub],
        calendar: &[CalendarEntry],
    ) -> Self {
        let avg_authority = if keywords.is_empty() {
            0.0
        } else {
            keywords.iter().map(|k| k.authority_score as f64).sum::<f64>() / keywords.len() as f64
        };

        Self {
            total_keywords: keywords.len(),
            total_search_volume: keywords.iter().map(|k| k.record.search_volume).sum(),
            avg_authority,
            high_priority_gaps: keywords
                .iter()
                .filter(|k| k.content_strategy == crate::scoring::ContentStrategy::HighPriorityGap)
                .count(),
            keywords_ranking: keywords.iter().filter(|k| k.authority_score > 0).count(),
            top_3_rankings: keywords
                .iter()
                .filter(|k| k.ranking_position.is_some_and(|p| p <= 3))
                .count(),
            content_hubs: hubs.len(),
            calendar_items: calendar.len(),
        }
    }
}
