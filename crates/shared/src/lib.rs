// Public modules
pub mod clustering;
pub mod composer;
pub mod config;
pub mod dataforseo;
pub mod extractor;
pub mod models;
pub mod narrative;
pub mod report;
pub mod scoring;

// Re-export commonly used types
pub use clustering::{build_hubs, Cluster, ContentHub, TopicalClusterer};
pub use composer::{build_calendar, compose_brief, Brief, CalendarEntry, BRIEF_SECTIONS};
pub use config::{default_seed_keywords, BriefSettings, Config, TargetLength, DEFAULT_DOMAIN};
pub use dataforseo::DataForSeoClient;
pub use extractor::{ContentExtractor, ContentLengthAnalysis};
pub use models::{
    AnalysisData, AnalysisStats, DomainAuthority, KeywordRecord, RankedKeyword, SerpListing,
};
pub use narrative::{AudienceRecommendation, BriefContext, ClaudeWriter};
pub use report::{slugify, ReportWriter};
pub use scoring::{
    assess_competition, score_keywords, sort_by_opportunity, CompetitionAssessment, ScoredKeyword,
};
