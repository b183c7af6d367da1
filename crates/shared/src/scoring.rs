use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{DomainAuthority, KeywordRecord, RankedKeyword, SerpListing};

const VOLUME_WEIGHT: f64 = 50.0;
const COMPETITION_WEIGHT: f64 = 30.0;
const GAP_WEIGHT: f64 = 20.0;

/// Search volume at which the volume component saturates.
const VOLUME_CEILING: f64 = 1_000_000.0;

/// Derive a bounded 0-100 opportunity score for one keyword. Higher is
/// more attractive: high volume, low competition, and no existing
/// authority all push the score up. Missing metrics are zero in the
/// record, so they simply contribute nothing.
pub fn opportunity_score(record: &KeywordRecord, authority_score: u32) -> f64 {
    let volume_factor =
        ((record.search_volume as f64 + 1.0).ln() / (VOLUME_CEILING + 1.0).ln()).min(1.0);
    let competition_factor = f64::from(100 - record.competition.min(100)) / 100.0;
    let gap_factor = f64::from(100 - authority_score.min(100)) / 100.0;

    (VOLUME_WEIGHT * volume_factor
        + COMPETITION_WEIGHT * competition_factor
        + GAP_WEIGHT * gap_factor)
        .clamp(0.0, 100.0)
}

/// Authority from the domain's current ranking position for a keyword.
pub fn authority_score(ranking_position: Option<u32>) -> u32 {
    match ranking_position {
        None => 0,
        Some(p) if p <= 3 => 100,
        Some(p) if p <= 10 => 70,
        Some(p) if p <= 20 => 40,
        Some(_) => 20,
    }
}

/// What to do about a keyword, from its authority and opportunity profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentStrategy {
    DefendAndExpand,
    ImproveRanking,
    HighPriorityGap,
    MediumPriorityGap,
    LowPriority,
}

impl ContentStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            ContentStrategy::DefendAndExpand => "Defend & Expand",
            ContentStrategy::ImproveRanking => "Improve Ranking",
            ContentStrategy::HighPriorityGap => "High Priority Gap",
            ContentStrategy::MediumPriorityGap => "Medium Priority Gap",
            ContentStrategy::LowPriority => "Low Priority",
        }
    }
}

impl std::fmt::Display for ContentStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub fn categorize(record: &KeywordRecord, authority_score: u32) -> ContentStrategy {
    if authority_score >= 70 {
        ContentStrategy::DefendAndExpand
    } else if authority_score >= 40 {
        ContentStrategy::ImproveRanking
    } else if record.search_volume >= 1000 && record.competition < 70 {
        ContentStrategy::HighPriorityGap
    } else if record.search_volume >= 100 {
        ContentStrategy::MediumPriorityGap
    } else {
        ContentStrategy::LowPriority
    }
}

/// A keyword record with its derived scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredKeyword {
    #[serde(flatten)]
    pub record: KeywordRecord,
    pub ranking_position: Option<u32>,
    pub authority_score: u32,
    pub opportunity_score: f64,
    pub content_strategy: ContentStrategy,
}

/// Score a fetched keyword set against the domain's current rankings.
pub fn score_keywords(records: Vec<KeywordRecord>, rankings: &[RankedKeyword]) -> Vec<ScoredKeyword> {
    let positions: HashMap<String, u32> = rankings
        .iter()
        .map(|r| (r.keyword.to_lowercase(), r.position))
        .collect();

    records
        .into_iter()
        .map(|record| {
            let ranking_position = positions.get(&record.keyword.to_lowercase()).copied();
            let authority = authority_score(ranking_position);
            ScoredKeyword {
                opportunity_score: opportunity_score(&record, authority),
                content_strategy: categorize(&record, authority),
                ranking_position,
                authority_score: authority,
                record,
            }
        })
        .collect()
}

/// Sort by opportunity score descending; ties break by raw volume
/// descending, then keyword text, so ordering is fully deterministic.
pub fn sort_by_opportunity(keywords: &mut [ScoredKeyword]) {
    keywords.sort_by(|a, b| {
        b.opportunity_score
            .total_cmp(&a.opportunity_score)
            .then(b.record.search_volume.cmp(&a.record.search_volume))
            .then(a.record.keyword.cmp(&b.record.keyword))
    });
}

/// One SERP competitor with a 0-100 strength score relative to our domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorStrength {
    pub domain: String,
    pub position: u32,
    pub pos_1: u64,
    pub etv: f64,
    pub keywords: u64,
    pub strength_score: f64,
    pub difficulty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionAssessment {
    pub your_metrics: DomainAuthority,
    pub competitors: Vec<CompetitorStrength>,
    pub overall_score: f64,
    pub verdict: String,
    pub target_position: String,
    pub recommendations: Vec<String>,
}

fn difficulty_label(strength_score: f64) -> &'static str {
    if strength_score <= 30.0 {
        "WEAK - Easy to outrank"
    } else if strength_score <= 60.0 {
        "MEDIUM - Moderate effort needed"
    } else if strength_score <= 85.0 {
        "STRONG - Significant effort required"
    } else {
        "DOMINANT - Very difficult to outrank"
    }
}

fn strength_score(yours: &DomainAuthority, competitor: &DomainAuthority) -> f64 {
    // Ratios fall back to fixed denominators when our domain has no
    // rankings at all, so strong competitors still register as strong.
    let pos_1_ratio = if yours.pos_1 > 0 {
        competitor.pos_1 as f64 / yours.pos_1 as f64
    } else {
        competitor.pos_1 as f64 / 100.0
    };
    let etv_ratio = if yours.etv > 0.0 {
        competitor.etv / yours.etv
    } else {
        competitor.etv / 10_000.0
    };
    let keywords_ratio = if yours.keywords > 0 {
        competitor.keywords as f64 / yours.keywords as f64
    } else {
        competitor.keywords as f64 / 5_000.0
    };

    // pos_1 weighs heaviest: position-one rankings are the clearest
    // authority signal, then traffic value, then overall visibility.
    (pos_1_ratio * 50.0 + etv_ratio * 30.0 + keywords_ratio * 20.0).min(100.0)
}

/// Compare our domain against every SERP competitor we have metrics for
/// and produce an overall competitiveness verdict with recommendations.
pub fn assess_competition(
    yours: &DomainAuthority,
    listings: &[SerpListing],
    domain_metrics: &HashMap<String, DomainAuthority>,
) -> CompetitionAssessment {
    let mut competitors: Vec<CompetitorStrength> = listings
        .iter()
        .filter_map(|listing| {
            domain_metrics.get(&listing.domain).map(|metrics| {
                let score = strength_score(yours, metrics);
                CompetitorStrength {
                    domain: listing.domain.clone(),
                    position: listing.position,
                    pos_1: metrics.pos_1,
                    etv: metrics.etv,
                    keywords: metrics.keywords,
                    strength_score: (score * 10.0).round() / 10.0,
                    difficulty: difficulty_label(score).to_string(),
                }
            })
        })
        .collect();

    competitors.sort_by(|a, b| {
        a.strength_score
            .total_cmp(&b.strength_score)
            .then(a.domain.cmp(&b.domain))
    });

    let sample = &competitors[..competitors.len().min(5)];
    let overall_score = if sample.is_empty() {
        0.0
    } else {
        sample.iter().map(|c| c.strength_score).sum::<f64>() / sample.len() as f64
    };
    let overall_score = (overall_score * 10.0).round() / 10.0;

    let (verdict, target_position) = if overall_score <= 30.0 {
        ("LOW COMPETITION - Excellent opportunity", "1-3")
    } else if overall_score <= 60.0 {
        ("MEDIUM COMPETITION - Good opportunity with quality content", "3-5")
    } else if overall_score <= 85.0 {
        ("HIGH COMPETITION - Requires exceptional content and link building", "5-10")
    } else {
        ("VERY HIGH COMPETITION - Long-term strategy needed", "10-20 initially")
    };

    let mut recommendations: Vec<String> = if overall_score <= 30.0 {
        vec![
            "Focus on content quality - competitors are weak".to_string(),
            "Quick wins possible with on-page optimization".to_string(),
            "Build topical authority in this niche".to_string(),
        ]
    } else if overall_score <= 60.0 {
        vec![
            "Create significantly better content than current top 10".to_string(),
            "Build high-quality backlinks from relevant sites".to_string(),
            "Focus on user experience and engagement metrics".to_string(),
        ]
    } else if overall_score <= 85.0 {
        vec![
            "Develop comprehensive pillar content".to_string(),
            "Aggressive link building campaign required".to_string(),
            "Build brand authority and E-E-A-T signals".to_string(),
            "Consider targeting easier related keywords first".to_string(),
        ]
    } else {
        vec![
            "Long-term strategy needed (6-12+ months)".to_string(),
            "Build domain authority through easier wins first".to_string(),
            "Focus on long-tail variations initially".to_string(),
            "Invest heavily in content quality and backlinks".to_string(),
        ]
    };

    let easiest: Vec<&str> = competitors
        .iter()
        .filter(|c| c.strength_score <= 40.0)
        .take(3)
        .map(|c| c.domain.as_str())
        .collect();
    if !easiest.is_empty() {
        recommendations.push(format!("Target to outrank first: {}", easiest.join(", ")));
    }

    CompetitionAssessment {
        your_metrics: yours.clone(),
        competitors,
        overall_score,
        verdict: verdict.to_string(),
        target_position: target_position.to_string(),
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(keyword: &str, volume: u64, competition: u32) -> KeywordRecord {
        KeywordRecord {
            keyword: keyword.to_string(),
            search_volume: volume,
            competition,
            cpc: None,
            monthly_searches: Vec::new(),
            seed_keyword: keyword.to_string(),
        }
    }

    #[test]
    fn test_zero_competition_outscores_contested_at_equal_volume() {
        let easy = record("gpu cloud", 500, 0);
        let hard = record("gpu cloud", 500, 80);
        assert!(opportunity_score(&easy, 0) >= opportunity_score(&hard, 0));
    }

    #[test]
    fn test_strong_keyword_outscores_weak_keyword() {
        // "gpu as a service": 390 volume at competition 51 must beat a
        // near-dead keyword in a crowded niche.
        let strong = record("gpu as a service", 390, 51);
        let weak = record("gpu as a service", 10, 90);

        let strong_score = opportunity_score(&strong, 0);
        let weak_score = opportunity_score(&weak, 0);

        assert!(strong_score.is_finite());
        assert!(weak_score.is_finite());
        assert!(strong_score > weak_score);
    }

    #[test]
    fn test_score_is_bounded() {
        let extreme = record("everything", u64::MAX, 0);
        let score = opportunity_score(&extreme, 0);
        assert!((0.0..=100.0).contains(&score));

        let nothing = KeywordRecord::zeroed("nothing");
        let score = opportunity_score(&nothing, 100);
        assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn test_missing_metrics_score_as_zero_metrics() {
        let zeroed = KeywordRecord::zeroed("unknown keyword");
        // Zero volume and zero competition: only the competition and gap
        // components remain.
        let score = opportunity_score(&zeroed, 0);
        assert!(score > 0.0);
        assert!(score <= COMPETITION_WEIGHT + GAP_WEIGHT);
    }

    #[test]
    fn test_authority_score_bands() {
        assert_eq!(authority_score(None), 0);
        assert_eq!(authority_score(Some(1)), 100);
        assert_eq!(authority_score(Some(3)), 100);
        assert_eq!(authority_score(Some(4)), 70);
        assert_eq!(authority_score(Some(10)), 70);
        assert_eq!(authority_score(Some(11)), 40);
        assert_eq!(authority_score(Some(20)), 40);
        assert_eq!(authority_score(Some(21)), 20);
        assert_eq!(authority_score(Some(500)), 20);
    }

    #[test]
    fn test_categorize_bands() {
        assert_eq!(
            categorize(&record("a", 5000, 30), 100),
            ContentStrategy::DefendAndExpand
        );
        assert_eq!(
            categorize(&record("a", 5000, 30), 40),
            ContentStrategy::ImproveRanking
        );
        assert_eq!(
            categorize(&record("a", 5000, 30), 0),
            ContentStrategy::HighPriorityGap
        );
        assert_eq!(
            categorize(&record("a", 5000, 90), 0),
            ContentStrategy::MediumPriorityGap
        );
        assert_eq!(
            categorize(&record("a", 150, 30), 0),
            ContentStrategy::MediumPriorityGap
        );
        assert_eq!(
            categorize(&record("a", 50, 10), 0),
            ContentStrategy::LowPriority
        );
    }

    #[test]
    fn test_score_keywords_joins_rankings_case_insensitively() {
        let records = vec![record("GPU Cluster", 1000, 20), record("cloud gpu", 800, 10)];
        let rankings = vec![RankedKeyword {
            keyword: "gpu cluster".to_string(),
            position: 2,
        }];

        let scored = score_keywords(records, &rankings);

        assert_eq!(scored[0].ranking_position, Some(2));
        assert_eq!(scored[0].authority_score, 100);
        assert_eq!(scored[1].ranking_position, None);
        assert_eq!(scored[1].authority_score, 0);
    }

    #[test]
    fn test_sort_ties_break_by_raw_volume_descending() {
        // Same score by construction: identical records except keyword.
        let mut scored = score_keywords(
            vec![record("beta", 100, 50), record("alpha", 400, 50)],
            &[],
        );
        scored[0].opportunity_score = 42.0;
        scored[1].opportunity_score = 42.0;

        sort_by_opportunity(&mut scored);

        assert_eq!(scored[0].record.keyword, "alpha");
        assert_eq!(scored[1].record.keyword, "beta");
    }

    fn authority(pos_1: u64, etv: f64, keywords: u64) -> DomainAuthority {
        DomainAuthority {
            pos_1,
            pos_2_3: 0,
            pos_4_10: 0,
            keywords,
            etv,
            traffic_cost: 0.0,
        }
    }

    fn listing(position: u32, domain: &str) -> SerpListing {
        SerpListing {
            position,
            title: format!("{domain} result"),
            url: format!("https://{domain}/page"),
            domain: domain.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_strength_score_caps_at_one_hundred() {
        let yours = authority(1, 10.0, 10);
        let giant = authority(1_000_000, 1e9, 10_000_000);
        assert_eq!(strength_score(&yours, &giant), 100.0);
    }

    #[test]
    fn test_weak_competitor_scores_low() {
        let yours = authority(500, 100_000.0, 20_000);
        let weak = authority(5, 500.0, 200);
        let score = strength_score(&yours, &weak);
        assert!(score < 30.0, "expected weak score, got {score}");
    }

    #[test]
    fn test_assessment_verdict_and_targets() {
        let yours = authority(500, 100_000.0, 20_000);
        let mut metrics = HashMap::new();
        metrics.insert("weak.example".to_string(), authority(5, 500.0, 200));
        metrics.insert("tiny.example".to_string(), authority(1, 100.0, 50));

        let listings = vec![listing(1, "weak.example"), listing(2, "tiny.example")];
        let assessment = assess_competition(&yours, &listings, &metrics);

        assert_eq!(assessment.competitors.len(), 2);
        assert!(assessment.overall_score <= 30.0);
        assert!(assessment.verdict.starts_with("LOW COMPETITION"));
        assert_eq!(assessment.target_position, "1-3");
        // Weakest competitors are called out as first targets.
        assert!(assessment
            .recommendations
            .iter()
            .any(|r| r.starts_with("Target to outrank first:")));
    }

    #[test]
    fn test_assessment_with_no_metrics_is_empty_but_valid() {
        let assessment = assess_competition(
            &DomainAuthority::default(),
            &[listing(1, "unknown.example")],
            &HashMap::new(),
        );
        assert!(assessment.competitors.is_empty());
        assert_eq!(assessment.overall_score, 0.0);
        assert!(assessment.verdict.starts_with("LOW COMPETITION"));
    }
}
