use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::scoring::ScoredKeyword;

/// Minimum overlap between a keyword's tokens and a cluster's token set
/// before the keyword joins that cluster.
const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.25;

const MIN_TOKEN_LEN: usize = 2;

/// Words that carry no topical signal in keyword text.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "best", "by", "can", "do", "for", "from", "how",
    "in", "is", "it", "my", "near", "of", "on", "or", "the", "to", "top", "vs", "what", "when",
    "where", "which", "why", "with", "you", "your",
];

/// A named group of related keywords treated as one content theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub keywords: Vec<ScoredKeyword>,
    /// Mean opportunity score of the members.
    pub priority: f64,
}

/// A content hub built on top of one cluster: the pillar keyword plus
/// the supporting pieces that would link to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentHub {
    pub name: String,
    pub pillar_keyword: String,
    pub pillar_volume: u64,
    pub supporting_keywords: Vec<String>,
    pub total_volume: u64,
    pub avg_authority: f64,
    pub content_gaps: usize,
    pub priority_score: f64,
}

/// Greedy lexical clusterer. Grouping depends only on the input order
/// and the threshold, so the same input always yields the same clusters.
pub struct TopicalClusterer {
    threshold: f64,
}

impl Default for TopicalClusterer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

struct Draft {
    tokens: HashSet<String>,
    token_order: Vec<String>,
    members: Vec<ScoredKeyword>,
}

impl TopicalClusterer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Partition the keyword set into named clusters. Every input keyword
    /// lands in exactly one cluster; an empty input yields no clusters.
    pub fn cluster(&self, keywords: Vec<ScoredKeyword>) -> Vec<Cluster> {
        let mut drafts: Vec<Draft> = Vec::new();

        for keyword in keywords {
            let tokens = significant_tokens(&keyword.record.keyword);
            let token_set: HashSet<String> = tokens.iter().cloned().collect();

            // First cluster at or above the threshold wins ties, so the
            // outcome never depends on map iteration order.
            let mut best: Option<(usize, f64)> = None;
            for (idx, draft) in drafts.iter().enumerate() {
                let score = jaccard(&token_set, &draft.tokens);
                if score >= self.threshold && best.is_none_or(|(_, s)| score > s) {
                    best = Some((idx, score));
                }
            }

            match best {
                Some((idx, _)) => {
                    let draft = &mut drafts[idx];
                    for token in tokens {
                        if draft.tokens.insert(token.clone()) {
                            draft.token_order.push(token);
                        }
                    }
                    draft.members.push(keyword);
                }
                None => drafts.push(Draft {
                    tokens: token_set,
                    token_order: tokens,
                    members: vec![keyword],
                }),
            }
        }

        let mut used_names: HashSet<String> = HashSet::new();
        drafts
            .into_iter()
            .map(|draft| {
                let name = unique_name(name_cluster(&draft), &mut used_names);
                let priority = if draft.members.is_empty() {
                    0.0
                } else {
                    draft.members.iter().map(|k| k.opportunity_score).sum::<f64>()
                        / draft.members.len() as f64
                };
                Cluster {
                    name,
                    keywords: draft.members,
                    priority: (priority * 10.0).round() / 10.0,
                }
            })
            .collect()
    }
}

fn significant_tokens(keyword: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    keyword
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= MIN_TOKEN_LEN && !STOP_WORDS.contains(t))
        .filter(|t| seen.insert(t.to_string()))
        .map(String::from)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Name a cluster after its most frequent significant tokens; ties break
/// by first appearance so naming is reproducible.
fn name_cluster(draft: &Draft) -> String {
    let mut counts: Vec<(usize, &str)> = draft
        .token_order
        .iter()
        .map(|token| {
            let count = draft
                .members
                .iter()
                .filter(|k| significant_tokens(&k.record.keyword).iter().any(|t| t == token))
                .count();
            (count, token.as_str())
        })
        .collect();
    counts.sort_by(|a, b| b.0.cmp(&a.0));

    let name: Vec<String> = counts.iter().take(2).map(|(_, t)| capitalize(t)).collect();
    if name.is_empty() {
        draft
            .members
            .first()
            .map(|k| capitalize(&k.record.keyword))
            .unwrap_or_else(|| "Misc".to_string())
    } else {
        name.join(" ")
    }
}

fn unique_name(base: String, used: &mut HashSet<String>) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base} {n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

const SUPPORTING_KEYWORDS_PER_HUB: usize = 10;

/// Build content hubs from clusters, ordered by priority. The pillar is
/// the highest-volume member; supporting pieces are the best remaining
/// opportunities.
pub fn build_hubs(clusters: &[Cluster]) -> Vec<ContentHub> {
    let mut hubs: Vec<ContentHub> = clusters
        .iter()
        .filter(|cluster| !cluster.keywords.is_empty())
        .map(|cluster| {
            let mut pillar = &cluster.keywords[0];
            for candidate in &cluster.keywords[1..] {
                if candidate.record.search_volume > pillar.record.search_volume
                    || (candidate.record.search_volume == pillar.record.search_volume
                        && candidate.opportunity_score > pillar.opportunity_score)
                {
                    pillar = candidate;
                }
            }

            let mut supporting: Vec<&ScoredKeyword> = cluster
                .keywords
                .iter()
                .filter(|k| k.record.keyword != pillar.record.keyword)
                .collect();
            supporting.sort_by(|a, b| {
                b.opportunity_score
                    .total_cmp(&a.opportunity_score)
                    .then(a.record.keyword.cmp(&b.record.keyword))
            });

            let total_volume: u64 = cluster.keywords.iter().map(|k| k.record.search_volume).sum();
            let avg_authority = cluster
                .keywords
                .iter()
                .map(|k| k.authority_score as f64)
                .sum::<f64>()
                / cluster.keywords.len() as f64;
            let content_gaps = cluster
                .keywords
                .iter()
                .filter(|k| k.authority_score < 40)
                .count();

            ContentHub {
                name: cluster.name.clone(),
                pillar_keyword: pillar.record.keyword.clone(),
                pillar_volume: pillar.record.search_volume,
                supporting_keywords: supporting
                    .into_iter()
                    .take(SUPPORTING_KEYWORDS_PER_HUB)
                    .map(|k| k.record.keyword.clone())
                    .collect(),
                total_volume,
                avg_authority: (avg_authority * 100.0).round() / 100.0,
                content_gaps,
                priority_score: total_volume as f64 * (100.0 - avg_authority) / 100.0,
            }
        })
        .collect();

    hubs.sort_by(|a, b| {
        b.priority_score
            .total_cmp(&a.priority_score)
            .then(a.name.cmp(&b.name))
    });
    hubs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KeywordRecord;
    use crate::scoring::score_keywords;

    fn scored(keyword: &str, volume: u64, competition: u32) -> ScoredKeyword {
        let record = KeywordRecord {
            keyword: keyword.to_string(),
            search_volume: volume,
            competition,
            cpc: None,
            monthly_searches: Vec::new(),
            seed_keyword: keyword.to_string(),
        };
        score_keywords(vec![record], &[]).remove(0)
    }

    fn sample() -> Vec<ScoredKeyword> {
        vec![
            scored("cloud gpu", 2400, 40),
            scored("gpu cloud computing", 880, 35),
            scored("best cloud gpu", 320, 50),
            scored("machine learning compute", 720, 30),
            scored("machine learning infrastructure", 590, 45),
        ]
    }

    #[test]
    fn test_empty_input_yields_no_clusters() {
        let clusters = TopicalClusterer::default().cluster(Vec::new());
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_single_keyword_forms_one_cluster() {
        let clusters = TopicalClusterer::default().cluster(vec![scored("gpu rental", 100, 10)]);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].keywords.len(), 1);
        assert_eq!(clusters[0].keywords[0].record.keyword, "gpu rental");
    }

    #[test]
    fn test_related_keywords_share_a_cluster() {
        let clusters = TopicalClusterer::default().cluster(sample());

        assert_eq!(clusters.len(), 2);
        let gpu_cluster = &clusters[0];
        assert_eq!(gpu_cluster.keywords.len(), 3);
        assert!(gpu_cluster
            .keywords
            .iter()
            .all(|k| k.record.keyword.contains("gpu")));

        let ml_cluster = &clusters[1];
        assert_eq!(ml_cluster.keywords.len(), 2);
        assert!(ml_cluster
            .keywords
            .iter()
            .all(|k| k.record.keyword.starts_with("machine learning")));
    }

    #[test]
    fn test_clustering_is_a_partition() {
        let input = sample();
        let input_keywords: Vec<String> =
            input.iter().map(|k| k.record.keyword.clone()).collect();

        let clusters = TopicalClusterer::default().cluster(input);

        let mut clustered: Vec<String> = clusters
            .iter()
            .flat_map(|c| c.keywords.iter().map(|k| k.record.keyword.clone()))
            .collect();
        let mut expected = input_keywords;
        clustered.sort();
        expected.sort();
        assert_eq!(clustered, expected);
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let clusterer = TopicalClusterer::default();
        let first = clusterer.cluster(sample());
        let second = clusterer.cluster(sample());

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.name, b.name);
            let members_a: Vec<&str> =
                a.keywords.iter().map(|k| k.record.keyword.as_str()).collect();
            let members_b: Vec<&str> =
                b.keywords.iter().map(|k| k.record.keyword.as_str()).collect();
            assert_eq!(members_a, members_b);
        }
    }

    #[test]
    fn test_stopword_only_keyword_gets_its_own_cluster() {
        let clusters =
            TopicalClusterer::default().cluster(vec![scored("what is the best", 10, 0)]);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].keywords.len(), 1);
        assert!(!clusters[0].name.is_empty());
    }

    #[test]
    fn test_cluster_names_are_unique() {
        let clusters = TopicalClusterer::new(0.99).cluster(vec![
            scored("gpu hosting pricing", 100, 10),
            scored("gpu hosting comparison", 100, 10),
        ]);
        assert_eq!(clusters.len(), 2);
        assert_ne!(clusters[0].name, clusters[1].name);
    }

    #[test]
    fn test_hub_pillar_is_highest_volume_member() {
        let clusters = TopicalClusterer::default().cluster(sample());
        let hubs = build_hubs(&clusters);

        assert_eq!(hubs.len(), 2);
        let gpu_hub = hubs
            .iter()
            .find(|h| h.pillar_keyword == "cloud gpu")
            .expect("gpu hub present");
        assert_eq!(gpu_hub.pillar_volume, 2400);
        assert!(!gpu_hub.supporting_keywords.contains(&"cloud gpu".to_string()));
        assert_eq!(gpu_hub.total_volume, 2400 + 880 + 320);
        // Nothing ranks, so every member is a gap.
        assert_eq!(gpu_hub.content_gaps, 3);
    }

    #[test]
    fn test_hubs_sorted_by_priority() {
        let clusters = TopicalClusterer::default().cluster(sample());
        let hubs = build_hubs(&clusters);
        assert!(hubs[0].priority_score >= hubs[1].priority_score);
    }
}
