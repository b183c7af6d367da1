use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::TargetLength;
use crate::models::{AnalysisStats, KeywordRecord, SerpListing};
use crate::scoring::CompetitionAssessment;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

const MODEL: &str = "claude-sonnet-4-20250514";

const MAX_ATTEMPTS: u32 = 5;

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<Content>,
}

#[derive(Deserialize)]
struct Content {
    text: String,
}

/// Target audience and content goal recommended from competitor analysis.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudienceRecommendation {
    pub target_audience: String,
    pub content_goal: String,
    #[serde(default)]
    pub rationale: String,
}

impl Default for AudienceRecommendation {
    fn default() -> Self {
        Self {
            target_audience: "Technical Decision Makers".to_string(),
            content_goal: "Educational".to_string(),
            rationale: "Default values - no competitor data available".to_string(),
        }
    }
}

/// Everything a section prompt needs about the brief being written.
pub struct BriefContext<'a> {
    pub keyword: &'a KeywordRecord,
    pub audience: &'a str,
    pub goal: &'a str,
    pub listings: &'a [SerpListing],
    pub competition: Option<&'a CompetitionAssessment>,
    pub target_length: TargetLength,
}

/// Client for the Anthropic Messages API. Strictly string in, string
/// out: responses are trimmed and empty completions are an error.
pub struct ClaudeWriter {
    client: Client,
    api_key: String,
}

impl ClaudeWriter {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, api_key })
    }

    /// Run one completion with retries. Rate limits get a long flat
    /// backoff, everything else an exponential one.
    pub async fn complete(&self, prompt: &str, model: &str, max_tokens: u32) -> Result<String> {
        let mut last_error = anyhow::anyhow!("no attempts made");

        for attempt in 0..MAX_ATTEMPTS {
            match self.try_complete(prompt, model, max_tokens).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    let is_rate_limit = e.to_string().contains("rate_limit");

                    if attempt == MAX_ATTEMPTS - 1 {
                        last_error = e;
                        break;
                    }

                    let backoff = if is_rate_limit {
                        std::time::Duration::from_secs(15 * (attempt + 1) as u64)
                    } else {
                        std::time::Duration::from_millis(1000 * 2_u64.pow(attempt))
                    };

                    if is_rate_limit {
                        log::warn!("Rate limit hit, waiting {backoff:?} before retry");
                    }

                    last_error = e;
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        Err(last_error)
    }

    async fn try_complete(&self, prompt: &str, model: &str, max_tokens: u32) -> Result<String> {
        let request = ClaudeRequest {
            model: model.to_string(),
            max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Claude API")?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("Claude API error: {}", error_text);
        }

        let claude_response = response
            .json::<ClaudeResponse>()
            .await
            .context("Failed to parse Claude API response")?;

        let text = claude_response
            .content
            .first()
            .map(|c| c.text.trim())
            .unwrap_or("");

        if text.is_empty() {
            anyhow::bail!("Claude returned an empty completion");
        }

        Ok(text.to_string())
    }

    /// Write the narrative for one brief section.
    pub async fn section_narrative(&self, ctx: &BriefContext<'_>, heading: &str) -> Result<String> {
        let prompt = section_prompt(ctx, heading);
        self.complete(&prompt, MODEL, 1500).await
    }

    /// Recommend a target audience and content goal from the top SERP
    /// competitors. Never fails: any error degrades to the defaults.
    pub async fn recommend_audience(
        &self,
        keyword: &str,
        listings: &[SerpListing],
    ) -> AudienceRecommendation {
        if listings.is_empty() {
            return AudienceRecommendation::default();
        }

        let prompt = audience_prompt(keyword, listings);

        match self.complete(&prompt, MODEL, 2000).await {
            Ok(text) => match serde_json::from_str(extract_json(&text)) {
                Ok(recommendation) => recommendation,
                Err(e) => {
                    log::warn!("Could not parse audience recommendation: {e}");
                    AudienceRecommendation::default()
                }
            },
            Err(e) => {
                log::warn!("Audience recommendation failed: {e}");
                AudienceRecommendation::default()
            }
        }
    }

    /// Executive summary for a full analysis run.
    pub async fn executive_summary(
        &self,
        domain: &str,
        stats: &AnalysisStats,
        hub_lines: &[String],
        top_opportunities: &[String],
    ) -> Result<String> {
        let stats_json =
            serde_json::to_string_pretty(stats).context("Failed to serialize analysis stats")?;

        let prompt = format!(
            r#"Create an executive summary for {domain}'s content strategy and topical authority analysis.

Key Statistics:
{stats_json}

Content Hubs:
{}

Top Opportunities:
{}

Create a concise executive summary covering:
1. Current State Assessment (authority position, strengths, weaknesses)
2. Key Opportunities (biggest content gaps and why they matter)
3. Strategic Recommendations (what to prioritize and why)
4. Expected Impact (what success looks like in 90 days)

Format as markdown with clear sections and bullet points."#,
            hub_lines.join("\n"),
            top_opportunities.join("\n"),
        );

        self.complete(&prompt, MODEL, 3000).await
    }

}

fn metrics_block(keyword: &KeywordRecord) -> String {
    let cpc = keyword
        .cpc
        .map(|c| format!("${c:.2}"))
        .unwrap_or_else(|| "n/a".to_string());
    let trend = if keyword.monthly_searches.is_empty() {
        "n/a".to_string()
    } else {
        keyword
            .monthly_searches
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "Keyword: {}\nSearch volume: {}/mo\nCompetition index: {}/100\nCPC: {cpc}\nMonthly trend (recent first): {trend}",
        keyword.keyword, keyword.search_volume, keyword.competition
    )
}

fn listings_block(listings: &[SerpListing]) -> String {
    if listings.is_empty() {
        return "No SERP data available.".to_string();
    }
    listings
        .iter()
        .map(|l| {
            format!(
                "{}. \"{}\" ({}) - {}{}",
                l.position,
                l.title,
                l.domain,
                l.url,
                l.description
                    .as_deref()
                    .map(|d| format!(" - {d}"))
                    .unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn section_prompt(ctx: &BriefContext<'_>, heading: &str) -> String {
    let competition_block = match ctx.competition {
        Some(assessment) => format!(
            "Overall competition score: {}/100\nVerdict: {}\nRealistic target position: {}\nRecommendations:\n{}",
            assessment.overall_score,
            assessment.verdict,
            assessment.target_position,
            assessment
                .recommendations
                .iter()
                .map(|r| format!("- {r}"))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        None => "No competition assessment available.".to_string(),
    };

    format!(
        r#"You are an expert SEO content strategist writing one section of a content brief.

PRIMARY KEYWORD: {keyword}
TARGET AUDIENCE: {audience}
CONTENT GOAL: {goal}
TARGET LENGTH: {min}-{max} words

KEYWORD METRICS:
{metrics}

TOP RANKING RESULTS:
{listings}

COMPETITION ASSESSMENT:
{competition}

Write the "{heading}" section of the brief in markdown. Use the actual
data above, be specific rather than generic, and keep it under 400 words.
Do not repeat the section heading and do not add any preamble."#,
        keyword = ctx.keyword.keyword,
        audience = ctx.audience,
        goal = ctx.goal,
        min = ctx.target_length.min,
        max = ctx.target_length.max,
        metrics = metrics_block(ctx.keyword),
        listings = listings_block(ctx.listings),
        competition = competition_block,
    )
}

fn audience_prompt(keyword: &str, listings: &[SerpListing]) -> String {
    let top: Vec<&SerpListing> = listings.iter().take(4).collect();
    let competitor_block = top
        .iter()
        .map(|l| {
            format!(
                "Position {}: \"{}\" ({}) - {}",
                l.position,
                l.title,
                l.domain,
                l.description.as_deref().unwrap_or("no description")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an expert SEO strategist analyzing competitor content to recommend a target audience and content goal.

PRIMARY KEYWORD: {keyword}

TOP RANKING COMPETITORS:
{competitor_block}

Identify which audiences the current top results serve, which are underserved, and recommend a specific, differentiated target audience with buying power plus a content goal that fills a gap in the current results.

Respond with JSON only, in this exact format:
{{
  "target_audience": "...",
  "content_goal": "...",
  "rationale": "2-3 sentences explaining why this combination will be effective"
}}"#
    )
}

/// Slice out the JSON object from a response that may wrap it in prose
/// or a markdown code fence.
fn extract_json(text: &str) -> &str {
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start <= end {
            return &text[start..=end];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_code_fence() {
        let text = "Here you go:\n```json\n{\"target_audience\": \"ML leads\", \"content_goal\": \"Comparison\"}\n```";
        let parsed: AudienceRecommendation =
            serde_json::from_str(extract_json(text)).expect("parses");
        assert_eq!(parsed.target_audience, "ML leads");
        assert_eq!(parsed.content_goal, "Comparison");
        assert_eq!(parsed.rationale, "");
    }

    #[test]
    fn test_extract_json_plain_object() {
        let text = r#"{"target_audience": "a", "content_goal": "b", "rationale": "c"}"#;
        assert_eq!(extract_json(text), text);
    }

    #[test]
    fn test_extract_json_without_braces_returns_input() {
        assert_eq!(extract_json("no json here"), "no json here");
    }

    #[test]
    fn test_section_prompt_carries_data() {
        let keyword = KeywordRecord {
            keyword: "gpu as a service".to_string(),
            search_volume: 390,
            competition: 51,
            cpc: Some(4.2),
            monthly_searches: vec![480, 390],
            seed_keyword: "gpu as a service".to_string(),
        };
        let listings = vec![SerpListing {
            position: 1,
            title: "What is GPUaaS?".to_string(),
            url: "https://a.example/gpuaas".to_string(),
            domain: "a.example".to_string(),
            description: Some("Intro guide".to_string()),
        }];
        let ctx = BriefContext {
            keyword: &keyword,
            audience: "Platform engineers",
            goal: "Comparison",
            listings: &listings,
            competition: None,
            target_length: TargetLength { min: 2200, max: 2400 },
        };

        let prompt = section_prompt(&ctx, "Competitive Landscape");

        assert!(prompt.contains("gpu as a service"));
        assert!(prompt.contains("390/mo"));
        assert!(prompt.contains("$4.20"));
        assert!(prompt.contains("480, 390"));
        assert!(prompt.contains("a.example"));
        assert!(prompt.contains("2200-2400 words"));
        assert!(prompt.contains("\"Competitive Landscape\""));
    }
}
