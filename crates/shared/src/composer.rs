use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::clustering::ContentHub;
use crate::config::TargetLength;
use crate::models::KeywordRecord;
use crate::narrative::AudienceRecommendation;
use crate::scoring::CompetitionAssessment;

/// Substituted wherever the narrative collaborator returned nothing.
/// Section keys are never dropped from a composed brief.
pub const PLACEHOLDER_NARRATIVE: &str = "Narrative not available";

/// The fixed section set of every brief, in document order.
pub const BRIEF_SECTIONS: [&str; 4] = [
    "Executive Summary",
    "Keyword & Audience Intelligence",
    "Competitive Landscape",
    "Content Strategy & Differentiation",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BriefSection {
    pub heading: String,
    pub narrative: String,
}

/// A composed content brief. Built once per run and then only read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brief {
    pub primary_keyword: String,
    pub audience: String,
    pub goal: String,
    pub rationale: String,
    pub target_length: TargetLength,
    pub created_at: String,
    pub metrics: KeywordRecord,
    pub competition: Option<CompetitionAssessment>,
    pub sections: Vec<BriefSection>,
}

/// Assemble a brief from scored data and the narrative texts fetched for
/// each section. Every heading in [`BRIEF_SECTIONS`] appears exactly
/// once; a missing or blank narrative becomes the placeholder.
pub fn compose_brief(
    metrics: KeywordRecord,
    audience: &AudienceRecommendation,
    target_length: TargetLength,
    competition: Option<CompetitionAssessment>,
    narratives: &HashMap<String, String>,
) -> Brief {
    let sections = BRIEF_SECTIONS
        .iter()
        .map(|&heading| {
            let narrative = narratives
                .get(heading)
                .map(|text| text.trim())
                .filter(|text| !text.is_empty())
                .unwrap_or(PLACEHOLDER_NARRATIVE);
            BriefSection {
                heading: heading.to_string(),
                narrative: narrative.to_string(),
            }
        })
        .collect();

    Brief {
        primary_keyword: metrics.keyword.clone(),
        audience: audience.target_audience.clone(),
        goal: audience.content_goal.clone(),
        rationale: audience.rationale.clone(),
        target_length,
        created_at: chrono::Utc::now().to_rfc3339(),
        metrics,
        competition,
        sections,
    }
}

/// Span of the content calendar.
pub const CALENDAR_DAYS: u32 = 90;

/// Planned pieces over that span, roughly 2-3 per week.
pub const CALENDAR_PIECES: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Guide,
    Tutorial,
    Blog,
    CaseStudy,
}

impl ContentType {
    pub fn label(&self) -> &'static str {
        match self {
            ContentType::Guide => "guide",
            ContentType::Tutorial => "tutorial",
            ContentType::Blog => "blog",
            ContentType::CaseStudy => "case_study",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// Calendar entries are planned only; there is no execution tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Planned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub publish_date: String,
    pub title: String,
    pub content_type: ContentType,
    pub hub: String,
    pub target_keyword: String,
    pub priority: Priority,
    pub status: Status,
}

/// Build the 90-day calendar from hubs ordered by priority. Scheduling
/// round-robins across hubs so no single theme monopolizes a month, and
/// everything about the result is a pure function of the input.
pub fn build_calendar(hubs: &[ContentHub], start: NaiveDate) -> Vec<CalendarEntry> {
    // Per-hub queues: the pillar piece first, then supporting keywords.
    let mut queues: Vec<(String, Vec<(String, ContentType)>)> = hubs
        .iter()
        .map(|hub| {
            let mut pieces = vec![(hub.pillar_keyword.clone(), ContentType::Guide)];
            for (idx, keyword) in hub.supporting_keywords.iter().enumerate() {
                let content_type = match idx % 3 {
                    0 => ContentType::Tutorial,
                    1 => ContentType::Blog,
                    _ => ContentType::CaseStudy,
                };
                pieces.push((keyword.clone(), content_type));
            }
            pieces.reverse(); // pop() takes from the front
            (hub.name.clone(), pieces)
        })
        .collect();

    let mut scheduled = Vec::new();
    let step_days = (CALENDAR_DAYS as usize / CALENDAR_PIECES) as i64;

    'outer: loop {
        let mut drained = true;
        for (hub_name, queue) in queues.iter_mut() {
            if scheduled.len() >= CALENDAR_PIECES {
                break 'outer;
            }
            let Some((keyword, content_type)) = queue.pop() else {
                continue;
            };
            drained = false;

            let index = scheduled.len();
            let date = start + chrono::Duration::days(index as i64 * step_days);
            let priority = if index < CALENDAR_PIECES / 3 {
                Priority::High
            } else if index < 2 * CALENDAR_PIECES / 3 {
                Priority::Medium
            } else {
                Priority::Low
            };

            scheduled.push(CalendarEntry {
                publish_date: date.format("%Y-%m-%d").to_string(),
                title: piece_title(&keyword, content_type),
                content_type,
                hub: hub_name.clone(),
                target_keyword: keyword,
                priority,
                status: Status::Planned,
            });
        }
        if drained {
            break;
        }
    }

    scheduled
}

fn piece_title(keyword: &str, content_type: ContentType) -> String {
    let topic = title_case(keyword);
    match content_type {
        ContentType::Guide => format!("The Complete Guide to {topic}"),
        ContentType::Tutorial => format!("Getting Started with {topic}"),
        ContentType::Blog => format!("{topic}: Key Trends and Use Cases"),
        ContentType::CaseStudy => format!("How Teams Put {topic} to Work"),
    }
}

/// Title-case a keyword, keeping short connective words lowercase.
pub fn title_case(keyword: &str) -> String {
    const SMALL_WORDS: &[&str] = &["a", "an", "and", "as", "for", "in", "of", "on", "or", "the", "to"];

    keyword
        .split_whitespace()
        .enumerate()
        .map(|(idx, word)| {
            if idx > 0 && SMALL_WORDS.contains(&word) {
                word.to_string()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
