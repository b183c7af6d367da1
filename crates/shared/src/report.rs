use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::clustering::{Cluster, ContentHub};
use crate::composer::{Brief, CalendarEntry};
use crate::models::AnalysisData;
use crate::scoring::ScoredKeyword;

/// Writes report artifacts into one output directory. Every artifact is
/// written whole-or-not-at-all: content is rendered fully in memory,
/// written to a temp file, and renamed over any previous version.
pub struct ReportWriter {
    out_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
        Ok(Self { out_dir })
    }

    fn write_artifact(
        &self,
        filename: &str,
        render: impl FnOnce() -> Result<String>,
    ) -> Result<PathBuf> {
        let content = render()?;

        let final_path = self.out_dir.join(filename);
        let tmp_path = self.out_dir.join(format!("{filename}.tmp"));

        if let Err(e) = fs::write(&tmp_path, content) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e).with_context(|| format!("Failed to write {}", tmp_path.display()));
        }

        if let Err(e) = fs::rename(&tmp_path, &final_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e).with_context(|| format!("Failed to move {}", final_path.display()));
        }

        Ok(final_path)
    }

    pub fn write_brief(&self, brief: &Brief) -> Result<PathBuf> {
        let filename = format!("{}-brief.md", slugify(&brief.primary_keyword));
        self.write_artifact(&filename, || Ok(render_brief_markdown(brief)))
    }

    pub fn write_brief_json(&self, brief: &Brief) -> Result<PathBuf> {
        let filename = format!("{}-brief.json", slugify(&brief.primary_keyword));
        self.write_artifact(&filename, || {
            serde_json::to_string_pretty(brief).context("Failed to serialize brief")
        })
    }

    pub fn write_analysis_json(&self, data: &AnalysisData, stem: &str) -> Result<PathBuf> {
        let filename = format!("{stem}-data.json");
        self.write_artifact(&filename, || {
            serde_json::to_string_pretty(data).context("Failed to serialize analysis data")
        })
    }

    /// The tabular report: one CSV per named sheet.
    pub fn write_sheets(
        &self,
        stem: &str,
        clusters: &[Cluster],
        calendar: &[CalendarEntry],
        hubs: &[ContentHub],
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        written.push(
            self.write_artifact(&format!("{stem}-keywords.csv"), || {
                Ok(render_keywords_csv(clusters))
            })?,
        );
        written.push(
            self.write_artifact(&format!("{stem}-clusters.csv"), || {
                Ok(render_clusters_csv(clusters))
            })?,
        );
        written.push(
            self.write_artifact(&format!("{stem}-calendar.csv"), || {
                Ok(render_calendar_csv(calendar))
            })?,
        );
        written
            .push(self.write_artifact(&format!("{stem}-hubs.csv"), || Ok(render_hubs_csv(hubs)))?);
        Ok(written)
    }

    pub fn write_summary(&self, stem: &str, markdown: &str) -> Result<PathBuf> {
        let filename = format!("{stem}-executive-summary.md");
        self.write_artifact(&filename, || Ok(markdown.to_string()))
    }
}

/// File-name slug for a keyword or domain.
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut last_dash = true;
    for c in text.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn escape_csv(text: &str) -> String {
    // If the text contains comma, quote, or newline, wrap in quotes and escape quotes
    if text.contains(',') || text.contains('"') || text.contains('\n') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

pub fn render_brief_markdown(brief: &Brief) -> String {
    let mut md = String::new();

    md.push_str(&format!("# SEO Content Brief: {}\n\n", brief.primary_keyword));
    md.push_str(&format!("**Generated:** {}\n", brief.created_at));
    md.push_str(&format!("**Target Audience:** {}\n", brief.audience));
    md.push_str(&format!("**Content Goal:** {}\n", brief.goal));
    md.push_str(&format!(
        "**Target Length:** {}-{} words\n\n",
        brief.target_length.min, brief.target_length.max
    ));

    if !brief.rationale.is_empty() {
        md.push_str("**Audience & Goal Rationale:**\n");
        md.push_str(&format!("_{}_\n\n", brief.rationale));
    }

    md.push_str("---\n\n");

    for section in &brief.sections {
        md.push_str(&format!("## {}\n\n", section.heading));
        md.push_str(section.narrative.trim_end());
        md.push_str("\n\n");
    }

    md.push_str("---\n\n## Brief Metadata\n\n");

    md.push_str("### Keyword Metrics\n");
    md.push_str(&format!("- **Primary Keyword:** {}\n", brief.metrics.keyword));
    md.push_str(&format!(
        "- **Search Volume:** {}/mo\n",
        brief.metrics.search_volume
    ));
    md.push_str(&format!(
        "- **Competition:** {}/100\n",
        brief.metrics.competition
    ));
    match brief.metrics.cpc {
        Some(cpc) => md.push_str(&format!("- **CPC:** ${cpc:.2}\n")),
        None => md.push_str("- **CPC:** n/a\n"),
    }
    md.push('\n');

    if let Some(assessment) = &brief.competition {
        md.push_str("### Competition Analysis\n");
        md.push_str(&format!(
            "- **Overall Score:** {}/100\n",
            assessment.overall_score
        ));
        md.push_str(&format!("- **Verdict:** {}\n", assessment.verdict));
        md.push_str(&format!(
            "- **Target Position:** {}\n\n",
            assessment.target_position
        ));

        if !assessment.competitors.is_empty() {
            md.push_str(
                "| Domain | Position | Pos#1 KW | Total KW | ETV | Strength | Difficulty |\n",
            );
            md.push_str("|--------|----------|----------|----------|-----|----------|------------|\n");
            for c in &assessment.competitors {
                md.push_str(&format!(
                    "| {} | {} | {} | {} | ${:.0} | {} | {} |\n",
                    c.domain, c.position, c.pos_1, c.keywords, c.etv, c.strength_score, c.difficulty
                ));
            }
            md.push('\n');
        }

        if !assessment.recommendations.is_empty() {
            md.push_str("**Strategic Recommendations:**\n");
            for r in &assessment.recommendations {
                md.push_str(&format!("- {r}\n"));
            }
            md.push('\n');
        }
    }

    md.push_str("---\n\n");
    md.push_str(
        "*Generated with DataForSEO keyword and SERP data combined with Claude for strategic synthesis.*\n",
    );

    md
}

fn render_keywords_csv(clusters: &[Cluster]) -> String {
    let mut rows: Vec<(&str, &ScoredKeyword)> = clusters
        .iter()
        .flat_map(|c| c.keywords.iter().map(move |k| (c.name.as_str(), k)))
        .collect();
    rows.sort_by(|a, b| {
        b.1.opportunity_score
            .total_cmp(&a.1.opportunity_score)
            .then(b.1.record.search_volume.cmp(&a.1.record.search_volume))
            .then(a.1.record.keyword.cmp(&b.1.record.keyword))
    });

    let mut csv = String::from(
        "keyword,search_volume,competition,cpc,cluster,ranking_position,authority_score,opportunity_score,content_strategy\n",
    );
    for (cluster, k) in rows {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{:.1},{}\n",
            escape_csv(&k.record.keyword),
            k.record.search_volume,
            k.record.competition,
            k.record.cpc.map(|c| format!("{c:.2}")).unwrap_or_default(),
            escape_csv(cluster),
            k.ranking_position.map(|p| p.to_string()).unwrap_or_default(),
            k.authority_score,
            k.opportunity_score,
            escape_csv(k.content_strategy.label()),
        ));
    }
    csv
}

fn render_clusters_csv(clusters: &[Cluster]) -> String {
    let mut csv = String::from("cluster,keyword_count,total_volume,priority\n");
    for cluster in clusters {
        let total_volume: u64 = cluster.keywords.iter().map(|k| k.record.search_volume).sum();
        csv.push_str(&format!(
            "{},{},{},{:.1}\n",
            escape_csv(&cluster.name),
            cluster.keywords.len(),
            total_volume,
            cluster.priority,
        ));
    }
    csv
}

fn render_calendar_csv(calendar: &[CalendarEntry]) -> String {
    let mut csv =
        String::from("publish_date,title,content_type,hub,target_keyword,priority,status\n");
    for entry in calendar {
        csv.push_str(&format!(
            "{},{},{},{},{},{},planned\n",
            entry.publish_date,
            escape_csv(&entry.title),
            entry.content_type.label(),
            escape_csv(&entry.hub),
            escape_csv(&entry.target_keyword),
            entry.priority.label(),
        ));
    }
    csv
}

fn render_hubs_csv(hubs: &[ContentHub]) -> String {
    let mut csv = String::from(
        "hub,pillar_keyword,pillar_volume,total_volume,avg_authority,content_gaps,priority_score,supporting_keywords\n",
    );
    for hub in hubs {
        csv.push_str(&format!(
            "{},{},{},{},{:.2},{},{:.1},{}\n",
            escape_csv(&hub.name),
            escape_csv(&hub.pillar_keyword),
            hub.pillar_volume,
            hub.total_volume,
            hub.avg_authority,
            hub.content_gaps,
            hub.priority_score,
            escape_csv(&hub.supporting_keywords.join("; ")),
        ));
    }
    csv
}
