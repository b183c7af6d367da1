use anyhow::Result;
use clap::Parser;
use shared::composer::{CALENDAR_DAYS, PLACEHOLDER_NARRATIVE};
use shared::{
    build_calendar, build_hubs, default_seed_keywords, score_keywords, slugify,
    sort_by_opportunity, AnalysisData, AnalysisStats, ClaudeWriter, Config, DataForSeoClient,
    ReportWriter, TopicalClusterer, DEFAULT_DOMAIN,
};
use std::collections::HashSet;
use std::path::PathBuf;

const RANKED_KEYWORDS_LIMIT: u32 = 1000;
const TOP_OPPORTUNITIES: usize = 10;

#[derive(Parser)]
#[command(name = "run-analysis")]
#[command(about = "Run the full topical-authority analysis for a domain")]
struct Args {
    /// Domain to analyze
    #[arg(short, long)]
    domain: Option<String>,

    /// Seed keyword to expand (repeatable; defaults to the built-in list)
    #[arg(short, long = "seed")]
    seeds: Vec<String>,

    /// Output directory for the report set
    #[arg(short, long, default_value = "output")]
    out_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = Config::from_env()?;

    let domain = args.domain.unwrap_or_else(|| DEFAULT_DOMAIN.to_string());
    let seeds = if args.seeds.is_empty() {
        default_seed_keywords()
    } else {
        args.seeds
    };

    println!("\n✓ Analyzing {domain} from {} seed keywords", seeds.len());

    let dataforseo = DataForSeoClient::new(&config.dataforseo_login, &config.dataforseo_password)?;

    println!("\n📚 Building keyword dataset...");
    println!("  (One request per seed with a fixed delay, this takes a while...)");
    let mut records = Vec::new();
    for seed in &seeds {
        match dataforseo.search_volume(&[seed.clone()], seed).await {
            Ok(fetched) => records.extend(fetched),
            Err(e) => {
                // Failed seeds are skipped, not fatal.
                log::warn!("Metrics for seed \"{seed}\" failed: {e}");
                continue;
            }
        }
        match dataforseo.related_keywords(seed).await {
            Ok(fetched) => records.extend(fetched),
            Err(e) => log::warn!("Related keywords for \"{seed}\" failed: {e}"),
        }
    }

    let mut seen = HashSet::new();
    records.retain(|r| r.search_volume > 0 && seen.insert(r.keyword.to_lowercase()));
    println!("✓ Collected {} unique keywords", records.len());

    println!("\n📈 Checking current rankings for {domain}...");
    let rankings = match dataforseo.ranked_keywords(&domain, RANKED_KEYWORDS_LIMIT).await {
        Ok(rankings) => rankings,
        Err(e) => {
            log::warn!("Ranked keywords unavailable: {e}");
            println!("⚠ Ranking data unavailable, treating every keyword as a gap");
            Vec::new()
        }
    };
    println!("✓ {} ranked keywords found", rankings.len());

    let mut scored = score_keywords(records, &rankings);
    sort_by_opportunity(&mut scored);

    println!("\n🔗 Clustering keywords by topic...");
    let clusters = TopicalClusterer::default().cluster(scored.clone());
    println!("✓ Organized into {} clusters", clusters.len());

    let hubs = build_hubs(&clusters);
    let today = chrono::Local::now().date_naive();
    let calendar = build_calendar(&hubs, today);
    println!(
        "✓ {} content hubs, {} calendar entries over {CALENDAR_DAYS} days",
        hubs.len(),
        calendar.len()
    );

    let stats = AnalysisStats::collect(&scored, &hubs, &calendar);

    println!("\n🤖 Generating executive summary with Claude...");
    let claude = ClaudeWriter::new(config.anthropic_api_key)?;
    let hub_lines: Vec<String> = hubs
        .iter()
        .map(|h| {
            format!(
                "- {} (pillar: \"{}\", priority {:.0}, authority {:.0}, gaps {})",
                h.name, h.pillar_keyword, h.priority_score, h.avg_authority, h.content_gaps
            )
        })
        .collect();
    let top_opportunities: Vec<String> = scored
        .iter()
        .take(TOP_OPPORTUNITIES)
        .map(|k| {
            format!(
                "- \"{}\" (volume {}, competition {}, score {:.1}, {})",
                k.record.keyword,
                k.record.search_volume,
                k.record.competition,
                k.opportunity_score,
                k.content_strategy
            )
        })
        .collect();
    let summary = match claude
        .executive_summary(&domain, &stats, &hub_lines, &top_opportunities)
        .await
    {
        Ok(summary) => summary,
        Err(e) => {
            log::warn!("Executive summary failed: {e}");
            println!("⚠ Executive summary unavailable, writing placeholder");
            PLACEHOLDER_NARRATIVE.to_string()
        }
    };

    println!("\n📝 Writing reports...");
    let stem = format!("{}-{}", slugify(&domain), today.format("%Y%m%d"));
    let report = ReportWriter::new(&args.out_dir)?;

    let sheets = report.write_sheets(&stem, &clusters, &calendar, &hubs)?;
    for sheet in &sheets {
        println!("✓ {}", sheet.display());
    }

    let data = AnalysisData::new(domain, scored, clusters, hubs, calendar);
    let json_path = report.write_analysis_json(&data, &stem)?;
    println!("✓ {}", json_path.display());

    let summary_path = report.write_summary(&stem, &summary)?;
    println!("✓ {}", summary_path.display());

    println!("\n✅ Analysis complete!");
    println!("  • Keywords analyzed: {}", stats.total_keywords);
    println!("  • Content hubs identified: {}", stats.content_hubs);
    println!("  • High-priority gaps: {}", stats.high_priority_gaps);
    println!("  • Calendar pieces planned: {}", stats.calendar_items);

    Ok(())
}
