use anyhow::Result;
use clap::Parser;
use shared::composer::BRIEF_SECTIONS;
use shared::dataforseo::clean_domain;
use shared::narrative::BriefContext;
use shared::{
    assess_competition, compose_brief, AudienceRecommendation, BriefSettings, ClaudeWriter,
    Config, ContentExtractor, DataForSeoClient, DomainAuthority, KeywordRecord, ReportWriter,
    TargetLength, DEFAULT_DOMAIN,
};
use std::collections::{HashMap, HashSet};
use std::io::{self as stdio, Write};
use std::path::PathBuf;

const SERP_DEPTH: u32 = 10;

#[derive(Parser)]
#[command(name = "generate-brief")]
#[command(about = "Generate an SEO content brief for a single keyword")]
struct Args {
    /// Primary keyword to brief (prompted for when omitted)
    #[arg(short, long)]
    keyword: Option<String>,

    /// Your domain, compared against the ranking competitors
    #[arg(short, long)]
    domain: Option<String>,

    /// Target audience (recommended from competitor analysis when omitted)
    #[arg(short, long)]
    audience: Option<String>,

    /// Content goal (recommended from competitor analysis when omitted)
    #[arg(short, long)]
    goal: Option<String>,

    /// Output directory for the brief artifacts
    #[arg(short, long, default_value = "output")]
    out_dir: PathBuf,
}

fn prompt_keyword() -> Result<String> {
    print!("Enter the primary keyword: ");
    stdio::stdout().flush()?;

    let mut input = String::new();
    stdio::stdin().read_line(&mut input)?;

    let keyword = input.trim().to_string();
    if keyword.is_empty() {
        anyhow::bail!("No keyword entered.");
    }
    Ok(keyword)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = Config::from_env()?;

    let keyword = match args.keyword {
        Some(keyword) => keyword,
        None => prompt_keyword()?,
    };
    let settings = BriefSettings {
        audience: args.audience,
        goal: args.goal,
        domain: args.domain.unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
        target_length: None,
    };

    println!("\n✓ Briefing \"{keyword}\" for {}", settings.domain);

    let dataforseo = DataForSeoClient::new(&config.dataforseo_login, &config.dataforseo_password)?;
    let claude = ClaudeWriter::new(config.anthropic_api_key)?;

    println!("\n📊 Fetching keyword metrics...");
    let metrics = match dataforseo.search_volume(&[keyword.clone()], &keyword).await {
        Ok(records) => records
            .into_iter()
            .find(|r| r.keyword.eq_ignore_ascii_case(&keyword))
            .unwrap_or_else(|| {
                log::warn!("No metrics returned for \"{keyword}\", continuing with zeroes");
                KeywordRecord::zeroed(&keyword)
            }),
        Err(e) => {
            log::warn!("Keyword metrics unavailable: {e}");
            println!("⚠ Keyword metrics unavailable, continuing with zeroes");
            KeywordRecord::zeroed(&keyword)
        }
    };
    println!(
        "✓ Volume {}/mo, competition {}/100",
        metrics.search_volume, metrics.competition
    );

    println!("\n🔍 Fetching SERP results...");
    let listings = match dataforseo.serp_listings(&keyword, SERP_DEPTH).await {
        Ok(listings) => listings,
        Err(e) => {
            log::warn!("SERP lookup failed: {e}");
            println!("⚠ SERP data unavailable, the brief will be keyword-only");
            Vec::new()
        }
    };
    println!("✓ Found {} organic results", listings.len());

    println!("\n📈 Fetching domain authority metrics...");
    let your_domain = clean_domain(&settings.domain);
    let mut targets: Vec<String> = listings.iter().map(|l| l.domain.clone()).collect();
    targets.push(your_domain.clone());
    let mut seen = HashSet::new();
    targets.retain(|t| seen.insert(t.clone()));

    let mut domain_metrics: HashMap<String, DomainAuthority> = HashMap::new();
    for target in &targets {
        match dataforseo.domain_rank(target).await {
            Ok(Some(authority)) => {
                domain_metrics.insert(target.clone(), authority);
            }
            Ok(None) => {}
            Err(e) => {
                // One bad domain never sinks the run.
                log::warn!("Skipping domain {target}: {e}");
            }
        }
    }
    println!("✓ Metrics for {}/{} domains", domain_metrics.len(), targets.len());
    let your_metrics = domain_metrics.get(&your_domain).cloned().unwrap_or_default();

    let audience = match (settings.audience, settings.goal) {
        (Some(audience), Some(goal)) => AudienceRecommendation {
            target_audience: audience,
            content_goal: goal,
            rationale: String::new(),
        },
        (audience, goal) => {
            println!("\n🎯 Recommending target audience and content goal...");
            let mut recommendation = claude.recommend_audience(&keyword, &listings).await;
            if let Some(audience) = audience {
                recommendation.target_audience = audience;
            }
            if let Some(goal) = goal {
                recommendation.content_goal = goal;
            }
            println!("✓ Audience: {}", recommendation.target_audience);
            println!("✓ Goal: {}", recommendation.content_goal);
            recommendation
        }
    };

    println!("\n⚖️ Assessing competition...");
    let assessment = assess_competition(&your_metrics, &listings, &domain_metrics);
    println!(
        "✓ Overall score {}/100 - {}",
        assessment.overall_score, assessment.verdict
    );

    println!("\n📏 Measuring competitor content length...");
    let extractor = ContentExtractor::new()?;
    let length = extractor.analyze_serp(&listings).await;
    let target_length = settings.target_length.unwrap_or(TargetLength {
        min: length.recommended_min,
        max: length.recommended_max,
    });
    println!(
        "✓ Recommended length: {}-{} words (competitor average {:.0})",
        target_length.min, target_length.max, length.average
    );

    println!("\n🤖 Writing narrative sections with Claude...");
    println!("  (This may take a minute...)");
    let mut narratives = HashMap::new();
    {
        let ctx = BriefContext {
            keyword: &metrics,
            audience: &audience.target_audience,
            goal: &audience.content_goal,
            listings: &listings,
            competition: Some(&assessment),
            target_length,
        };
        for heading in BRIEF_SECTIONS {
            match claude.section_narrative(&ctx, heading).await {
                Ok(text) => {
                    narratives.insert(heading.to_string(), text);
                }
                Err(e) => {
                    // The composer substitutes a placeholder for this key.
                    log::warn!("Narrative for \"{heading}\" failed: {e}");
                }
            }
            eprint!(".");
            let _ = stdio::stderr().flush();
        }
        eprintln!();
    }
    println!(
        "✓ {}/{} sections written",
        narratives.len(),
        BRIEF_SECTIONS.len()
    );

    let brief = compose_brief(
        metrics,
        &audience,
        target_length,
        Some(assessment),
        &narratives,
    );

    let report = ReportWriter::new(&args.out_dir)?;
    let markdown_path = report.write_brief(&brief)?;
    let json_path = report.write_brief_json(&brief)?;

    println!("\n✅ Brief saved to: {}", markdown_path.display());
    println!("   Data saved to: {}", json_path.display());

    Ok(())
}
