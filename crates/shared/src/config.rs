use anyhow::{Context, Result};
use std::env;

/// Domain analyzed when no --domain flag is given.
pub const DEFAULT_DOMAIN: &str = "io.net";

#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub dataforseo_login: String,
    pub dataforseo_password: String,
}

impl Config {
    /// Load credentials from the environment. This is the only fatal
    /// failure in the tool and it happens before any collaborator call.
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        let anthropic_api_key = env::var("ANTHROPIC_API_KEY").context(
            "ANTHROPIC_API_KEY not found.\n\n\
            To fix this, create ~/.config/seo-strategy/.env with:\n  \
            ANTHROPIC_API_KEY=your_key_here\n  \
            DATAFORSEO_LOGIN=your_login_here\n  \
            DATAFORSEO_PASSWORD=your_password_here\n\n\
            Get your Anthropic API key from: https://console.anthropic.com/settings/keys",
        )?;

        let dataforseo_login = env::var("DATAFORSEO_LOGIN").context(
            "DATAFORSEO_LOGIN not found.\n\n\
            To fix this, create ~/.config/seo-strategy/.env with:\n  \
            DATAFORSEO_LOGIN=your_login_here\n  \
            DATAFORSEO_PASSWORD=your_password_here\n\n\
            Get your DataForSEO credentials from: https://app.dataforseo.com/api-access",
        )?;

        let dataforseo_password = env::var("DATAFORSEO_PASSWORD")
            .context("DATAFORSEO_PASSWORD not found. Set it alongside DATAFORSEO_LOGIN.")?;

        Ok(Self {
            anthropic_api_key,
            dataforseo_login,
            dataforseo_password,
        })
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/seo-strategy/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("seo-strategy").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() && dotenvy::from_path(&home_path).is_ok() {
                return;
            }
        }

        // If none found, that's okay - environment variables might be set system-wide
    }
}

/// Recommended word-count range for a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TargetLength {
    pub min: u32,
    pub max: u32,
}

impl Default for TargetLength {
    fn default() -> Self {
        Self {
            min: 3000,
            max: 4000,
        }
    }
}

/// Per-run brief settings. A closed set of recognized options; audience
/// and goal are recommended from competitor analysis when left unset.
#[derive(Debug, Clone, Default)]
pub struct BriefSettings {
    pub audience: Option<String>,
    pub goal: Option<String>,
    pub domain: String,
    pub target_length: Option<TargetLength>,
}

/// Seed keywords used by the full analysis when none are supplied.
pub fn default_seed_keywords() -> Vec<String> {
    [
        "decentralized gpu",
        "gpu computing",
        "distributed computing",
        "ai training infrastructure",
        "machine learning compute",
        "cloud gpu",
        "gpu cluster",
        "high performance computing",
        "gpu as a service",
        "ai infrastructure",
        "machine learning infrastructure",
        "gpu rental",
        "distributed gpu",
        "gpu cloud computing",
        "ai compute platform",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
