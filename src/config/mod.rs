use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub vision: VisionSettings,
    pub trading: TradingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSettings {
    /// Caller-level default risk per trade, percent of account
    pub risk_per_trade_pct: Option<f64>,
    pub include_position_size: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Sets env vars from .env unless already set in the shell
        dotenv::dotenv().ok();

        let config = Config {
            vision: VisionSettings {
                api_url: env::var("VISION_API_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                api_key: env::var("VISION_API_KEY").ok(),
                model: env::var("VISION_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
                timeout_seconds: env::var("VISION_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .context("Invalid VISION_TIMEOUT_SECONDS value")?,
                max_retries: env::var("VISION_MAX_RETRIES")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .context("Invalid VISION_MAX_RETRIES value")?,
                temperature: env::var("VISION_TEMPERATURE")
                    .unwrap_or_else(|_| "0.2".to_string())
                    .parse()
                    .context("Invalid VISION_TEMPERATURE value")?,
            },
            trading: TradingSettings {
                risk_per_trade_pct: match env::var("RISK_PER_TRADE_PCT") {
                    Ok(raw) => Some(raw.parse().context("Invalid RISK_PER_TRADE_PCT value")?),
                    Err(_) => None,
                },
                include_position_size: env::var("INCLUDE_POSITION_SIZE")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()
                    .context("Invalid INCLUDE_POSITION_SIZE value (use true/false)")?,
            },
        };

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vision: VisionSettings {
                api_url: "https://api.openai.com/v1".to_string(),
                api_key: None,
                model: "gpt-4o".to_string(),
                timeout_seconds: 60,
                max_retries: 2,
                temperature: 0.2,
            },
            trading: TradingSettings {
                risk_per_trade_pct: None,
                include_position_size: false,
            },
        }
    }
}
