//! Core data model for multi-timeframe chart analysis
//! Per-timeframe analysis records, accumulated context, and synthesis output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod context;
pub mod numeric;
pub mod parser;
pub mod sequencer;

pub use context::build_context;
pub use parser::{parse_analysis_response, ParseOutcome, ParsedAnalysis};
pub use sequencer::sequence_timeframes;

/// Directional trend read off a single chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Bullish => write!(f, "bullish"),
            Trend::Bearish => write!(f, "bearish"),
            Trend::Neutral => write!(f, "neutral"),
        }
    }
}

/// How decisively the trend is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrendStrength {
    Strong,
    Moderate,
    #[default]
    Weak,
}

impl std::fmt::Display for TrendStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendStrength::Strong => write!(f, "strong"),
            TrendStrength::Moderate => write!(f, "moderate"),
            TrendStrength::Weak => write!(f, "weak"),
        }
    }
}

/// Directional stance attributed to a timeframe or to the overall synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bias {
    Long,
    Short,
    #[default]
    Neutral,
}

impl std::fmt::Display for Bias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bias::Long => write!(f, "LONG"),
            Bias::Short => write!(f, "SHORT"),
            Bias::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Degree to which lower-timeframe biases agree with the highest timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Full,
    Partial,
    None,
}

impl std::fmt::Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Alignment::Full => write!(f, "full"),
            Alignment::Partial => write!(f, "partial"),
            Alignment::None => write!(f, "none"),
        }
    }
}

/// One chart supplied by the caller. Ordering is not guaranteed on input;
/// the sequencer normalizes to coarsest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeInput {
    /// Opaque, resolvable chart image reference (e.g. a URL)
    pub chart_ref: String,
    /// Semantic candle duration, e.g. "1D", "4h", "15m"
    pub interval: String,
    /// Optional role label used in synthesis reasoning (e.g. "htf")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Support and resistance levels read off a chart
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyLevels {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

/// Price band identified as a favorable area to enter a position
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EntryZone {
    pub low: f64,
    pub high: f64,
}

/// Completed analysis for one timeframe. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeAnalysis {
    pub interval: String,
    /// 0 = highest (coarsest) timeframe, analyzed first
    pub position: usize,
    pub trend: Trend,
    pub trend_strength: TrendStrength,
    pub key_levels: KeyLevels,
    pub signals: Vec<String>,
    /// Always true at position 0; the highest timeframe has nothing above it
    pub aligns_with_higher_tf: bool,
    /// Only set for positions below the highest timeframe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_zone: Option<EntryZone>,
    pub bias: Bias,
    pub reasoning: String,
}

impl TimeframeAnalysis {
    /// Fully neutral analysis used when the model response is unusable.
    /// Carries the failure reason so the cascade output stays auditable.
    pub fn neutral(interval: &str, position: usize, reason: &str) -> Self {
        Self {
            interval: interval.to_string(),
            position,
            trend: Trend::Neutral,
            trend_strength: TrendStrength::Weak,
            key_levels: KeyLevels::default(),
            signals: Vec::new(),
            aligns_with_higher_tf: true,
            entry_zone: None,
            bias: Bias::Neutral,
            reasoning: reason.to_string(),
        }
    }
}

/// Everything known from the timeframes analyzed so far, coarsest to current.
/// Rebuilt fresh from the full analysis list after every step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HigherTimeframeContext {
    pub summary: String,
    pub bias: Bias,
    /// Top-5 closest support levels pooled across analyses
    pub support: Vec<f64>,
    /// Top-5 closest resistance levels pooled across analyses
    pub resistance: Vec<f64>,
    pub all_aligned: bool,
    pub timeframe_count: usize,
}

/// Concrete entry/stop/target plan derived from a synthesis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradePlan {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: Vec<f64>,
    pub risk_percentage: f64,
    /// Entry-to-stop distance as a percentage of entry, when sizing is requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_size: Option<f64>,
}

/// Final output of the cascade: one weighted recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiTimeframeSynthesis {
    pub recommendation: Bias,
    /// Always clamped to [0, 1]
    pub confidence: f64,
    pub alignment: Alignment,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_plan: Option<TradePlan>,
}

/// What the caller of a completed cascade receives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeReport {
    pub request_id: Uuid,
    pub analyses: Vec<TimeframeAnalysis>,
    pub synthesis: MultiTimeframeSynthesis,
    pub analyzed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_vocabulary() {
        assert_eq!(
            serde_json::to_string(&Trend::Bullish).expect("serialize"),
            "\"bullish\""
        );
        assert_eq!(
            serde_json::to_string(&Bias::Long).expect("serialize"),
            "\"LONG\""
        );
        assert_eq!(
            serde_json::to_string(&Alignment::Partial).expect("serialize"),
            "\"partial\""
        );

        let bias: Bias = serde_json::from_str("\"SHORT\"").expect("deserialize");
        assert_eq!(bias, Bias::Short);
    }

    #[test]
    fn test_neutral_analysis_invariants() {
        let analysis = TimeframeAnalysis::neutral("4h", 2, "no JSON found in response");

        assert_eq!(analysis.trend, Trend::Neutral);
        assert_eq!(analysis.bias, Bias::Neutral);
        assert!(analysis.key_levels.support.is_empty());
        assert!(analysis.key_levels.resistance.is_empty());
        assert!(analysis.entry_zone.is_none());
        assert!(analysis.reasoning.contains("no JSON"));
    }

    #[test]
    fn test_analysis_serialization_round_trip() {
        let analysis = TimeframeAnalysis {
            interval: "1D".to_string(),
            position: 0,
            trend: Trend::Bullish,
            trend_strength: TrendStrength::Strong,
            key_levels: KeyLevels {
                support: vec![92000.0],
                resistance: vec![100000.0],
            },
            signals: vec!["golden cross".to_string()],
            aligns_with_higher_tf: true,
            entry_zone: None,
            bias: Bias::Long,
            reasoning: "Clear uptrend".to_string(),
        };

        let json = serde_json::to_string(&analysis).expect("serialize");
        let back: TimeframeAnalysis = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.bias, Bias::Long);
        assert_eq!(back.key_levels.support, vec![92000.0]);
    }
}
