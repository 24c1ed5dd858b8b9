//! Response parser for vision model output
//!
//! The reasoning service is asked for a JSON object but responds with
//! free-form text: prose around the object, markdown fences, partially
//! wrong field types. This parser is total: any input string maps to a
//! well-formed `TimeframeAnalysis`, falling back to a fully neutral record
//! when nothing usable can be recovered. A bad model response must never
//! inject a false direction into the trade plan, and must never abort the
//! cascade.

use serde_json::Value;
use tracing::warn;

use super::numeric::{as_finite_f64, finite_f64_list, string_list};
use super::{Bias, EntryZone, KeyLevels, TimeframeAnalysis, Trend, TrendStrength};

/// Whether the analysis came out of real model output or the neutral fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed,
    Defaulted { reason: String },
}

/// Parser result: callers consume `analysis`, tests can assert on `outcome`
#[derive(Debug, Clone)]
pub struct ParsedAnalysis {
    pub analysis: TimeframeAnalysis,
    pub outcome: ParseOutcome,
}

/// Parse one timeframe's raw model response into a `TimeframeAnalysis`.
///
/// `primary_bias` is the highest timeframe's bias from the accumulated
/// context; it is only consulted when the model omits the alignment flag.
/// Never fails.
pub fn parse_analysis_response(
    raw: &str,
    interval: &str,
    position: usize,
    primary_bias: Bias,
) -> ParsedAnalysis {
    let Some(json_text) = extract_json_object(raw) else {
        let reason = format!(
            "Unable to parse analysis response: no JSON object found in {} chars of model output",
            raw.len()
        );
        warn!(interval, position, "falling back to neutral analysis");
        return ParsedAnalysis {
            analysis: TimeframeAnalysis::neutral(interval, position, &reason),
            outcome: ParseOutcome::Defaulted { reason },
        };
    };

    let obj: Value = match serde_json::from_str(&json_text) {
        Ok(value) => value,
        Err(e) => {
            let reason = format!("Unable to parse analysis response: invalid JSON ({})", e);
            warn!(interval, position, error = %e, "falling back to neutral analysis");
            return ParsedAnalysis {
                analysis: TimeframeAnalysis::neutral(interval, position, &reason),
                outcome: ParseOutcome::Defaulted { reason },
            };
        }
    };

    let trend = coerce_trend(&obj["trend"]);
    let trend_strength = coerce_strength(&obj["trend_strength"]);
    let bias = coerce_bias(&obj["bias"]);

    // key levels may arrive nested under "key_levels" or at the top level
    let levels_src = if obj["key_levels"].is_object() {
        &obj["key_levels"]
    } else {
        &obj
    };
    let key_levels = KeyLevels {
        support: finite_f64_list(&levels_src["support"]),
        resistance: finite_f64_list(&levels_src["resistance"]),
    };

    let mut signals = string_list(&obj["signals"]);
    if signals.is_empty() {
        signals = string_list(&obj["triggers"]);
    }

    // The highest timeframe has nothing above it to align with or enter from
    let aligns_with_higher_tf = if position == 0 {
        true
    } else {
        coerce_bool(&obj["aligns_with_higher_tf"])
            .unwrap_or(bias == primary_bias || bias == Bias::Neutral)
    };
    let entry_zone = if position == 0 {
        None
    } else {
        coerce_entry_zone(&obj["entry_zone"])
    };

    let reasoning = obj["reasoning"]
        .as_str()
        .or_else(|| obj["summary"].as_str())
        .unwrap_or("No reasoning provided")
        .to_string();

    ParsedAnalysis {
        analysis: TimeframeAnalysis {
            interval: interval.to_string(),
            position,
            trend,
            trend_strength,
            key_levels,
            signals,
            aligns_with_higher_tf,
            entry_zone,
            bias,
            reasoning,
        },
        outcome: ParseOutcome::Parsed,
    }
}

/// Extract the first balanced JSON object from text that may contain
/// markdown fences or surrounding prose.
fn extract_json_object(text: &str) -> Option<String> {
    // Fenced blocks first: the model often wraps its object in ```json
    if let Some(start) = text.find("```json") {
        if let Some(end) = text[start + 7..].find("```") {
            let candidate = text[start + 7..start + 7 + end].trim();
            if candidate.starts_with('{') {
                return Some(candidate.to_string());
            }
        }
    }
    if let Some(start) = text.find("```") {
        if let Some(end) = text[start + 3..].find("```") {
            let candidate = text[start + 3..start + 3 + end].trim();
            if candidate.starts_with('{') {
                return Some(candidate.to_string());
            }
        }
    }

    // Otherwise scan for the first balanced {...}, ignoring braces inside
    // string literals
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            if c != '\\' {
                escaped = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + i + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

fn keyword(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string().to_lowercase(),
    }
}

/// "bull"/"up" family maps bullish, "bear"/"down" bearish, anything else
/// falls to the conservative neutral
fn coerce_trend(value: &Value) -> Trend {
    let kw = keyword(value);
    if kw.contains("bull") || kw.contains("up") {
        Trend::Bullish
    } else if kw.contains("bear") || kw.contains("down") {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

fn coerce_strength(value: &Value) -> TrendStrength {
    let kw = keyword(value);
    if kw.contains("strong") {
        TrendStrength::Strong
    } else if kw.contains("moderate") || kw.contains("medium") {
        TrendStrength::Moderate
    } else {
        TrendStrength::Weak
    }
}

fn coerce_bias(value: &Value) -> Bias {
    let kw = keyword(value);
    if kw.contains("long") || kw.contains("buy") || kw.contains("bull") {
        Bias::Long
    } else if kw.contains("short") || kw.contains("sell") || kw.contains("bear") {
        Bias::Short
    } else {
        Bias::Neutral
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "yes" | "y" => Some(true),
            "false" | "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_entry_zone(value: &Value) -> Option<EntryZone> {
    let low = as_finite_f64(&value["low"])?;
    let high = as_finite_f64(&value["high"])?;
    // Tolerate a model that swaps the bounds
    if low <= high {
        Some(EntryZone { low, high })
    } else {
        Some(EntryZone { low: high, high: low })
    }
}
