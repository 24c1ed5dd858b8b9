//! Prompt templates for the timeframe cascade
//! Each step's prompt embeds everything learned from the timeframes above it

use crate::analysis::HigherTimeframeContext;

/// Prompt template builder for cascade steps
pub struct CascadePrompts;

impl CascadePrompts {
    pub fn system_prompt() -> String {
        "You are an expert technical analyst reading trading charts. \
         You respond with a single JSON object and nothing else. \
         You never invent price levels that are not visible on the chart."
            .to_string()
    }

    /// Build the analysis prompt for one timeframe.
    ///
    /// Position 0 (highest timeframe) is analyzed unconstrained. Every
    /// lower timeframe gets the accumulated higher-timeframe context
    /// injected and is instructed to prefer setups aligned with its bias.
    pub fn timeframe_prompt(
        interval: &str,
        position: usize,
        total: usize,
        context: &HigherTimeframeContext,
        extra_instructions: Option<&str>,
    ) -> String {
        let ordinal = position + 1;
        let mut prompt = format!(
            r#"You are analyzing the {interval} chart, timeframe {ordinal} of {total} in a top-down multi-timeframe analysis.
"#
        );

        if position == 0 {
            prompt.push_str(
                r#"
This is the highest timeframe. Establish the baseline read with no external constraint: overall trend, trend strength, the key support and resistance levels visible on this chart, any notable signals, and your directional bias.
"#,
            );
        } else {
            let support = format_levels(&context.support);
            let resistance = format_levels(&context.resistance);
            let alignment_note = if context.all_aligned {
                "All higher timeframes are aligned so far."
            } else {
                "Higher timeframes are NOT fully aligned; be conservative."
            };
            prompt.push_str(&format!(
                r#"
HIGHER TIMEFRAME CONTEXT (coarsest first):
{summary}

Higher timeframe bias: {bias}
Aggregated support levels: {support}
Aggregated resistance levels: {resistance}
{alignment_note}

Analyze this chart in the context above. Prefer setups aligned with the higher timeframe bias; flag explicitly when this timeframe disagrees. Identify a concrete entry zone (price band) on this timeframe if one exists.
"#,
                summary = context.summary,
                bias = context.bias,
            ));
        }

        prompt.push_str(
            r#"
Respond with valid JSON only, matching this exact format:
{
    "trend": "bullish" | "bearish" | "neutral",
    "trend_strength": "strong" | "moderate" | "weak",
    "key_levels": {"support": [0.0], "resistance": [0.0]},
    "signals": ["signal description"],
    "bias": "LONG" | "SHORT" | "NEUTRAL",
"#,
        );
        if position > 0 {
            prompt.push_str(
                r#"    "aligns_with_higher_tf": true,
    "entry_zone": {"low": 0.0, "high": 0.0} | null,
"#,
            );
        }
        prompt.push_str(
            r#"    "reasoning": "concise explanation of the read"
}

RULES:
- Use only price levels visible on this chart
- Default to "neutral"/"NEUTRAL" when the picture is unclear
- Do not include markdown, prose, or code fences around the JSON"#,
        );

        if let Some(extra) = extra_instructions {
            prompt.push_str("\n\nADDITIONAL INSTRUCTIONS:\n");
            prompt.push_str(extra);
        }

        prompt
    }
}

fn format_levels(levels: &[f64]) -> String {
    if levels.is_empty() {
        return "none identified yet".to_string();
    }
    levels
        .iter()
        .map(|l| format!("{l}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{build_context, Bias, KeyLevels, TimeframeAnalysis, Trend};

    #[test]
    fn test_highest_timeframe_prompt_has_no_context() {
        let seed = build_context(&[]);
        let prompt = CascadePrompts::timeframe_prompt("1D", 0, 3, &seed, None);

        assert!(prompt.contains("timeframe 1 of 3"));
        assert!(prompt.contains("no external constraint"));
        assert!(!prompt.contains("HIGHER TIMEFRAME CONTEXT"));
        assert!(!prompt.contains("entry_zone"));
    }

    #[test]
    fn test_lower_timeframe_prompt_injects_context() {
        let mut analysis = TimeframeAnalysis::neutral("1D", 0, "");
        analysis.trend = Trend::Bullish;
        analysis.bias = Bias::Long;
        analysis.key_levels = KeyLevels {
            support: vec![92000.0],
            resistance: vec![100000.0],
        };
        let context = build_context(&[analysis]);

        let prompt = CascadePrompts::timeframe_prompt("4h", 1, 3, &context, None);
        assert!(prompt.contains("HIGHER TIMEFRAME CONTEXT"));
        assert!(prompt.contains("Higher timeframe bias: LONG"));
        assert!(prompt.contains("92000"));
        assert!(prompt.contains("entry_zone"));
        assert!(prompt.contains("Prefer setups aligned"));
    }

    #[test]
    fn test_extra_instructions_appended() {
        let seed = build_context(&[]);
        let prompt =
            CascadePrompts::timeframe_prompt("1D", 0, 2, &seed, Some("Focus on volume profile"));
        assert!(prompt.contains("ADDITIONAL INSTRUCTIONS"));
        assert!(prompt.ends_with("Focus on volume profile"));
    }
}
