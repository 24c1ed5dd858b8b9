//! Higher-timeframe context builder
//!
//! Folds every completed analysis into the compact summary injected into
//! the next lower timeframe's prompt. Rebuilt from scratch after each step;
//! nothing here is mutated in place.

use super::{Bias, HigherTimeframeContext, TimeframeAnalysis};

const MAX_LEVELS: usize = 5;

/// Build the context consumed by the next cascade step.
///
/// The highest timeframe's bias is the directional ceiling for the whole
/// cascade: later entries never override it. An empty slice yields the
/// neutral seed context used before the first step.
pub fn build_context(analyses: &[TimeframeAnalysis]) -> HigherTimeframeContext {
    let Some(primary) = analyses.first() else {
        return HigherTimeframeContext {
            summary: String::new(),
            bias: Bias::Neutral,
            support: Vec::new(),
            resistance: Vec::new(),
            all_aligned: true,
            timeframe_count: 0,
        };
    };

    let bias = primary.bias;
    let all_aligned = analyses
        .iter()
        .all(|a| a.bias == bias || a.bias == Bias::Neutral);

    // Support reads highest-first (closest below price), resistance
    // lowest-first (closest above), both capped at the top five.
    let mut support: Vec<f64> = analyses
        .iter()
        .flat_map(|a| a.key_levels.support.iter().copied())
        .collect();
    support.sort_by(|a, b| b.total_cmp(a));
    support.dedup();
    support.truncate(MAX_LEVELS);

    let mut resistance: Vec<f64> = analyses
        .iter()
        .flat_map(|a| a.key_levels.resistance.iter().copied())
        .collect();
    resistance.sort_by(f64::total_cmp);
    resistance.dedup();
    resistance.truncate(MAX_LEVELS);

    let summary = analyses
        .iter()
        .map(|a| {
            let mut line = format!(
                "{}: {} ({}), bias {}",
                a.interval, a.trend, a.trend_strength, a.bias
            );
            if a.position > 0 {
                line.push_str(if a.aligns_with_higher_tf {
                    ", aligns: YES"
                } else {
                    ", aligns: NO"
                });
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");

    HigherTimeframeContext {
        summary,
        bias,
        support,
        resistance,
        all_aligned,
        timeframe_count: analyses.len(),
    }
}
