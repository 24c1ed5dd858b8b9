//! Synthesis engine
//!
//! Collapses the full ordered analysis list into one recommendation:
//! alignment classification, additive clamped confidence, directional call,
//! and a concrete trade plan when the cascade supports one.

use tracing::info;

use crate::analysis::{
    Alignment, Bias, MultiTimeframeSynthesis, TimeframeAnalysis, TradePlan,
};

const MIN_ACTIONABLE_CONFIDENCE: f64 = 0.3;
const MAX_TAKE_PROFIT_LEVELS: usize = 3;

/// Combine per-timeframe analyses into the final weighted recommendation.
///
/// `roles` supplies optional caller role labels by position; missing
/// entries fall back to derived HTF/MTF/LTF labels. `risk_per_trade` is the
/// caller override for the risk percentage; see `risk_percentage` for the
/// banding rules.
pub fn synthesize(
    analyses: &[TimeframeAnalysis],
    roles: &[Option<String>],
    risk_per_trade: Option<f64>,
    include_position_size: bool,
) -> MultiTimeframeSynthesis {
    let Some(primary) = analyses.first() else {
        return MultiTimeframeSynthesis {
            recommendation: Bias::Neutral,
            confidence: 0.0,
            alignment: Alignment::None,
            reasoning: "No timeframes analyzed".to_string(),
            trade_plan: None,
        };
    };

    let total = analyses.len();
    let aligned = analyses
        .iter()
        .filter(|a| a.bias == primary.bias || a.bias == Bias::Neutral)
        .count();
    let alignment_ratio = aligned as f64 / total as f64;
    // Strictly above one half: an evenly split cascade (e.g. two opposing
    // timeframes) carries no alignment at all
    let alignment = if alignment_ratio >= 1.0 {
        Alignment::Full
    } else if alignment_ratio > 0.5 {
        Alignment::Partial
    } else {
        Alignment::None
    };

    let confidence = compute_confidence(analyses, alignment_ratio, alignment);

    let recommendation = if alignment == Alignment::None || confidence < MIN_ACTIONABLE_CONFIDENCE
    {
        Bias::Neutral
    } else {
        primary.bias
    };

    let trade_plan = build_trade_plan(
        analyses,
        alignment,
        recommendation,
        confidence,
        risk_per_trade,
        include_position_size,
    );

    let reasoning = build_reasoning(analyses, roles, alignment, confidence);

    info!(
        %recommendation,
        %alignment,
        confidence,
        has_plan = trade_plan.is_some(),
        "cascade synthesis complete"
    );

    MultiTimeframeSynthesis {
        recommendation,
        confidence,
        alignment,
        reasoning,
        trade_plan,
    }
}

/// Additive confidence score, clamped to [0, 1]:
/// alignment ratio (up to 0.4), highest-timeframe trend strength (up to
/// 0.2), pooled signal count (up to 0.2), multi-timeframe confirmation
/// bonus (up to 0.15).
fn compute_confidence(
    analyses: &[TimeframeAnalysis],
    alignment_ratio: f64,
    alignment: Alignment,
) -> f64 {
    use crate::analysis::TrendStrength;

    let mut confidence = alignment_ratio * 0.4;

    confidence += match analyses[0].trend_strength {
        TrendStrength::Strong => 0.2,
        TrendStrength::Moderate => 0.1,
        TrendStrength::Weak => 0.0,
    };

    let signal_count: usize = analyses.iter().map(|a| a.signals.len()).sum();
    confidence += (0.03 * signal_count as f64).min(0.2);

    if analyses.len() >= 4 && alignment == Alignment::Full {
        confidence += 0.15;
    } else if analyses.len() >= 3 && alignment != Alignment::None {
        confidence += 0.10;
    }

    confidence.clamp(0.0, 1.0)
}

fn build_trade_plan(
    analyses: &[TimeframeAnalysis],
    alignment: Alignment,
    recommendation: Bias,
    confidence: f64,
    risk_per_trade: Option<f64>,
    include_position_size: bool,
) -> Option<TradePlan> {
    if alignment == Alignment::None || recommendation == Bias::Neutral {
        return None;
    }
    let zone = analyses.last()?.entry_zone?;

    let entry = match recommendation {
        Bias::Long => zone.low,
        Bias::Short => zone.high,
        Bias::Neutral => return None,
    };

    // Key levels pooled across every timeframe, not just the lowest
    let supports: Vec<f64> = analyses
        .iter()
        .flat_map(|a| a.key_levels.support.iter().copied())
        .collect();
    let resistances: Vec<f64> = analyses
        .iter()
        .flat_map(|a| a.key_levels.resistance.iter().copied())
        .collect();

    let (stop_loss, take_profit) = match recommendation {
        Bias::Long => {
            let stop = supports
                .iter()
                .copied()
                .filter(|s| *s < entry)
                .fold(None::<f64>, |acc, s| Some(acc.map_or(s, |a| a.max(s))))
                .unwrap_or(entry * 0.98);
            let mut targets: Vec<f64> =
                resistances.iter().copied().filter(|r| *r > entry).collect();
            targets.sort_by(f64::total_cmp);
            targets.dedup();
            targets.truncate(MAX_TAKE_PROFIT_LEVELS);
            if targets.is_empty() {
                targets.push(entry * 1.05);
            }
            (stop, targets)
        }
        Bias::Short => {
            let stop = resistances
                .iter()
                .copied()
                .filter(|r| *r > entry)
                .fold(None::<f64>, |acc, r| Some(acc.map_or(r, |a| a.min(r))))
                .unwrap_or(entry * 1.02);
            let mut targets: Vec<f64> = supports.iter().copied().filter(|s| *s < entry).collect();
            targets.sort_by(|a, b| b.total_cmp(a));
            targets.dedup();
            targets.truncate(MAX_TAKE_PROFIT_LEVELS);
            if targets.is_empty() {
                targets.push(entry * 0.95);
            }
            (stop, targets)
        }
        Bias::Neutral => return None,
    };

    let risk_percentage = risk_percentage(confidence, risk_per_trade);
    let position_size = include_position_size
        .then(|| ((entry - stop_loss).abs() / entry) * 100.0);

    Some(TradePlan {
        entry,
        stop_loss,
        take_profit,
        risk_percentage,
        position_size,
    })
}

/// Risk percentage banded by confidence: 1.5 at >= 0.7, 1.0 at >= 0.5,
/// 0.5 below.
///
/// Quirk preserved from the original system: the caller override is honored
/// in the high and low bands but silently ignored in the middle band, which
/// always yields 1.0. Possibly a defect upstream; kept for fidelity.
fn risk_percentage(confidence: f64, risk_per_trade: Option<f64>) -> f64 {
    if confidence >= 0.7 {
        risk_per_trade.unwrap_or(1.5)
    } else if confidence >= 0.5 {
        1.0
    } else {
        risk_per_trade.unwrap_or(0.5)
    }
}

fn build_reasoning(
    analyses: &[TimeframeAnalysis],
    roles: &[Option<String>],
    alignment: Alignment,
    confidence: f64,
) -> String {
    let total = analyses.len();
    let mut clauses: Vec<String> = analyses
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let label = roles
                .get(i)
                .and_then(|r| r.as_deref())
                .map(str::to_string)
                .unwrap_or_else(|| derived_role_label(i, total).to_string());
            format!(
                "{} ({}): {} {}, aligns: {}",
                a.interval,
                label,
                a.trend,
                a.bias,
                if a.aligns_with_higher_tf { "✓" } else { "✗" }
            )
        })
        .collect();

    clauses.push(format!(
        "{} timeframes analyzed, alignment {}, confidence {:.0}%",
        total,
        alignment,
        confidence * 100.0
    ));
    clauses.join(" | ")
}

fn derived_role_label(position: usize, total: usize) -> &'static str {
    if position == 0 {
        "HTF"
    } else if position + 1 == total {
        "LTF"
    } else {
        "MTF"
    }
}
