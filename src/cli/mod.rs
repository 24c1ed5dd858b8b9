//! Command-line interface
//! `analyze` runs the flexible N-timeframe cascade; `roles` runs the legacy
//! fixed htf/etf/ltf variant.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use chartcascade::cascade::{FixedRoleRequest, RoleChart};
use chartcascade::{
    CascadeOptions, CascadeOrchestrator, Config, TimeframeInput, VisionClient,
};

#[derive(Parser)]
#[command(name = "chartcascade", about = "Multi-timeframe chart cascade analysis")]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze two or more charts, coarsest timeframe first in the output
    Analyze {
        /// Chart spec as URL@INTERVAL or URL@INTERVAL@ROLE, repeatable
        #[arg(long = "chart", value_name = "URL@INTERVAL[@ROLE]", required = true)]
        charts: Vec<String>,

        /// Risk-per-trade percentage override
        #[arg(long)]
        risk: Option<f64>,

        /// Report entry-to-stop distance as a percentage of entry
        #[arg(long)]
        position_size: bool,

        /// Extra instructions appended to every prompt
        #[arg(long)]
        instructions: Option<String>,
    },
    /// Legacy fixed-role cascade (htf and etf required, ltf optional)
    Roles {
        #[arg(long, value_name = "URL@INTERVAL")]
        htf: String,
        #[arg(long, value_name = "URL@INTERVAL")]
        etf: String,
        #[arg(long, value_name = "URL@INTERVAL")]
        ltf: Option<String>,

        #[arg(long)]
        risk: Option<f64>,
        #[arg(long)]
        position_size: bool,
    },
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    let client = VisionClient::from_config(&config).context("Failed to build vision client")?;
    let orchestrator = CascadeOrchestrator::new(client);

    match cli.command {
        Commands::Analyze {
            charts,
            risk,
            position_size,
            instructions,
        } => {
            let timeframes = charts
                .iter()
                .map(|spec| parse_chart_spec(spec))
                .collect::<Result<Vec<_>>>()?;

            let options = CascadeOptions {
                risk_per_trade: risk.or(config.trading.risk_per_trade_pct),
                include_position_size: position_size || config.trading.include_position_size,
                extra_instructions: instructions,
            };

            let report = orchestrator.run(timeframes, &options).await?;
            print_report(&report.analyses, &report.synthesis);
            println!("\nRequest: {} at {}", report.request_id, report.analyzed_at);
        }
        Commands::Roles {
            htf,
            etf,
            ltf,
            risk,
            position_size,
        } => {
            let request = FixedRoleRequest {
                htf: Some(parse_role_chart(&htf)?),
                etf: Some(parse_role_chart(&etf)?),
                ltf: ltf.as_deref().map(parse_role_chart).transpose()?,
            };
            let options = CascadeOptions {
                risk_per_trade: risk.or(config.trading.risk_per_trade_pct),
                include_position_size: position_size || config.trading.include_position_size,
                extra_instructions: None,
            };

            let outcome = orchestrator.run_fixed_role(request, &options).await?;
            let mut analyses = vec![outcome.htf, outcome.etf];
            if let Some(ltf) = outcome.ltf {
                analyses.push(ltf);
            }
            print_report(&analyses, &outcome.synthesis);
        }
    }

    Ok(())
}

/// Parse "URL@INTERVAL" or "URL@INTERVAL@ROLE"
fn parse_chart_spec(spec: &str) -> Result<TimeframeInput> {
    let parts: Vec<&str> = spec.split('@').collect();
    match parts.as_slice() {
        [url, interval] => Ok(TimeframeInput {
            chart_ref: url.to_string(),
            interval: interval.to_string(),
            role: None,
        }),
        [url, interval, role] => Ok(TimeframeInput {
            chart_ref: url.to_string(),
            interval: interval.to_string(),
            role: Some(role.to_string()),
        }),
        _ => bail!("Invalid chart spec {spec:?}, expected URL@INTERVAL[@ROLE]"),
    }
}

fn parse_role_chart(spec: &str) -> Result<RoleChart> {
    let input = parse_chart_spec(spec)?;
    Ok(RoleChart {
        chart_ref: input.chart_ref,
        interval: input.interval,
    })
}

fn print_report(
    analyses: &[chartcascade::TimeframeAnalysis],
    synthesis: &chartcascade::analysis::MultiTimeframeSynthesis,
) {
    println!("\n🎯 CASCADE RECOMMENDATION");
    println!("=========================");
    println!("Direction: {}", synthesis.recommendation);
    println!("Confidence: {:.1}%", synthesis.confidence * 100.0);
    println!("Alignment: {}", synthesis.alignment);

    println!("\n📊 TIMEFRAMES:");
    for analysis in analyses {
        println!(
            "  {} — {} ({}), bias {}{}",
            analysis.interval,
            analysis.trend,
            analysis.trend_strength,
            analysis.bias,
            if analysis.position > 0 && !analysis.aligns_with_higher_tf {
                "  [diverges]"
            } else {
                ""
            }
        );
    }

    if let Some(plan) = &synthesis.trade_plan {
        println!("\n📋 TRADE PLAN:");
        println!("  Entry:       {}", plan.entry);
        println!("  Stop loss:   {}", plan.stop_loss);
        for (i, tp) in plan.take_profit.iter().enumerate() {
            println!("  Target {}:    {}", i + 1, tp);
        }
        println!("  Risk:        {:.1}% of account", plan.risk_percentage);
        if let Some(size) = plan.position_size {
            println!("  Stop dist.:  {size:.2}% of entry");
        }
    } else {
        println!("\n📋 No trade plan (insufficient alignment or no entry zone)");
    }

    println!("\n💭 REASONING:");
    println!("{}", synthesis.reasoning);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chart_spec() {
        let input = parse_chart_spec("https://charts.test/btc.png@4h").expect("spec");
        assert_eq!(input.chart_ref, "https://charts.test/btc.png");
        assert_eq!(input.interval, "4h");
        assert!(input.role.is_none());

        let input = parse_chart_spec("https://charts.test/btc.png@1D@htf").expect("spec");
        assert_eq!(input.role.as_deref(), Some("htf"));

        assert!(parse_chart_spec("no-interval").is_err());
        assert!(parse_chart_spec("a@b@c@d").is_err());
    }
}
