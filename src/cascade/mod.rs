//! Cascade orchestrator
//! Coordinates the top-down walk: sequence timeframes → per-step prompt →
//! vision call → parse → accumulate context → synthesize

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{
    build_context, parse_analysis_response, sequence_timeframes, CascadeReport, ParseOutcome,
    TimeframeInput,
};
use crate::vision::{AnalyzeOptions, VisionError, VisionProvider};

pub mod legacy;
pub mod prompts;
pub mod synthesis;

pub use legacy::{FixedRoleOutcome, FixedRoleRequest, RoleChart};
pub use prompts::CascadePrompts;
pub use synthesis::synthesize;

/// Errors for cascade runs
#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("At least 2 timeframes are required for a cascade, got {supplied}")]
    InsufficientTimeframes { supplied: usize },

    #[error("Invalid interval: {interval:?} (expected forms like \"1D\", \"4h\", \"15m\")")]
    InvalidInterval { interval: String },

    #[error("Missing required role: {role}")]
    MissingRole { role: String },

    #[error("Reasoning service failed: {0}")]
    Provider(#[from] VisionError),
}

impl CascadeError {
    /// Validation errors are reported before any reasoning-service call
    pub fn is_validation(&self) -> bool {
        !matches!(self, CascadeError::Provider(_))
    }
}

/// Caller options for a cascade run
#[derive(Debug, Clone, Default)]
pub struct CascadeOptions {
    /// Risk-percentage override; see synthesis for the confidence banding
    pub risk_per_trade: Option<f64>,
    pub include_position_size: bool,
    /// Extra instructions appended to every timeframe prompt
    pub extra_instructions: Option<String>,
}

/// Drives the strictly sequential multi-timeframe walk.
///
/// Each run allocates its own analysis list and context value, so
/// concurrent cascades are independent. Within one run, step p+1 never
/// starts before step p's response is parsed: the accumulated context is
/// the whole point of the cascade.
pub struct CascadeOrchestrator<P: VisionProvider> {
    provider: P,
}

impl<P: VisionProvider> CascadeOrchestrator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider_ref(&self) -> &P {
        &self.provider
    }

    /// Run the full cascade over the supplied timeframes.
    ///
    /// Fails before any vision call on invalid input; propagates the first
    /// provider error and discards the partial cascade (a half-completed
    /// walk cannot support a sound trade plan). Parser failures never
    /// abort: unusable model output becomes a neutral analysis.
    pub async fn run(
        &self,
        timeframes: Vec<TimeframeInput>,
        options: &CascadeOptions,
    ) -> Result<CascadeReport, CascadeError> {
        let ordered = sequence_timeframes(timeframes)?;
        self.run_ordered(ordered, options).await
    }

    /// Run over timeframes already in coarsest-first order.
    /// Used directly by the fixed-role adapter, where role order is the
    /// position order.
    pub(crate) async fn run_ordered(
        &self,
        ordered: Vec<TimeframeInput>,
        options: &CascadeOptions,
    ) -> Result<CascadeReport, CascadeError> {
        if ordered.len() < 2 {
            return Err(CascadeError::InsufficientTimeframes {
                supplied: ordered.len(),
            });
        }

        let request_id = Uuid::new_v4();
        let total = ordered.len();
        info!(%request_id, total, "starting cascade analysis");

        let analyze_options = AnalyzeOptions {
            system_prompt: Some(CascadePrompts::system_prompt()),
            temperature: None,
        };

        let mut analyses = Vec::with_capacity(total);
        let mut context = build_context(&analyses);

        for (position, timeframe) in ordered.iter().enumerate() {
            info!(
                %request_id,
                interval = %timeframe.interval,
                position,
                context_timeframes = context.timeframe_count,
                "analyzing timeframe"
            );

            let prompt = CascadePrompts::timeframe_prompt(
                &timeframe.interval,
                position,
                total,
                &context,
                options.extra_instructions.as_deref(),
            );

            // Transport failure is fatal to the whole cascade; no neutral
            // substitution for the remaining steps
            let raw = self
                .provider
                .analyze_chart(&timeframe.chart_ref, &prompt, &analyze_options)
                .await?;

            let parsed =
                parse_analysis_response(&raw, &timeframe.interval, position, context.bias);
            if let ParseOutcome::Defaulted { reason } = &parsed.outcome {
                warn!(%request_id, position, reason = %reason, "step degraded to neutral analysis");
            }

            analyses.push(parsed.analysis);
            context = build_context(&analyses);
        }

        let roles: Vec<Option<String>> = ordered.iter().map(|t| t.role.clone()).collect();
        let synthesis = synthesize(
            &analyses,
            &roles,
            options.risk_per_trade,
            options.include_position_size,
        );

        info!(
            %request_id,
            recommendation = %synthesis.recommendation,
            confidence = synthesis.confidence,
            "cascade complete"
        );

        Ok(CascadeReport {
            request_id,
            analyses,
            synthesis,
            analyzed_at: Utc::now(),
        })
    }
}
