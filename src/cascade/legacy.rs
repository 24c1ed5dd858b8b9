//! Fixed three-role cascade variant
//!
//! The older calling convention names its timeframes higher/execution/lower
//! (htf/etf/ltf) instead of passing an open-ended list. It is the same
//! algorithm: this adapter validates role presence, maps roles onto
//! positions 0/1/2, and delegates to the canonical orchestrator. With the
//! optional ltf absent it degrades to a two-timeframe cascade.

use crate::analysis::{MultiTimeframeSynthesis, TimeframeAnalysis, TimeframeInput};
use crate::vision::VisionProvider;

use super::{CascadeError, CascadeOptions, CascadeOrchestrator};

/// One chart in the fixed-role convention
#[derive(Debug, Clone)]
pub struct RoleChart {
    pub chart_ref: String,
    pub interval: String,
}

/// Fixed-role request: htf and etf are mandatory, ltf optional
#[derive(Debug, Clone, Default)]
pub struct FixedRoleRequest {
    pub htf: Option<RoleChart>,
    pub etf: Option<RoleChart>,
    pub ltf: Option<RoleChart>,
}

/// Fixed-role result, re-split by role from the cascade positions
#[derive(Debug, Clone)]
pub struct FixedRoleOutcome {
    pub htf: TimeframeAnalysis,
    pub etf: TimeframeAnalysis,
    pub ltf: Option<TimeframeAnalysis>,
    pub synthesis: MultiTimeframeSynthesis,
}

impl<P: VisionProvider> CascadeOrchestrator<P> {
    /// Run the legacy fixed-role cascade.
    ///
    /// Fails fast with `CascadeError::MissingRole` before any vision call
    /// when `htf` or `etf` is absent.
    pub async fn run_fixed_role(
        &self,
        request: FixedRoleRequest,
        options: &CascadeOptions,
    ) -> Result<FixedRoleOutcome, CascadeError> {
        let htf = request.htf.ok_or_else(|| CascadeError::MissingRole {
            role: "htf".to_string(),
        })?;
        let etf = request.etf.ok_or_else(|| CascadeError::MissingRole {
            role: "etf".to_string(),
        })?;

        // Role order is position order; no re-sequencing by interval
        let mut ordered = vec![
            role_input(htf, "htf"),
            role_input(etf, "etf"),
        ];
        let has_ltf = request.ltf.is_some();
        if let Some(ltf) = request.ltf {
            ordered.push(role_input(ltf, "ltf"));
        }

        let report = self.run_ordered(ordered, options).await?;

        // The cascade returns exactly one analysis per input, in order
        let mut analyses = report.analyses.into_iter();
        let htf = analyses.next().expect("htf analysis present");
        let etf = analyses.next().expect("etf analysis present");
        let ltf = if has_ltf { analyses.next() } else { None };

        Ok(FixedRoleOutcome {
            htf,
            etf,
            ltf,
            synthesis: report.synthesis,
        })
    }
}

fn role_input(chart: RoleChart, role: &str) -> TimeframeInput {
    TimeframeInput {
        chart_ref: chart.chart_ref,
        interval: chart.interval,
        role: Some(role.to_string()),
    }
}
