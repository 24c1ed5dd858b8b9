// ChartCascade - Multi-Timeframe Chart Cascade Engine
// Walks a set of chart images from the highest timeframe down to the lowest,
// letting each higher timeframe constrain the analysis of the next, and
// synthesizes the results into a single trade recommendation.

#![deny(clippy::unwrap_used)]

pub mod analysis;
pub mod cascade;
pub mod config;
pub mod vision;

// Re-export commonly used items
pub use analysis::{
    Bias, CascadeReport, HigherTimeframeContext, KeyLevels, TimeframeAnalysis, TimeframeInput,
    Trend, TrendStrength,
};
pub use cascade::{CascadeError, CascadeOptions, CascadeOrchestrator};
pub use config::Config;
pub use vision::{VisionClient, VisionProvider};
