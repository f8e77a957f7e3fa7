//! Wind alert evaluation and the periodic alert check

use serde::{Deserialize, Serialize};

pub mod check;
pub mod evaluator;

pub use check::{AlertCheckJob, CheckReport};
pub use evaluator::{AlertEvaluator, AlertResult, scan};

/// How a run of qualifying hours treats hours outside the alert's windows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakPolicy {
    /// Any hour that does not qualify ends the run
    #[default]
    ResetOnWindowExit,
    /// Hours outside the hour or direction window are passed over;
    /// only in-window hours below the thresholds end the run
    SkipOutsideWindow,
}
