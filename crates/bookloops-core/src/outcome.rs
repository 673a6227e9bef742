use bookloops_writer::History;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::EpochRecord;

/// The final outcome of a run
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoopOutcome {
    /// A candidate passed the gate
    Approved {
        epochs: usize,
        score: i64,
        /// None when the export itself failed
        exported_to: Option<PathBuf>,
        #[serde(skip)]
        history: History,
        records: Vec<EpochRecord>,
        total_duration_secs: f64,
    },
    /// Every epoch of the budget was rejected
    BudgetExhausted {
        epochs: usize,
        best_score: Option<i64>,
        #[serde(skip)]
        history: History,
        records: Vec<EpochRecord>,
        total_duration_secs: f64,
    },
    /// User requested stop (e.g., Ctrl+C)
    Interrupted {
        epochs: usize,
        #[serde(skip)]
        history: History,
        records: Vec<EpochRecord>,
        total_duration_secs: f64,
    },
}

impl LoopOutcome {
    pub fn approved(
        epochs: usize,
        score: i64,
        exported_to: Option<PathBuf>,
        history: History,
        records: Vec<EpochRecord>,
        duration: Duration,
    ) -> Self {
        Self::Approved {
            epochs,
            score,
            exported_to,
            history,
            records,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn budget_exhausted(
        epochs: usize,
        history: History,
        records: Vec<EpochRecord>,
        duration: Duration,
    ) -> Self {
        Self::BudgetExhausted {
            epochs,
            best_score: history.best_score(),
            history,
            records,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn interrupted(
        epochs: usize,
        history: History,
        records: Vec<EpochRecord>,
        duration: Duration,
    ) -> Self {
        Self::Interrupted {
            epochs,
            history,
            records,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn epochs(&self) -> usize {
        match self {
            Self::Approved { epochs, .. } => *epochs,
            Self::BudgetExhausted { epochs, .. } => *epochs,
            Self::Interrupted { epochs, .. } => *epochs,
        }
    }

    pub fn history(&self) -> &History {
        match self {
            Self::Approved { history, .. } => history,
            Self::BudgetExhausted { history, .. } => history,
            Self::Interrupted { history, .. } => history,
        }
    }

    pub fn records(&self) -> &[EpochRecord] {
        match self {
            Self::Approved { records, .. } => records,
            Self::BudgetExhausted { records, .. } => records,
            Self::Interrupted { records, .. } => records,
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }

    /// Running out of epochs is a normal ending, not an error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Approved { .. } => 0,
            Self::BudgetExhausted { .. } => 0,
            Self::Interrupted { .. } => 130,
        }
    }
}
