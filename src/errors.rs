//! Typed error hierarchy for agentflow.
//!
//! Four enums cover the four subsystems:
//! - `RunError`: failures while a sequencer run is progressing
//! - `PayloadError`: payload lookup and consistency failures
//! - `WorkflowError`: invalid edits to the stage configuration
//! - `ConfigError`: invalid values in `agentflow.toml`

use thiserror::Error;

use crate::classify::GoalCategory;
use crate::phase::{Phase, StageType};

/// Errors that abort a sequencer run.
///
/// These never escape `PhaseSequencer::submit_goal`; they are logged and surface
/// as `RunOutcome::Failed` on the run handle.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to load payloads: {0}")]
    Payload(#[from] PayloadError),

    #[error("Phase cannot move backwards from {from} to {to}")]
    PhaseRegression { from: Phase, to: Phase },

    #[error("Executor output {index} has no matching subtask ({available} planned)")]
    MissingSubTask { index: usize, available: usize },

    #[error("Run task panicked: {0}")]
    Panicked(String),
}

/// Errors from the payload provider.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("No payloads registered for category {0}")]
    UnknownCategory(GoalCategory),

    #[error("Failed to parse {category} payloads: {source}")]
    Parse {
        category: GoalCategory,
        #[source]
        source: toml::de::Error,
    },

    #[error("Executor has {outputs} outputs but the planner only has {sub_tasks} subtasks")]
    ExecutorOverflow { outputs: usize, sub_tasks: usize },

    #[error("Duplicate subtask id {0}")]
    DuplicateSubTask(u32),

    #[error("Overall score {0} is outside 0-100")]
    ScoreOutOfRange(u32),
}

/// Errors from editing a `Workflow`.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Stage '{0}' not found in workflow")]
    StageNotFound(String),

    #[error("A {0} stage is already part of the workflow")]
    AlreadyPresent(StageType),

    #[error("Position {position} is out of range for {len} stages")]
    PositionOutOfRange { position: usize, len: usize },
}

/// Errors from validating `agentflow.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("classifier.internship_keywords must not be empty")]
    NoKeywords,

    #[error("classifier.internship_keywords contains a blank entry")]
    BlankKeyword,

    #[error("Invalid value '{value}' for {var}: expected milliseconds")]
    InvalidEnvDelay { var: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_error_converts_from_payload_error() {
        let inner = PayloadError::ScoreOutOfRange(140);
        let err: RunError = inner.into();
        match &err {
            RunError::Payload(PayloadError::ScoreOutOfRange(score)) => assert_eq!(*score, 140),
            _ => panic!("Expected RunError::Payload(ScoreOutOfRange)"),
        }
        assert!(err.to_string().contains("140"));
    }

    #[test]
    fn run_error_phase_regression_names_both_phases() {
        let err = RunError::PhaseRegression {
            from: Phase::Critiquing,
            to: Phase::Planning,
        };
        let msg = err.to_string();
        assert!(msg.contains("critiquing"));
        assert!(msg.contains("planning"));
    }

    #[test]
    fn payload_error_executor_overflow_carries_counts() {
        let err = PayloadError::ExecutorOverflow {
            outputs: 5,
            sub_tasks: 4,
        };
        match &err {
            PayloadError::ExecutorOverflow { outputs, sub_tasks } => {
                assert_eq!(*outputs, 5);
                assert_eq!(*sub_tasks, 4);
            }
            _ => panic!("Expected ExecutorOverflow"),
        }
    }

    #[test]
    fn workflow_error_already_present_names_stage() {
        let err = WorkflowError::AlreadyPresent(StageType::Critic);
        assert!(err.to_string().contains("critic"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&RunError::Panicked("boom".into()));
        assert_std_error(&PayloadError::DuplicateSubTask(1));
        assert_std_error(&WorkflowError::StageNotFound("x".into()));
        assert_std_error(&ConfigError::NoKeywords);
    }
}
