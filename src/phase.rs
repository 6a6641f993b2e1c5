//! Pipeline phases and the agent stages that drive them.
//!
//! `Phase` is the visible progress of a run. `StageType` is the role a user can
//! enable or disable. Each stage maps onto exactly one working phase; `Idle` and
//! `Complete` bracket the run.

use serde::{Deserialize, Serialize};

/// One step of the fixed pipeline.
///
/// Variants are declared in pipeline order, so the derived `Ord` is the order
/// phases advance in during a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Planning,
    Executing,
    Critiquing,
    Refining,
    Complete,
}

impl Phase {
    /// All phases in pipeline order.
    pub const ALL: [Phase; 6] = [
        Phase::Idle,
        Phase::Planning,
        Phase::Executing,
        Phase::Critiquing,
        Phase::Refining,
        Phase::Complete,
    ];

    /// Position of this phase in the pipeline (idle = 0, complete = 5).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether a run has finished.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete)
    }

    /// Whether an agent stage is currently working.
    pub fn is_working(self) -> bool {
        self.stage().is_some()
    }

    /// The stage responsible for this phase, if any.
    pub fn stage(self) -> Option<StageType> {
        match self {
            Phase::Planning => Some(StageType::Planner),
            Phase::Executing => Some(StageType::Executor),
            Phase::Critiquing => Some(StageType::Critic),
            Phase::Refining => Some(StageType::Refiner),
            Phase::Idle | Phase::Complete => None,
        }
    }

    /// Human-readable label for status lines.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "Ready",
            Phase::Planning => "Planning",
            Phase::Executing => "Executing",
            Phase::Critiquing => "Critiquing",
            Phase::Refining => "Refining",
            Phase::Complete => "Complete",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Planning => write!(f, "planning"),
            Phase::Executing => write!(f, "executing"),
            Phase::Critiquing => write!(f, "critiquing"),
            Phase::Refining => write!(f, "refining"),
            Phase::Complete => write!(f, "complete"),
        }
    }
}

impl std::str::FromStr for Phase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|p| p.to_string() == s.to_lowercase())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid phase '{}'. Valid values: idle, planning, executing, critiquing, refining, complete",
                    s
                )
            })
    }
}

/// A pipeline role that may be enabled or disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageType {
    Planner,
    Executor,
    Critic,
    Refiner,
}

impl StageType {
    /// Stages in the fixed order a run visits them.
    pub const PIPELINE: [StageType; 4] = [
        StageType::Planner,
        StageType::Executor,
        StageType::Critic,
        StageType::Refiner,
    ];

    /// The phase this stage publishes while it works.
    pub fn phase(self) -> Phase {
        match self {
            StageType::Planner => Phase::Planning,
            StageType::Executor => Phase::Executing,
            StageType::Critic => Phase::Critiquing,
            StageType::Refiner => Phase::Refining,
        }
    }

    /// Display name from the agent library.
    pub fn display_name(self) -> &'static str {
        match self {
            StageType::Planner => "Planner",
            StageType::Executor => "Executor",
            StageType::Critic => "Critic",
            StageType::Refiner => "Refiner",
        }
    }

    /// One-line description from the agent library.
    pub fn description(self) -> &'static str {
        match self {
            StageType::Planner => "Breaks down goals into sub-tasks",
            StageType::Executor => "Executes each sub-task",
            StageType::Critic => "Evaluates and critiques outputs",
            StageType::Refiner => "Improves based on feedback",
        }
    }
}

impl std::fmt::Display for StageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageType::Planner => write!(f, "planner"),
            StageType::Executor => write!(f, "executor"),
            StageType::Critic => write!(f, "critic"),
            StageType::Refiner => write!(f, "refiner"),
        }
    }
}

impl std::str::FromStr for StageType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planner" | "plan" => Ok(StageType::Planner),
            "executor" | "execute" => Ok(StageType::Executor),
            "critic" | "critique" => Ok(StageType::Critic),
            "refiner" | "refine" => Ok(StageType::Refiner),
            _ => anyhow::bail!(
                "Invalid stage '{}'. Valid values: planner, executor, critic, refiner",
                s
            ),
        }
    }
}
