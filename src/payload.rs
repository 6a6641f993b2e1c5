//! Mock payloads played back by the sequencer.
//!
//! Each goal category owns one `PayloadBundle`: the planner's subtasks, one
//! executor output per subtask, the critic's review and the refiner's final
//! rewrite. The built-in bundles live in `payloads/*.toml` and are embedded in
//! the binary at compile time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::classify::GoalCategory;
use crate::errors::PayloadError;

/// Example goals offered to users, one per category.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExampleGoals {
    pub internship: &'static str,
    pub fibonacci: &'static str,
}

pub const EXAMPLE_GOALS: ExampleGoals = ExampleGoals {
    internship: "Analyze if this internship posting is fake or legitimate",
    fibonacci: "Write code to find the Fibonacci sequence of a given number",
};

/// Progress of a planned subtask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Active,
    Completed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Active => write!(f, "active"),
            TaskStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerOutput {
    pub reasoning: String,
    pub sub_tasks: Vec<SubTask>,
}

impl PlannerOutput {
    /// Copy of this plan with subtask statuses set for executor step `active`:
    /// earlier tasks completed, task `active` active, later tasks pending.
    pub fn with_active_task(&self, active: usize) -> Self {
        let mut plan = self.with_completed(active);
        if let Some(task) = plan.sub_tasks.get_mut(active) {
            task.status = TaskStatus::Active;
        }
        plan
    }

    /// Copy of this plan with the first `done` subtasks completed and the rest pending.
    pub fn with_completed(&self, done: usize) -> Self {
        let mut plan = self.clone();
        for (idx, task) in plan.sub_tasks.iter_mut().enumerate() {
            task.status = if idx < done {
                TaskStatus::Completed
            } else {
                TaskStatus::Pending
            };
        }
        plan
    }
}

/// Kind of content an executor produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Analysis,
    Code,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorOutput {
    pub task_id: u32,
    pub kind: OutputKind,
    pub result: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Pass,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CritiqueItem {
    pub id: u32,
    pub issue: String,
    pub severity: Severity,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticOutput {
    pub overall_score: u32,
    pub critiques: Vec<CritiqueItem>,
}

impl CriticOutput {
    /// Copy of this review with only the first `len` critiques revealed.
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            overall_score: self.overall_score,
            critiques: self.critiques[..len.min(self.critiques.len())].to_vec(),
        }
    }

    /// Count of critiques at the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.critiques
            .iter()
            .filter(|c| c.severity == severity)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementOutput {
    pub original: String,
    pub refined: String,
    pub improvements: Vec<String>,
}

/// Everything the four stages reveal for one goal category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadBundle {
    pub planner: PlannerOutput,
    pub executor: Vec<ExecutorOutput>,
    pub critic: CriticOutput,
    pub refinement: RefinementOutput,
}

impl PayloadBundle {
    /// Check the invariants the sequencer relies on.
    ///
    /// Executor outputs are paired with subtasks by index, so there can be no
    /// more outputs than subtasks.
    pub fn validate(&self) -> Result<(), PayloadError> {
        if self.executor.len() > self.planner.sub_tasks.len() {
            return Err(PayloadError::ExecutorOverflow {
                outputs: self.executor.len(),
                sub_tasks: self.planner.sub_tasks.len(),
            });
        }

        let mut seen = HashSet::new();
        for task in &self.planner.sub_tasks {
            if !seen.insert(task.id) {
                return Err(PayloadError::DuplicateSubTask(task.id));
            }
        }

        if self.critic.overall_score > 100 {
            return Err(PayloadError::ScoreOutOfRange(self.critic.overall_score));
        }

        Ok(())
    }
}

/// Source of payloads, keyed by goal category.
pub trait PayloadProvider: Send + Sync {
    fn payloads(&self, category: GoalCategory) -> Result<PayloadBundle, PayloadError>;
}

const INTERNSHIP_TOML: &str = include_str!("../payloads/internship.toml");
const FIBONACCI_TOML: &str = include_str!("../payloads/fibonacci.toml");

/// The payloads shipped with the crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinPayloads;

impl BuiltinPayloads {
    fn source(category: GoalCategory) -> &'static str {
        match category {
            GoalCategory::Internship => INTERNSHIP_TOML,
            GoalCategory::Fibonacci => FIBONACCI_TOML,
        }
    }

    fn cache(category: GoalCategory) -> &'static OnceLock<PayloadBundle> {
        static INTERNSHIP: OnceLock<PayloadBundle> = OnceLock::new();
        static FIBONACCI: OnceLock<PayloadBundle> = OnceLock::new();
        match category {
            GoalCategory::Internship => &INTERNSHIP,
            GoalCategory::Fibonacci => &FIBONACCI,
        }
    }
}

impl PayloadProvider for BuiltinPayloads {
    fn payloads(&self, category: GoalCategory) -> Result<PayloadBundle, PayloadError> {
        let cache = Self::cache(category);
        if let Some(bundle) = cache.get() {
            return Ok(bundle.clone());
        }

        let bundle = parse_bundle(category, Self::source(category))?;
        bundle.validate()?;
        Ok(cache.get_or_init(|| bundle).clone())
    }
}

/// Parse a payload bundle from TOML.
pub fn parse_bundle(category: GoalCategory, content: &str) -> Result<PayloadBundle, PayloadError> {
    toml::from_str(content).map_err(|source| PayloadError::Parse { category, source })
}

/// Provider backed by an explicit map, for callers that ship their own content.
#[derive(Debug, Default, Clone)]
pub struct StaticPayloads {
    bundles: Vec<(GoalCategory, PayloadBundle)>,
}

impl StaticPayloads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the bundle for a category, replacing any earlier one.
    pub fn with(mut self, category: GoalCategory, bundle: PayloadBundle) -> Self {
        self.bundles.retain(|(c, _)| *c != category);
        self.bundles.push((category, bundle));
        self
    }
}

impl PayloadProvider for StaticPayloads {
    fn payloads(&self, category: GoalCategory) -> Result<PayloadBundle, PayloadError> {
        self.bundles
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, b)| b.clone())
            .ok_or(PayloadError::UnknownCategory(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_bundles_parse_and_validate() {
        for category in GoalCategory::ALL {
            let bundle = BuiltinPayloads.payloads(category).unwrap();
            assert_eq!(bundle.planner.sub_tasks.len(), 4);
            assert_eq!(bundle.executor.len(), bundle.planner.sub_tasks.len());
            assert_eq!(bundle.critic.critiques.len(), 4);
            assert!(!bundle.refinement.improvements.is_empty());
        }
    }

    #[test]
    fn test_builtin_subtasks_start_pending() {
        let bundle = BuiltinPayloads.payloads(GoalCategory::Internship).unwrap();
        assert!(
            bundle
                .planner
                .sub_tasks
                .iter()
                .all(|t| t.status == TaskStatus::Pending)
        );
    }

    #[test]
    fn test_builtin_scores() {
        let internship = BuiltinPayloads.payloads(GoalCategory::Internship).unwrap();
        let fibonacci = BuiltinPayloads.payloads(GoalCategory::Fibonacci).unwrap();
        assert_eq!(internship.critic.overall_score, 65);
        assert_eq!(fibonacci.critic.overall_score, 70);
        assert_eq!(fibonacci.critic.count(Severity::Critical), 1);
        assert_eq!(fibonacci.executor[2].kind, OutputKind::Code);
    }

    #[test]
    fn test_with_active_task_statuses() {
        let bundle = BuiltinPayloads.payloads(GoalCategory::Fibonacci).unwrap();
        let plan = bundle.planner.with_active_task(2);
        let statuses: Vec<TaskStatus> = plan.sub_tasks.iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![
                TaskStatus::Completed,
                TaskStatus::Completed,
                TaskStatus::Active,
                TaskStatus::Pending
            ]
        );
    }

    #[test]
    fn test_with_completed_leaves_no_active_task() {
        let bundle = BuiltinPayloads.payloads(GoalCategory::Internship).unwrap();
        let plan = bundle.planner.with_completed(3);
        assert!(plan.sub_tasks[..3].iter().all(|t| t.status == TaskStatus::Completed));
        assert_eq!(plan.sub_tasks[3].status, TaskStatus::Pending);
        assert!(
            bundle
                .planner
                .with_completed(4)
                .sub_tasks
                .iter()
                .all(|t| t.status == TaskStatus::Completed)
        );
    }

    #[test]
    fn test_critic_prefix_clamps() {
        let bundle = BuiltinPayloads.payloads(GoalCategory::Internship).unwrap();
        assert_eq!(bundle.critic.prefix(0).critiques.len(), 0);
        assert_eq!(bundle.critic.prefix(2).critiques.len(), 2);
        assert_eq!(bundle.critic.prefix(99), bundle.critic);
    }

    #[test]
    fn test_validate_rejects_executor_overflow() {
        let mut bundle = BuiltinPayloads.payloads(GoalCategory::Internship).unwrap();
        bundle.planner.sub_tasks.pop();
        let err = bundle.validate().unwrap_err();
        assert!(matches!(
            err,
            PayloadError::ExecutorOverflow {
                outputs: 4,
                sub_tasks: 3
            }
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_ids_and_bad_score() {
        let mut bundle = BuiltinPayloads.payloads(GoalCategory::Internship).unwrap();
        bundle.planner.sub_tasks[1].id = bundle.planner.sub_tasks[0].id;
        assert!(matches!(
            bundle.validate(),
            Err(PayloadError::DuplicateSubTask(_))
        ));

        let mut bundle = BuiltinPayloads.payloads(GoalCategory::Fibonacci).unwrap();
        bundle.critic.overall_score = 101;
        assert!(matches!(
            bundle.validate(),
            Err(PayloadError::ScoreOutOfRange(101))
        ));
    }

    #[test]
    fn test_parse_bundle_reports_category() {
        let err = parse_bundle(GoalCategory::Fibonacci, "planner = 3").unwrap_err();
        assert!(err.to_string().contains("fibonacci"));
    }

    #[test]
    fn test_static_payloads_lookup() {
        let bundle = BuiltinPayloads.payloads(GoalCategory::Fibonacci).unwrap();
        let provider = StaticPayloads::new().with(GoalCategory::Fibonacci, bundle.clone());
        assert_eq!(provider.payloads(GoalCategory::Fibonacci).unwrap(), bundle);
        assert!(matches!(
            provider.payloads(GoalCategory::Internship),
            Err(PayloadError::UnknownCategory(GoalCategory::Internship))
        ));
    }
}
