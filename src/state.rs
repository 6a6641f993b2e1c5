//! Observable state of the sequencer.
//!
//! `RunState` holds what the current run has revealed so far. `Snapshot` wraps it
//! with the session-level fields (processing flag, skipped stages, memory, stage
//! configuration) and is what subscribers receive after every change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::payload::{
    CriticOutput, ExecutorOutput, PlannerOutput, RefinementOutput, TaskStatus,
};
use crate::phase::{Phase, StageType};
use crate::workflow::StageConfig;

/// Result summary recorded for every completed run.
pub const COMPLETED_SUMMARY: &str = "Completed successfully";

/// Everything one run has revealed so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub goal: String,
    pub phase: Phase,
    pub planner_output: Option<PlannerOutput>,
    pub executor_outputs: Vec<ExecutorOutput>,
    pub critic_output: Option<CriticOutput>,
    pub refinement_output: Option<RefinementOutput>,
}

impl RunState {
    /// Fresh state for a newly submitted goal.
    pub fn for_goal(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            ..Default::default()
        }
    }

    /// Whether this is the untouched initial state.
    pub fn is_initial(&self) -> bool {
        *self == Self::default()
    }

    /// Executor progress derived from subtask statuses.
    pub fn executor_progress(&self) -> ExecutorProgress {
        let mut progress = ExecutorProgress::default();
        if let Some(plan) = &self.planner_output {
            progress.total = plan.sub_tasks.len();
            for (idx, task) in plan.sub_tasks.iter().enumerate() {
                match task.status {
                    TaskStatus::Completed => progress.completed += 1,
                    TaskStatus::Active => {
                        progress.active.get_or_insert(idx);
                        progress.active_count += 1;
                    }
                    TaskStatus::Pending => {}
                }
            }
        }
        progress
    }
}

/// Counts of subtask statuses during execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorProgress {
    pub total: usize,
    pub completed: usize,
    /// Index of the first active subtask.
    pub active: Option<usize>,
    pub active_count: usize,
}

impl ExecutorProgress {
    /// At most one task is active, every task before it is completed and every
    /// task after it is pending. Holds at every point of an executor stage.
    pub fn is_lockstep(&self, plan: &PlannerOutput) -> bool {
        if self.active_count > 1 {
            return false;
        }
        let boundary = self.active.unwrap_or(self.completed);
        plan.sub_tasks.iter().enumerate().all(|(idx, task)| {
            let expected = match idx.cmp(&boundary) {
                std::cmp::Ordering::Less => TaskStatus::Completed,
                std::cmp::Ordering::Equal if self.active.is_some() => TaskStatus::Active,
                _ => TaskStatus::Pending,
            };
            task.status == expected
        })
    }
}

/// Record of one completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub goal: String,
    pub result: String,
    pub phase: Phase,
}

impl MemoryEntry {
    pub fn completed(goal: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            goal: goal.into(),
            result: COMPLETED_SUMMARY.to_string(),
            phase: Phase::Complete,
        }
    }

    /// Local wall-clock time for display.
    pub fn time_label(&self) -> String {
        self.timestamp
            .with_timezone(&chrono::Local)
            .format("%H:%M:%S")
            .to_string()
    }
}

/// Session history, most recent entry first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Memory {
    entries: Vec<MemoryEntry>,
}

impl Memory {
    pub fn record(&mut self, entry: MemoryEntry) {
        self.entries.insert(0, entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&MemoryEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Published view of the sequencer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Run generation; bumped by every accepted submit and every reset.
    pub generation: u64,
    pub run: RunState,
    pub is_processing: bool,
    pub skipped_stages: Vec<StageType>,
    pub memory: Memory,
    pub stages: Vec<StageConfig>,
}

impl Snapshot {
    pub fn phase(&self) -> Phase {
        self.run.phase
    }

    /// A run finished and nothing is in flight.
    pub fn is_settled(&self) -> bool {
        !self.is_processing && self.run.phase.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::SubTask;

    fn plan(statuses: &[TaskStatus]) -> PlannerOutput {
        PlannerOutput {
            reasoning: String::new(),
            sub_tasks: statuses
                .iter()
                .enumerate()
                .map(|(i, s)| SubTask {
                    id: i as u32 + 1,
                    title: format!("task {}", i + 1),
                    status: *s,
                })
                .collect(),
        }
    }

    fn progress_of(plan: &PlannerOutput) -> ExecutorProgress {
        RunState {
            planner_output: Some(plan.clone()),
            ..Default::default()
        }
        .executor_progress()
    }

    #[test]
    fn test_for_goal_resets_everything_but_goal() {
        let state = RunState::for_goal("do a thing");
        assert_eq!(state.goal, "do a thing");
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.planner_output.is_none());
        assert!(state.executor_outputs.is_empty());
        assert!(!state.is_initial());
        assert!(RunState::default().is_initial());
    }

    #[test]
    fn test_lockstep_accepts_valid_shapes() {
        use TaskStatus::*;
        for statuses in [
            vec![Pending, Pending, Pending],
            vec![Active, Pending, Pending],
            vec![Completed, Active, Pending],
            vec![Completed, Completed, Pending],
            vec![Completed, Completed, Completed],
        ] {
            let plan = plan(&statuses);
            assert!(progress_of(&plan).is_lockstep(&plan), "{:?}", statuses);
        }
    }

    #[test]
    fn test_lockstep_rejects_invalid_shapes() {
        use TaskStatus::*;
        for statuses in [
            vec![Active, Active, Pending],
            vec![Pending, Active, Pending],
            vec![Completed, Pending, Completed],
            vec![Active, Completed, Pending],
        ] {
            let plan = plan(&statuses);
            assert!(!progress_of(&plan).is_lockstep(&plan), "{:?}", statuses);
        }
    }

    #[test]
    fn test_executor_progress_counts() {
        use TaskStatus::*;
        let progress = progress_of(&plan(&[Completed, Active, Pending, Pending]));
        assert_eq!(progress.total, 4);
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.active, Some(1));
    }

    #[test]
    fn test_memory_is_most_recent_first() {
        let mut memory = Memory::default();
        memory.record(MemoryEntry::completed("first"));
        memory.record(MemoryEntry::completed("second"));
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.latest().unwrap().goal, "second");
        assert_eq!(memory.entries()[1].goal, "first");
        assert_ne!(memory.entries()[0].id, memory.entries()[1].id);

        memory.clear();
        assert!(memory.is_empty());
    }

    #[test]
    fn test_memory_entry_completed_fields() {
        let entry = MemoryEntry::completed("goal");
        assert_eq!(entry.result, COMPLETED_SUMMARY);
        assert_eq!(entry.phase, Phase::Complete);
        assert_eq!(entry.time_label().len(), 8);
    }

    #[test]
    fn test_snapshot_settled() {
        let mut snap = Snapshot::default();
        assert!(!snap.is_settled());
        snap.run.phase = Phase::Complete;
        assert!(snap.is_settled());
        snap.is_processing = true;
        assert!(!snap.is_settled());
    }
}
