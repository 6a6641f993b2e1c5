//! The phase sequencer.
//!
//! A `PhaseSequencer` walks a submitted goal through planning, executing,
//! critiquing and refining, revealing mock payloads a piece at a time with
//! delays in between. State is published as a `Snapshot` on a watch channel;
//! an optional mpsc channel carries a structured event per step.
//!
//! Every run carries the generation it was started with. Each mutation it
//! makes is applied under the watch lock only if that generation is still
//! current, so a `reset()` or a newer run turns an older run into a no-op.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::classify::{GoalCategory, GoalClassifier, KeywordClassifier};
use crate::config::SequencerConfig;
use crate::errors::{PayloadError, RunError};
use crate::payload::{
    BuiltinPayloads, CriticOutput, CritiqueItem, EXAMPLE_GOALS, ExampleGoals, ExecutorOutput,
    PayloadProvider, PlannerOutput, RefinementOutput, SubTask, TaskStatus,
};
use crate::phase::{Phase, StageType};
use crate::state::{MemoryEntry, RunState, Snapshot};
use crate::workflow::{StageConfig, Workflow};

/// Events emitted while a run progresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SequencerEvent {
    /// A goal was accepted and classified.
    RunStarted {
        generation: u64,
        goal: String,
        category: GoalCategory,
    },
    /// A stage started working.
    PhaseEntered { generation: u64, phase: Phase },
    /// A disabled stage was bypassed.
    StageSkipped { generation: u64, stage: StageType },
    /// The planner revealed a subtask.
    TaskRevealed { generation: u64, task: SubTask },
    /// The executor started a subtask.
    TaskStarted { generation: u64, task_id: u32 },
    /// The executor finished a subtask.
    TaskCompleted {
        generation: u64,
        output: ExecutorOutput,
    },
    /// The critic revealed a critique.
    CritiqueRevealed {
        generation: u64,
        critique: CritiqueItem,
    },
    /// The critic finished its review.
    ReviewScored { generation: u64, overall_score: u32 },
    /// The refiner produced its final output.
    RefinementApplied {
        generation: u64,
        improvements: usize,
    },
    /// The run reached `complete` and was recorded in memory.
    RunCompleted { generation: u64, entry: MemoryEntry },
    /// The run stopped on an error.
    RunFailed { generation: u64, error: String },
}

/// Why a submitted goal was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    EmptyGoal,
    AlreadyProcessing,
    NoStagesEnabled,
    NoRuntime,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::EmptyGoal => write!(f, "goal is empty"),
            RejectReason::AlreadyProcessing => write!(f, "a run is already in progress"),
            RejectReason::NoStagesEnabled => write!(f, "no stages are enabled"),
            RejectReason::NoRuntime => write!(f, "no Tokio runtime is available"),
        }
    }
}

/// Result of `submit_goal`.
#[derive(Debug)]
pub enum SubmitOutcome {
    Started(RunHandle),
    Rejected(RejectReason),
}

impl SubmitOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, SubmitOutcome::Started(_))
    }

    pub fn handle(self) -> Option<RunHandle> {
        match self {
            SubmitOutcome::Started(handle) => Some(handle),
            SubmitOutcome::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<RejectReason> {
        match self {
            SubmitOutcome::Started(_) => None,
            SubmitOutcome::Rejected(reason) => Some(*reason),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Reached `complete`; the entry was prepended to memory.
    Completed(MemoryEntry),
    /// A reset or a newer run took over before this one finished.
    Superseded,
    /// The run stopped on an error.
    Failed(String),
}

/// Handle to a running goal. Dropping it leaves the run going.
#[derive(Debug)]
pub struct RunHandle {
    generation: u64,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end.
    pub async fn wait(self) -> RunOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(join_err) => {
                let err = RunError::Panicked(join_err.to_string());
                error!(generation = self.generation, error = %err, "Run task aborted");
                RunOutcome::Failed(err.to_string())
            }
        }
    }
}

/// Drives goals through the pipeline and publishes state.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct PhaseSequencer {
    config: SequencerConfig,
    classifier: Arc<dyn GoalClassifier>,
    payloads: Arc<dyn PayloadProvider>,
    event_tx: Option<mpsc::Sender<SequencerEvent>>,
    state: Arc<watch::Sender<Snapshot>>,
}

impl std::fmt::Debug for PhaseSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseSequencer")
            .field("config", &self.config)
            .field("snapshot", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl Default for PhaseSequencer {
    fn default() -> Self {
        Self::new(SequencerConfig::default())
    }
}

impl PhaseSequencer {
    /// Create a sequencer with the default classifier, built-in payloads and
    /// all four stages enabled.
    pub fn new(config: SequencerConfig) -> Self {
        let initial = Snapshot {
            stages: Workflow::default().into(),
            ..Default::default()
        };
        let (state, _) = watch::channel(initial);
        Self {
            config,
            classifier: Arc::new(KeywordClassifier::default()),
            payloads: Arc::new(BuiltinPayloads),
            event_tx: None,
            state: Arc::new(state),
        }
    }

    pub fn with_classifier(mut self, classifier: impl GoalClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn with_payloads(mut self, payloads: impl PayloadProvider + 'static) -> Self {
        self.payloads = Arc::new(payloads);
        self
    }

    /// Set the event channel for progress updates.
    pub fn with_event_channel(mut self, tx: mpsc::Sender<SequencerEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn with_stages(self, stages: impl Into<Vec<StageConfig>>) -> Self {
        self.set_stages(stages);
        self
    }

    pub fn config(&self) -> SequencerConfig {
        self.config
    }

    /// Accept a goal and start a run in the background.
    ///
    /// Returns immediately. The goal is rejected without any state change when
    /// it is blank, when a run is already in progress, or when no stage is
    /// enabled. Must be called from within a Tokio runtime.
    pub fn submit_goal(&self, goal: impl Into<String>) -> SubmitOutcome {
        let goal = goal.into();
        if goal.trim().is_empty() {
            debug!("Rejected blank goal");
            return SubmitOutcome::Rejected(RejectReason::EmptyGoal);
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("Rejected goal: no Tokio runtime");
            return SubmitOutcome::Rejected(RejectReason::NoRuntime);
        };

        let mut verdict = Err(RejectReason::AlreadyProcessing);
        self.state.send_if_modified(|snap| {
            if snap.is_processing {
                return false;
            }
            let stages = Workflow::from(snap.stages.clone());
            if !stages.has_enabled() {
                verdict = Err(RejectReason::NoStagesEnabled);
                return false;
            }
            snap.generation += 1;
            snap.run = RunState::for_goal(goal.clone());
            snap.skipped_stages.clear();
            snap.is_processing = true;
            verdict = Ok((snap.generation, stages));
            true
        });

        let (generation, stages) = match verdict {
            Ok(started) => started,
            Err(reason) => {
                debug!(%reason, "Rejected goal");
                return SubmitOutcome::Rejected(reason);
            }
        };

        let guard = ProcessingGuard {
            state: Arc::clone(&self.state),
            generation,
        };
        let span = info_span!("run", generation, goal = %goal);
        let run = Run {
            sequencer: self.clone(),
            generation,
            goal,
            stages,
        };
        let task = runtime.spawn(
            async move {
                let _guard = guard;
                run.execute().await
            }
            .instrument(span),
        );

        SubmitOutcome::Started(RunHandle { generation, task })
    }

    /// Return to the initial idle state. Any run in flight becomes a no-op.
    pub fn reset(&self) {
        self.state.send_modify(|snap| {
            snap.generation += 1;
            snap.run = RunState::default();
            snap.skipped_stages.clear();
            snap.is_processing = false;
        });
        info!(generation = self.generation(), "Sequencer reset");
    }

    /// Empty the memory of completed runs.
    pub fn clear_history(&self) {
        self.state.send_modify(|snap| snap.memory.clear());
        debug!("Memory cleared");
    }

    /// Replace the stage configuration used by the next run.
    pub fn set_stages(&self, stages: impl Into<Vec<StageConfig>>) {
        let stages = stages.into();
        self.state.send_modify(|snap| snap.stages = stages);
    }

    pub fn classify_goal(&self, goal: &str) -> GoalCategory {
        self.classifier.classify(goal)
    }

    pub fn example_goals(&self) -> ExampleGoals {
        EXAMPLE_GOALS
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    pub fn run_state(&self) -> RunState {
        self.state.borrow().run.clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().run.phase
    }

    pub fn is_processing(&self) -> bool {
        self.state.borrow().is_processing
    }

    pub fn skipped_stages(&self) -> Vec<StageType> {
        self.state.borrow().skipped_stages.clone()
    }

    pub fn memory(&self) -> Vec<MemoryEntry> {
        self.state.borrow().memory.entries().to_vec()
    }

    pub fn stages(&self) -> Workflow {
        Workflow::from(self.state.borrow().stages.clone())
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }
}

/// Clears `is_processing` when a run task ends without completing, including
/// by panic, unless a newer generation has taken over.
struct ProcessingGuard {
    state: Arc<watch::Sender<Snapshot>>,
    generation: u64,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        let generation = self.generation;
        self.state.send_if_modified(|snap| {
            if snap.generation == generation && snap.is_processing {
                snap.is_processing = false;
                true
            } else {
                false
            }
        });
    }
}

/// Why a run stopped early.
enum Halt {
    Superseded,
    Failed(RunError),
}

impl From<RunError> for Halt {
    fn from(err: RunError) -> Self {
        Halt::Failed(err)
    }
}

impl From<PayloadError> for Halt {
    fn from(err: PayloadError) -> Self {
        Halt::Failed(err.into())
    }
}

/// One accepted goal working through the pipeline.
struct Run {
    sequencer: PhaseSequencer,
    generation: u64,
    goal: String,
    stages: Workflow,
}

impl Run {
    async fn execute(self) -> RunOutcome {
        match self.drive().await {
            Ok(entry) => RunOutcome::Completed(entry),
            Err(Halt::Superseded) => {
                warn!("Run superseded, dropping remaining steps");
                RunOutcome::Superseded
            }
            Err(Halt::Failed(err)) => {
                error!(error = %err, "Run failed");
                self.emit(SequencerEvent::RunFailed {
                    generation: self.generation,
                    error: err.to_string(),
                })
                .await;
                RunOutcome::Failed(err.to_string())
            }
        }
    }

    async fn drive(&self) -> Result<MemoryEntry, Halt> {
        let category = self.sequencer.classifier.classify(&self.goal);
        info!(%category, "Run started");
        self.emit(SequencerEvent::RunStarted {
            generation: self.generation,
            goal: self.goal.clone(),
            category,
        })
        .await;

        let bundle = self.sequencer.payloads.payloads(category)?;
        bundle.validate()?;

        for stage in StageType::PIPELINE {
            if !self.stages.is_enabled(stage) {
                self.commit(|snap| {
                    snap.skipped_stages.push(stage);
                    Ok(())
                })?;
                info!(%stage, "Stage skipped");
                self.emit(SequencerEvent::StageSkipped {
                    generation: self.generation,
                    stage,
                })
                .await;
                continue;
            }

            self.enter(stage.phase()).await?;
            match stage {
                StageType::Planner => self.plan(&bundle.planner).await?,
                StageType::Executor => self.execute_tasks(&bundle.planner, &bundle.executor).await?,
                StageType::Critic => self.critique(&bundle.critic).await?,
                StageType::Refiner => self.refine(&bundle.refinement).await?,
            }
        }

        self.complete().await
    }

    async fn plan(&self, plan: &PlannerOutput) -> Result<(), Halt> {
        self.pause(self.sequencer.config.phase_delay).await;

        if plan.sub_tasks.is_empty() {
            let revealed = plan.clone();
            return self.commit(|snap| {
                snap.run.planner_output = Some(revealed);
                Ok(())
            });
        }

        let mut revealed = PlannerOutput {
            reasoning: plan.reasoning.clone(),
            sub_tasks: Vec::with_capacity(plan.sub_tasks.len()),
        };
        for task in &plan.sub_tasks {
            let task = SubTask {
                status: TaskStatus::Pending,
                ..task.clone()
            };
            revealed.sub_tasks.push(task.clone());
            let published = revealed.clone();
            self.commit(|snap| {
                snap.run.planner_output = Some(published);
                Ok(())
            })?;
            debug!(task_id = task.id, title = %task.title, "Task revealed");
            self.emit(SequencerEvent::TaskRevealed {
                generation: self.generation,
                task,
            })
            .await;
            self.pause(self.sequencer.config.half_task_delay()).await;
        }
        Ok(())
    }

    /// Outputs are paired with subtasks by index. Subtask statuses are
    /// published even when the planner stage was skipped.
    async fn execute_tasks(
        &self,
        plan: &PlannerOutput,
        outputs: &[ExecutorOutput],
    ) -> Result<(), Halt> {
        self.pause(self.sequencer.config.half_phase_delay()).await;

        for (index, output) in outputs.iter().enumerate() {
            let task_id = plan
                .sub_tasks
                .get(index)
                .map(|t| t.id)
                .ok_or(RunError::MissingSubTask {
                    index,
                    available: plan.sub_tasks.len(),
                })?;

            let active = plan.with_active_task(index);
            self.commit(|snap| {
                snap.run.planner_output = Some(active);
                Ok(())
            })?;
            debug!(task_id, "Task started");
            self.emit(SequencerEvent::TaskStarted {
                generation: self.generation,
                task_id,
            })
            .await;

            self.pause(self.sequencer.config.task_delay).await;

            let done = plan.with_completed(index + 1);
            let result = output.clone();
            self.commit(|snap| {
                snap.run.executor_outputs.push(result);
                snap.run.planner_output = Some(done);
                Ok(())
            })?;
            debug!(task_id, kind = ?output.kind, "Task completed");
            self.emit(SequencerEvent::TaskCompleted {
                generation: self.generation,
                output: output.clone(),
            })
            .await;
        }
        Ok(())
    }

    async fn critique(&self, critic: &CriticOutput) -> Result<(), Halt> {
        self.pause(self.sequencer.config.phase_delay).await;

        for (index, item) in critic.critiques.iter().enumerate() {
            let revealed = critic.prefix(index + 1);
            self.commit(|snap| {
                snap.run.critic_output = Some(revealed);
                Ok(())
            })?;
            debug!(critique_id = item.id, severity = ?item.severity, "Critique revealed");
            self.emit(SequencerEvent::CritiqueRevealed {
                generation: self.generation,
                critique: item.clone(),
            })
            .await;
            self.pause(self.sequencer.config.half_task_delay()).await;
        }

        let full = critic.clone();
        self.commit(|snap| {
            snap.run.critic_output = Some(full);
            Ok(())
        })?;
        self.emit(SequencerEvent::ReviewScored {
            generation: self.generation,
            overall_score: critic.overall_score,
        })
        .await;
        Ok(())
    }

    async fn refine(&self, refinement: &RefinementOutput) -> Result<(), Halt> {
        self.pause(self.sequencer.config.phase_delay).await;

        let output = refinement.clone();
        self.commit(|snap| {
            snap.run.refinement_output = Some(output);
            Ok(())
        })?;
        debug!(
            improvements = refinement.improvements.len(),
            "Refinement applied"
        );
        self.emit(SequencerEvent::RefinementApplied {
            generation: self.generation,
            improvements: refinement.improvements.len(),
        })
        .await;

        self.pause(self.sequencer.config.phase_delay).await;
        Ok(())
    }

    /// Move to `complete`, record the run and clear `is_processing` in one update.
    async fn complete(&self) -> Result<MemoryEntry, Halt> {
        let mut recorded = None;
        self.commit(|snap| {
            advance(&mut snap.run, Phase::Complete)?;
            let entry = MemoryEntry::completed(snap.run.goal.clone());
            snap.memory.record(entry.clone());
            snap.is_processing = false;
            recorded = Some(entry);
            Ok(())
        })?;
        let Some(entry) = recorded else {
            return Err(Halt::Superseded);
        };

        info!(entry_id = %entry.id, "Run completed");
        self.emit(SequencerEvent::RunCompleted {
            generation: self.generation,
            entry: entry.clone(),
        })
        .await;
        Ok(entry)
    }

    async fn enter(&self, phase: Phase) -> Result<(), Halt> {
        self.commit(|snap| advance(&mut snap.run, phase))?;
        info!(%phase, "Phase entered");
        self.emit(SequencerEvent::PhaseEntered {
            generation: self.generation,
            phase,
        })
        .await;
        Ok(())
    }

    /// Apply a mutation if this run is still current.
    ///
    /// The generation check and the mutation happen under the same lock. The
    /// mutation must validate before it writes anything.
    fn commit<F>(&self, mutate: F) -> Result<(), Halt>
    where
        F: FnOnce(&mut Snapshot) -> Result<(), RunError>,
    {
        let mut outcome = Err(Halt::Superseded);
        self.sequencer.state.send_if_modified(|snap| {
            if snap.generation != self.generation {
                return false;
            }
            match mutate(snap) {
                Ok(()) => {
                    outcome = Ok(());
                    true
                }
                Err(err) => {
                    outcome = Err(Halt::Failed(err));
                    false
                }
            }
        });
        outcome
    }

    async fn pause(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }

    async fn emit(&self, event: SequencerEvent) {
        if let Some(ref tx) = self.sequencer.event_tx {
            tx.send(event).await.ok();
        }
    }
}

/// Phases only move forward within a run.
fn advance(run: &mut RunState, to: Phase) -> Result<(), RunError> {
    if to < run.phase {
        return Err(RunError::PhaseRegression {
            from: run.phase,
            to,
        });
    }
    run.phase = to;
    Ok(())
}
