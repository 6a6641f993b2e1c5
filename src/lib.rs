pub mod classify;
pub mod config;
pub mod errors;
pub mod payload;
pub mod phase;
pub mod sequencer;
pub mod state;
pub mod ui;
pub mod workflow;

pub use classify::{GoalCategory, GoalClassifier, KeywordClassifier, classify_goal};
pub use config::{AgentflowToml, SequencerConfig};
pub use phase::{Phase, StageType};
pub use sequencer::{
    PhaseSequencer, RejectReason, RunHandle, RunOutcome, SequencerEvent, SubmitOutcome,
};
pub use state::{MemoryEntry, RunState, Snapshot};
pub use workflow::{StageConfig, Workflow};
