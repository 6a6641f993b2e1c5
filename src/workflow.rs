//! Stage configuration for the agent pipeline.
//!
//! A `Workflow` is the ordered list of stages a user has placed in the pipeline.
//! Stages can be toggled, removed, re-added from the library and moved. The
//! phase order of a run never changes; disabling a stage only skips its work.

use serde::{Deserialize, Serialize};

use crate::errors::WorkflowError;
use crate::phase::{Phase, StageType};

/// One stage in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    pub id: String,
    pub stage_type: StageType,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub position: usize,
}

impl StageConfig {
    /// Library template for a stage type, enabled at the given position.
    pub fn template(stage_type: StageType, position: usize) -> Self {
        Self {
            id: stage_type.to_string(),
            stage_type,
            name: stage_type.display_name().to_string(),
            description: stage_type.description().to_string(),
            enabled: true,
            position,
        }
    }
}

/// A directed edge between two consecutive enabled stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConnection {
    pub from: String,
    pub to: String,
}

/// Display status of a stage relative to the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Waiting,
    Active,
    Complete,
}

impl StageStatus {
    pub fn for_stage(stage: StageType, current: Phase) -> Self {
        let stage_phase = stage.phase();
        if current == stage_phase {
            StageStatus::Active
        } else if current > stage_phase {
            StageStatus::Complete
        } else {
            StageStatus::Waiting
        }
    }
}

/// Ordered, editable list of pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workflow {
    stages: Vec<StageConfig>,
}

impl Default for Workflow {
    /// All four stages, enabled, in pipeline order.
    fn default() -> Self {
        Self {
            stages: StageType::PIPELINE
                .iter()
                .enumerate()
                .map(|(pos, ty)| StageConfig::template(*ty, pos))
                .collect(),
        }
    }
}

impl From<Vec<StageConfig>> for Workflow {
    fn from(stages: Vec<StageConfig>) -> Self {
        Self { stages }
    }
}

impl From<Workflow> for Vec<StageConfig> {
    fn from(workflow: Workflow) -> Self {
        workflow.stages
    }
}

impl Workflow {
    /// Default workflow with the given stage types disabled.
    pub fn with_disabled(disabled: &[StageType]) -> Self {
        let mut workflow = Self::default();
        for ty in disabled {
            workflow.set_enabled(*ty, false);
        }
        workflow
    }

    pub fn stages(&self) -> &[StageConfig] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Whether a stage of this type is present and enabled.
    pub fn is_enabled(&self, stage_type: StageType) -> bool {
        self.stages
            .iter()
            .any(|s| s.stage_type == stage_type && s.enabled)
    }

    pub fn has_enabled(&self) -> bool {
        self.stages.iter().any(|s| s.enabled)
    }

    /// Enabled stages sorted by position.
    pub fn enabled_in_order(&self) -> Vec<&StageConfig> {
        let mut enabled: Vec<&StageConfig> = self.stages.iter().filter(|s| s.enabled).collect();
        enabled.sort_by_key(|s| s.position);
        enabled
    }

    /// Stage types from the library not yet in the workflow.
    pub fn available_types(&self) -> Vec<StageType> {
        StageType::PIPELINE
            .into_iter()
            .filter(|ty| !self.stages.iter().any(|s| s.stage_type == *ty))
            .collect()
    }

    /// Edges between consecutive enabled stages.
    pub fn connections(&self) -> Vec<StageConnection> {
        self.enabled_in_order()
            .windows(2)
            .map(|pair| StageConnection {
                from: pair[0].id.clone(),
                to: pair[1].id.clone(),
            })
            .collect()
    }

    /// Flip the enabled flag of the stage with this id.
    pub fn toggle(&mut self, id: &str) -> Result<bool, WorkflowError> {
        let stage = self.find_mut(id)?;
        stage.enabled = !stage.enabled;
        Ok(stage.enabled)
    }

    /// Enable or disable every stage of a type. Returns false if none is present.
    pub fn set_enabled(&mut self, stage_type: StageType, enabled: bool) -> bool {
        let mut found = false;
        for stage in self.stages.iter_mut().filter(|s| s.stage_type == stage_type) {
            stage.enabled = enabled;
            found = true;
        }
        found
    }

    /// Remove a stage and close the gap in positions.
    pub fn remove(&mut self, id: &str) -> Result<StageConfig, WorkflowError> {
        let idx = self
            .stages
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| WorkflowError::StageNotFound(id.to_string()))?;
        let removed = self.stages.remove(idx);
        self.renumber();
        Ok(removed)
    }

    /// Add a stage from the library at the end of the pipeline.
    ///
    /// Each stage type may appear once. The new stage gets a fresh id so it never
    /// collides with one that was removed earlier.
    pub fn add(&mut self, stage_type: StageType) -> Result<&StageConfig, WorkflowError> {
        if self.stages.iter().any(|s| s.stage_type == stage_type) {
            return Err(WorkflowError::AlreadyPresent(stage_type));
        }

        let mut stage = StageConfig::template(stage_type, self.stages.len());
        let mut suffix = 1;
        while self.stages.iter().any(|s| s.id == stage.id) {
            stage.id = format!("{}-{}", stage_type, suffix);
            suffix += 1;
        }
        self.stages.push(stage);
        Ok(&self.stages[self.stages.len() - 1])
    }

    /// Move a stage to a new position, shifting the others.
    pub fn move_stage(&mut self, id: &str, position: usize) -> Result<(), WorkflowError> {
        if position >= self.stages.len() {
            return Err(WorkflowError::PositionOutOfRange {
                position,
                len: self.stages.len(),
            });
        }

        self.stages.sort_by_key(|s| s.position);
        let idx = self
            .stages
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| WorkflowError::StageNotFound(id.to_string()))?;
        let stage = self.stages.remove(idx);
        self.stages.insert(position, stage);
        self.renumber();
        Ok(())
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut StageConfig, WorkflowError> {
        self.stages
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| WorkflowError::StageNotFound(id.to_string()))
    }

    fn renumber(&mut self) {
        self.stages.sort_by_key(|s| s.position);
        for (pos, stage) in self.stages.iter_mut().enumerate() {
            stage.position = pos;
        }
    }
}
