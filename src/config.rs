//! Configuration for agentflow, read from `agentflow.toml`.
//!
//! Settings are layered file → environment → CLI. The file is optional; every
//! field has a default, so an empty or missing file behaves like this one:
//!
//! ```toml
//! [timing]
//! phase_delay_ms = 1500
//! task_delay_ms = 800
//!
//! [classifier]
//! internship_keywords = ["internship", "fake", "legitimate"]
//! ```
//!
//! Lookup order when no path is given explicitly: `./agentflow.toml`, then
//! `<config dir>/agentflow/agentflow.toml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classify::{DEFAULT_INTERNSHIP_KEYWORDS, KeywordClassifier};
use crate::errors::ConfigError;

pub const CONFIG_FILE_NAME: &str = "agentflow.toml";
pub const PHASE_DELAY_ENV: &str = "AGENTFLOW_PHASE_DELAY_MS";
pub const TASK_DELAY_ENV: &str = "AGENTFLOW_TASK_DELAY_MS";

/// Delays between simulated agent steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Delay on entering a phase, in milliseconds
    #[serde(default = "default_phase_delay_ms")]
    pub phase_delay_ms: u64,
    /// Base delay per revealed item, in milliseconds
    #[serde(default = "default_task_delay_ms")]
    pub task_delay_ms: u64,
}

fn default_phase_delay_ms() -> u64 {
    1500
}

fn default_task_delay_ms() -> u64 {
    800
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            phase_delay_ms: default_phase_delay_ms(),
            task_delay_ms: default_task_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Substrings that route a goal to the internship payloads
    #[serde(default = "default_internship_keywords")]
    pub internship_keywords: Vec<String>,
}

fn default_internship_keywords() -> Vec<String> {
    DEFAULT_INTERNSHIP_KEYWORDS
        .iter()
        .map(|k| k.to_string())
        .collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            internship_keywords: default_internship_keywords(),
        }
    }
}

/// Root of `agentflow.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentflowToml {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl AgentflowToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse agentflow.toml")
    }

    /// Load `agentflow.toml` from a directory, or return defaults if absent.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize agentflow.toml")
    }

    /// Find and load the effective configuration file.
    ///
    /// Returns the path that was loaded, or `None` when defaults were used.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
        let user_dir = dirs::config_dir().map(|d| d.join("agentflow"));
        Self::discover_in(explicit, &cwd, user_dir.as_deref())
    }

    /// `discover` with the search directories supplied by the caller.
    pub fn discover_in(
        explicit: Option<&Path>,
        cwd: &Path,
        user_dir: Option<&Path>,
    ) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        let candidates = std::iter::once(cwd.to_path_buf())
            .chain(user_dir.map(Path::to_path_buf))
            .map(|dir| dir.join(CONFIG_FILE_NAME));
        for path in candidates {
            if path.is_file() {
                return Ok((Self::load(&path)?, Some(path)));
            }
        }
        Ok((Self::default(), None))
    }

    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.classifier.internship_keywords.is_empty() {
            return Err(ConfigError::NoKeywords);
        }
        if self
            .classifier
            .internship_keywords
            .iter()
            .any(|k| k.trim().is_empty())
        {
            return Err(ConfigError::BlankKeyword);
        }
        Ok(())
    }

    /// Apply `AGENTFLOW_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ms) = parse_delay(&lookup, PHASE_DELAY_ENV)? {
            self.timing.phase_delay_ms = ms;
        }
        if let Some(ms) = parse_delay(&lookup, TASK_DELAY_ENV)? {
            self.timing.task_delay_ms = ms;
        }
        Ok(())
    }

    pub fn classifier(&self) -> KeywordClassifier {
        KeywordClassifier::new(&self.classifier.internship_keywords)
    }

    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig::from_millis(self.timing.phase_delay_ms, self.timing.task_delay_ms)
    }
}

fn parse_delay<F>(lookup: &F, var: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnvDelay {
            var: var.to_string(),
            value,
        })
}

/// Timing used by a `PhaseSequencer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerConfig {
    pub phase_delay: Duration,
    pub task_delay: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self::from_millis(default_phase_delay_ms(), default_task_delay_ms())
    }
}

impl SequencerConfig {
    pub fn from_millis(phase_delay_ms: u64, task_delay_ms: u64) -> Self {
        Self {
            phase_delay: Duration::from_millis(phase_delay_ms),
            task_delay: Duration::from_millis(task_delay_ms),
        }
    }

    /// No delays at all; runs complete as fast as the runtime schedules them.
    pub fn instant() -> Self {
        Self::from_millis(0, 0)
    }

    pub fn half_phase_delay(&self) -> Duration {
        self.phase_delay / 2
    }

    pub fn half_task_delay(&self) -> Duration {
        self.task_delay / 2
    }
}
