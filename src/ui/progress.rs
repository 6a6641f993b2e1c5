//! Live progress display for a pipeline run.
//!
//! Supports three output modes:
//! - `full`: stage bar and task spinner, with a line per step
//! - `minimal`: one line per stage and a final status line
//! - `json`: every `SequencerEvent` as a JSON line, for machine consumption

use console::{Term, style};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::Write;
use std::time::Duration;

use crate::phase::Phase;
use crate::sequencer::SequencerEvent;
use crate::ui::icons::{CHECK, CLOCK, CROSS, SKIP, SPARKLE, severity_icon, stage_icon};
use crate::ui::render::format_duration;

/// Output mode for the pipeline UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    /// Progress bars and per-step lines
    #[default]
    Full,
    /// One line per stage
    Minimal,
    /// JSON-formatted events
    Json,
}

impl std::str::FromStr for UiMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "minimal" => Self::Minimal,
            _ => Self::Full,
        })
    }
}

impl UiMode {
    /// Parse UI mode from string, falling back to `Full`.
    pub fn parse(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

/// Terminal UI for one sequencer run.
///
/// Two bars are stacked: the stage bar counts enabled stages that have
/// started, the task spinner shows the step currently in progress. Events are
/// handled from a single task in arrival order.
pub struct PipelineUI {
    mode: UiMode,
    multi: MultiProgress,
    stage_bar: ProgressBar,
    task_bar: ProgressBar,
    verbose: bool,
    term: Term,
}

impl PipelineUI {
    /// Create the UI sized for the number of enabled stages.
    pub fn new(enabled_stages: usize, mode: UiMode, verbose: bool) -> Self {
        let multi = if mode == UiMode::Full {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let stage_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");
        let stage_bar = multi.add(ProgressBar::new(enabled_stages as u64));
        stage_bar.set_style(stage_style);
        stage_bar.set_prefix("Stages");
        stage_bar.set_message(Phase::Idle.label());

        let task_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg}")
            .expect("progress bar template is a valid static string");
        let task_bar = multi.add(ProgressBar::new_spinner());
        task_bar.set_style(task_style);
        task_bar.set_prefix("  Step");

        Self {
            mode,
            multi,
            stage_bar,
            task_bar,
            verbose,
            term: Term::stdout(),
        }
    }

    pub fn mode(&self) -> UiMode {
        self.mode
    }

    /// Print above the bars, or straight to stdout when the bars are hidden.
    pub fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.is_hidden() || self.multi.println(msg.as_ref()).is_err() {
            let _ = writeln!(&self.term, "{}", msg.as_ref());
        }
    }

    /// Handle a SequencerEvent and update the UI accordingly.
    pub fn handle_event(&self, event: &SequencerEvent) {
        match self.mode {
            UiMode::Json => self.handle_json(event),
            UiMode::Minimal => self.handle_minimal(event),
            UiMode::Full => self.handle_full(event),
        }
    }

    fn handle_json(&self, event: &SequencerEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(&self.term, "{}", json);
        }
    }

    fn handle_minimal(&self, event: &SequencerEvent) {
        match event {
            SequencerEvent::PhaseEntered { phase, .. } => {
                self.print_line(format!("> {}", phase));
            }
            SequencerEvent::StageSkipped { stage, .. } => {
                self.print_line(format!("- {} skipped", stage));
            }
            SequencerEvent::RunCompleted { .. } => {
                self.print_line("Done: complete");
            }
            SequencerEvent::RunFailed { error, .. } => {
                self.print_line(format!("Failed: {}", error));
            }
            _ => {}
        }
    }

    fn handle_full(&self, event: &SequencerEvent) {
        match event {
            SequencerEvent::RunStarted { goal, category, .. } => {
                self.print_line(format!(
                    "{} {} {}",
                    style("▶").green().bold(),
                    style(goal).bold(),
                    style(format!("({})", category)).dim()
                ));
                self.task_bar
                    .enable_steady_tick(Duration::from_millis(100));
            }
            SequencerEvent::PhaseEntered { phase, .. } => self.on_phase_entered(*phase),
            SequencerEvent::StageSkipped { stage, .. } => {
                self.print_line(format!(
                    "{}{} {}",
                    SKIP,
                    style(stage.display_name()).dim(),
                    style("skipped (disabled)").dim()
                ));
            }
            SequencerEvent::TaskRevealed { task, .. } => {
                self.task_bar
                    .set_message(format!("Planned {}. {}", task.id, task.title));
                if self.verbose {
                    self.print_line(format!(
                        "    {} {}. {}",
                        style("+").dim(),
                        task.id,
                        task.title
                    ));
                }
            }
            SequencerEvent::TaskStarted { task_id, .. } => {
                self.task_bar
                    .set_message(format!("Executing task {}", style(task_id).cyan()));
            }
            SequencerEvent::TaskCompleted { output, .. } => {
                self.print_line(format!("    {}Task {} done", CHECK, output.task_id));
            }
            SequencerEvent::CritiqueRevealed { critique, .. } => {
                self.task_bar.set_message(format!("Reviewing: {}", critique.issue));
                self.print_line(format!(
                    "    {}{}",
                    severity_icon(critique.severity),
                    critique.issue
                ));
            }
            SequencerEvent::ReviewScored { overall_score, .. } => {
                self.print_line(format!(
                    "    Score: {}",
                    style(format!("{}/100", overall_score)).cyan().bold()
                ));
            }
            SequencerEvent::RefinementApplied { improvements, .. } => {
                self.print_line(format!(
                    "    {}{} improvements applied",
                    SPARKLE, improvements
                ));
            }
            SequencerEvent::RunCompleted { .. } => {
                self.stage_bar.set_message(Phase::Complete.label());
                self.task_bar.finish_and_clear();
            }
            SequencerEvent::RunFailed { error, .. } => {
                self.task_bar
                    .finish_with_message(format!("{} {}", CROSS, style(error).red()));
            }
        }
    }

    fn on_phase_entered(&self, phase: Phase) {
        self.stage_bar.inc(1);
        self.stage_bar.set_message(phase.label());
        if let Some(stage) = phase.stage() {
            self.task_bar.set_message(format!("{}…", phase.label()));
            self.print_line(format!(
                "{}{}",
                stage_icon(stage),
                style(stage.display_name()).yellow().bold()
            ));
        }
    }

    /// Stop the bars and print the elapsed time.
    pub fn finish(&self, elapsed: Duration, success: bool) {
        self.task_bar.finish_and_clear();
        self.stage_bar.finish_and_clear();
        if self.mode == UiMode::Json {
            return;
        }
        let icon = if success { &CHECK } else { &CROSS };
        self.print_line(format!(
            "\n{}Finished in {}{}",
            icon,
            CLOCK,
            format_duration(elapsed)
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_mode_parse() {
        assert_eq!(UiMode::parse("json"), UiMode::Json);
        assert_eq!(UiMode::parse("MINIMAL"), UiMode::Minimal);
        assert_eq!(UiMode::parse("full"), UiMode::Full);
        assert_eq!(UiMode::parse("anything_else"), UiMode::Full);
    }

    #[test]
    fn test_pipeline_ui_creation() {
        let ui = PipelineUI::new(4, UiMode::Minimal, false);
        assert_eq!(ui.mode(), UiMode::Minimal);
        assert_eq!(ui.stage_bar.length(), Some(4));
        assert!(ui.multi.is_hidden());
    }

    #[test]
    fn test_phase_entered_advances_stage_bar() {
        let ui = PipelineUI::new(2, UiMode::Minimal, false);
        ui.handle_full(&SequencerEvent::PhaseEntered {
            generation: 1,
            phase: Phase::Planning,
        });
        assert_eq!(ui.stage_bar.position(), 1);
    }
}
