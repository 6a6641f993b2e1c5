//! Pipeline execution: `agentflow run`.

use anyhow::{Context, Result, bail};
use std::time::Instant;
use tokio::sync::mpsc;

use agentflow::classify::GoalCategory;
use agentflow::config::AgentflowToml;
use agentflow::phase::StageType;
use agentflow::sequencer::{PhaseSequencer, RunHandle, RunOutcome, SequencerEvent, SubmitOutcome};
use agentflow::ui::{PipelineUI, UiMode, render_run, render_session};
use agentflow::workflow::Workflow;

const EVENT_BUFFER: usize = 256;

pub struct RunOptions {
    pub goals: Vec<String>,
    pub example: Option<GoalCategory>,
    pub disable: Vec<StageType>,
    pub json: bool,
    pub ui: UiMode,
    pub verbose: bool,
}

impl RunOptions {
    /// Goals in run order, with the example goal first when requested.
    pub fn resolved_goals(&self) -> Vec<String> {
        self.example
            .map(|category| category.example_goal().to_string())
            .into_iter()
            .chain(self.goals.iter().cloned())
            .collect()
    }
}

pub async fn cmd_run(config: &AgentflowToml, options: RunOptions) -> Result<()> {
    let goals = options.resolved_goals();
    if goals.is_empty() {
        bail!("No goal given. Pass a GOAL or use --example internship|fibonacci");
    }

    let workflow = Workflow::with_disabled(&options.disable);
    if !workflow.has_enabled() {
        bail!("Every stage is disabled. Enable at least one stage to run a goal.");
    }
    let enabled = workflow.enabled_in_order().len();

    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
    let sequencer = PhaseSequencer::new(config.sequencer_config())
        .with_classifier(config.classifier())
        .with_event_channel(tx)
        .with_stages(workflow);

    for goal in goals {
        let ui = (!options.json).then(|| PipelineUI::new(enabled, options.ui, options.verbose));
        let handle = match sequencer.submit_goal(goal.as_str()) {
            SubmitOutcome::Started(handle) => handle,
            SubmitOutcome::Rejected(reason) => bail!("Goal '{}' was rejected: {}", goal, reason),
        };

        let timer = Instant::now();
        let outcome = pump_events(handle, &mut rx, ui.as_ref()).await;
        let success = matches!(outcome, RunOutcome::Completed(_));

        if let Some(ui) = &ui {
            ui.finish(timer.elapsed(), success);
            if ui.mode() != UiMode::Json && success {
                ui.print_line("");
                for line in render_run(&sequencer.run_state()) {
                    ui.print_line(line);
                }
                ui.print_line("");
            }
        }

        match outcome {
            RunOutcome::Completed(_) => {}
            RunOutcome::Superseded => bail!("Run for '{}' was superseded", goal),
            RunOutcome::Failed(err) => bail!("Run for '{}' failed: {}", goal, err),
        }
    }

    let snapshot = sequencer.snapshot();
    if options.json {
        let json =
            serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?;
        println!("{}", json);
    } else if options.ui != UiMode::Json {
        for line in render_session(&snapshot) {
            println!("{}", line);
        }
    }
    Ok(())
}

/// Forward events to the UI until the run ends, then drain what is left.
async fn pump_events(
    handle: RunHandle,
    rx: &mut mpsc::Receiver<SequencerEvent>,
    ui: Option<&PipelineUI>,
) -> RunOutcome {
    let show = |event: &SequencerEvent| {
        if let Some(ui) = ui {
            ui.handle_event(event);
        }
    };

    let wait = handle.wait();
    tokio::pin!(wait);
    loop {
        tokio::select! {
            biased;
            Some(event) = rx.recv() => show(&event),
            outcome = &mut wait => {
                while let Ok(event) = rx.try_recv() {
                    show(&event);
                }
                return outcome;
            }
        }
    }
}
