//! Plain-text rendering of workflows and finished runs.

use console::style;
use std::time::Duration;

use crate::phase::Phase;
use crate::state::{MemoryEntry, RunState, Snapshot};
use crate::ui::icons::{CROSS, MEMORY, SKIP, severity_icon, stage_icon, task_icon};
use crate::workflow::{StageStatus, Workflow};

const WRAP_WIDTH: usize = 76;

/// One line per stage in display order, then the connection chain.
pub fn render_pipeline(workflow: &Workflow, phase: Phase) -> Vec<String> {
    let mut stages: Vec<_> = workflow.stages().iter().collect();
    stages.sort_by_key(|s| s.position);

    let mut lines: Vec<String> = stages
        .iter()
        .map(|stage| {
            let status = if stage.enabled {
                match StageStatus::for_stage(stage.stage_type, phase) {
                    StageStatus::Waiting => style("waiting").dim().to_string(),
                    StageStatus::Active => style("active").cyan().bold().to_string(),
                    StageStatus::Complete => style("complete").green().to_string(),
                }
            } else {
                style("disabled").red().to_string()
            };
            format!(
                "{}{:<9} {:<34} {}",
                stage_icon(stage.stage_type),
                stage.name,
                stage.description,
                status
            )
        })
        .collect();

    let chain: Vec<String> = workflow
        .enabled_in_order()
        .iter()
        .map(|s| s.id.clone())
        .collect();
    if chain.is_empty() {
        lines.push(format!("{}No stages enabled", CROSS));
    } else {
        lines.push(format!("{} {}", style("Flow:").dim(), chain.join(" → ")));
    }
    lines
}

/// Full report of a run: plan, executor results, review, refinement.
pub fn render_run(run: &RunState) -> Vec<String> {
    let mut lines = vec![format!("{} {}", style("Goal:").bold(), run.goal)];

    if let Some(plan) = &run.planner_output {
        lines.push(String::new());
        lines.push(style("Plan").underlined().to_string());
        lines.extend(wrap_indented(&plan.reasoning, "  "));
        for task in &plan.sub_tasks {
            lines.push(format!("  {}{}. {}", task_icon(task.status), task.id, task.title));
        }
    }

    if !run.executor_outputs.is_empty() {
        lines.push(String::new());
        lines.push(style("Execution").underlined().to_string());
        for output in &run.executor_outputs {
            lines.push(format!(
                "  {} {}",
                style(format!("Task {}", output.task_id)).yellow(),
                style(format!("({:?})", output.kind).to_lowercase()).dim()
            ));
            lines.extend(wrap_indented(&output.result, "    "));
        }
    }

    if let Some(critic) = &run.critic_output {
        lines.push(String::new());
        lines.push(format!(
            "{} {}",
            style("Review").underlined(),
            style(format!("score {}/100", critic.overall_score)).cyan()
        ));
        for item in &critic.critiques {
            lines.push(format!("  {}{}", severity_icon(item.severity), item.issue));
            lines.extend(wrap_indented(&item.suggestion, "     "));
        }
    }

    if let Some(refinement) = &run.refinement_output {
        lines.push(String::new());
        lines.push(style("Refinement").underlined().to_string());
        for improvement in &refinement.improvements {
            lines.push(format!("  + {}", improvement));
        }
        lines.push(String::new());
        lines.extend(wrap_indented(&refinement.refined, "  "));
    }

    lines
}

/// Skipped stages and the memory log.
pub fn render_session(snapshot: &Snapshot) -> Vec<String> {
    let mut lines = Vec::new();
    if !snapshot.skipped_stages.is_empty() {
        let names: Vec<String> = snapshot
            .skipped_stages
            .iter()
            .map(|s| s.to_string())
            .collect();
        lines.push(format!("{}Skipped: {}", SKIP, names.join(", ")));
    }
    if !snapshot.memory.is_empty() {
        lines.push(format!("{}Memory ({})", MEMORY, snapshot.memory.len()));
        lines.extend(snapshot.memory.entries().iter().map(memory_line));
    }
    lines
}

pub fn memory_line(entry: &MemoryEntry) -> String {
    format!(
        "  {} {} {}",
        style(entry.time_label()).dim(),
        entry.goal,
        style(format!("[{}]", entry.result)).green()
    )
}

/// Wrap prose at a fixed width; code keeps its own line breaks.
fn wrap_indented(text: &str, indent: &str) -> Vec<String> {
    let text = text.trim_end();
    if looks_like_code(text) {
        return text.lines().map(|l| format!("{}{}", indent, l)).collect();
    }
    let options = textwrap::Options::new(WRAP_WIDTH)
        .initial_indent(indent)
        .subsequent_indent(indent);
    text.lines()
        .flat_map(|line| {
            if line.trim().is_empty() {
                vec![String::new()]
            } else {
                textwrap::wrap(line, &options)
                    .into_iter()
                    .map(|l| l.into_owned())
                    .collect()
            }
        })
        .collect()
}

fn looks_like_code(text: &str) -> bool {
    text.lines().any(|l| {
        let l = l.trim_end();
        l.ends_with('{') || l.ends_with(';') || l.starts_with("  ")
    })
}

/// Format a duration for display.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}.{}s", secs, d.subsec_millis() / 100)
    } else {
        format!("{}ms", d.as_millis())
    }
}
