//! Read-only commands: `agentflow classify`, `examples` and `stages`.

use agentflow::classify::{GoalCategory, GoalClassifier};
use agentflow::config::AgentflowToml;
use agentflow::phase::{Phase, StageType};
use agentflow::ui::render_pipeline;
use agentflow::workflow::Workflow;

pub fn cmd_classify(config: &AgentflowToml, goal: &str) {
    let category = config.classifier().classify(goal);
    println!("{}", category);
}

pub fn cmd_examples() {
    for category in GoalCategory::ALL {
        println!("{:<11} {}", category, category.example_goal());
    }
}

pub fn cmd_stages(disable: &[StageType]) {
    let workflow = Workflow::with_disabled(disable);
    for line in render_pipeline(&workflow, Phase::Idle) {
        println!("{}", line);
    }
}
