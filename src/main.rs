use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use agentflow::{GoalCategory, StageType};

mod cmd;

#[derive(Parser)]
#[command(name = "agentflow")]
#[command(version, about = "Simulated Planner → Executor → Critic → Refiner agent pipeline")]
pub struct Cli {
    /// Print every step and enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to agentflow.toml. Defaults to ./agentflow.toml, then the user config dir.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Skip all simulated delays
    #[arg(long, global = true)]
    pub instant: bool,

    /// Write logs to stderr as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one or more goals through the pipeline
    Run {
        /// Goals to run, one after another
        goals: Vec<String>,

        /// Run the example goal of a category first: internship, fibonacci
        #[arg(long)]
        example: Option<GoalCategory>,

        /// Disable a stage (repeatable): planner, executor, critic, refiner
        #[arg(long = "disable", value_name = "STAGE")]
        disable: Vec<StageType>,

        /// Print the final snapshot as JSON instead of the report
        #[arg(long)]
        json: bool,

        /// UI output mode: full, minimal, json
        #[arg(long, default_value = "full")]
        ui: String,
    },
    /// Show which payload category a goal maps to
    Classify { goal: String },
    /// List the example goals
    Examples,
    /// Show the pipeline stages and how they connect
    Stages {
        /// Disable a stage (repeatable)
        #[arg(long = "disable", value_name = "STAGE")]
        disable: Vec<StageType>,
    },
    /// View, validate or create configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate configuration and report problems
    Validate,
    /// Write a default agentflow.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("agentflow=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match &cli.command {
        Commands::Run {
            goals,
            example,
            disable,
            json,
            ui,
        } => {
            let config = cmd::load_validated(&cli)?;
            let options = cmd::RunOptions {
                goals: goals.clone(),
                example: *example,
                disable: disable.clone(),
                json: *json,
                ui: agentflow::ui::UiMode::parse(ui),
                verbose: cli.verbose,
            };
            cmd::cmd_run(&config, options).await?;
        }
        Commands::Classify { goal } => {
            let config = cmd::load_validated(&cli)?;
            cmd::cmd_classify(&config, goal);
        }
        Commands::Examples => cmd::cmd_examples(),
        Commands::Stages { disable } => cmd::cmd_stages(disable),
        Commands::Config { command } => cmd::cmd_config(&cli, command.clone())?,
    }

    Ok(())
}
