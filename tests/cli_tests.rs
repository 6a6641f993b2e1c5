//! Integration tests for the agentflow binary.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Command isolated from the user's config and environment, running without delays.
fn agentflow(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("agentflow");
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("xdg"))
        .env("HOME", dir.path())
        .env_remove("AGENTFLOW_PHASE_DELAY_MS")
        .env_remove("AGENTFLOW_TASK_DELAY_MS")
        .env_remove("RUST_LOG")
        .arg("--instant");
    cmd
}

fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        let dir = temp_dir();
        agentflow(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("run"));
    }

    #[test]
    fn test_version() {
        let dir = temp_dir();
        agentflow(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_examples_lists_both_categories() {
        let dir = temp_dir();
        agentflow(&dir)
            .arg("examples")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Analyze if this internship posting is fake or legitimate",
            ))
            .stdout(predicate::str::contains(
                "Write code to find the Fibonacci sequence of a given number",
            ));
    }

    #[test]
    fn test_classify() {
        let dir = temp_dir();
        agentflow(&dir)
            .args(["classify", "Is this internship LEGIT or fake?"])
            .assert()
            .success()
            .stdout(predicate::str::diff("internship\n"));

        agentflow(&dir)
            .args(["classify", "sort a list"])
            .assert()
            .success()
            .stdout(predicate::str::diff("fibonacci\n"));
    }

    #[test]
    fn test_stages_shows_flow_without_disabled_stage() {
        let dir = temp_dir();
        agentflow(&dir)
            .args(["stages", "--disable", "critic"])
            .assert()
            .success()
            .stdout(predicate::str::contains("planner → executor → refiner"));
    }

    #[test]
    fn test_unknown_stage_is_rejected_by_parser() {
        let dir = temp_dir();
        agentflow(&dir)
            .args(["stages", "--disable", "reviewer"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("reviewer"));
    }
}

// =============================================================================
// Run Tests
// =============================================================================

mod run {
    use super::*;

    fn run_json(dir: &TempDir, args: &[&str]) -> serde_json::Value {
        let output = agentflow(dir)
            .arg("run")
            .arg("--json")
            .args(args)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    #[test]
    fn test_run_example_completes() {
        let dir = temp_dir();
        let snapshot = run_json(&dir, &["--example", "internship"]);

        assert_eq!(snapshot["run"]["phase"], "complete");
        assert_eq!(snapshot["is_processing"], false);
        assert_eq!(
            snapshot["run"]["executor_outputs"].as_array().unwrap().len(),
            4
        );
        assert_eq!(snapshot["run"]["critic_output"]["overall_score"], 65);
        assert_eq!(snapshot["memory"][0]["result"], "Completed successfully");
        assert!(snapshot["skipped_stages"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_run_with_disabled_refiner() {
        let dir = temp_dir();
        let snapshot = run_json(&dir, &["write fizzbuzz", "--disable", "refiner"]);

        assert_eq!(snapshot["run"]["phase"], "complete");
        assert!(snapshot["run"]["refinement_output"].is_null());
        assert_eq!(snapshot["skipped_stages"], serde_json::json!(["refiner"]));
        assert_eq!(snapshot["memory"][0]["goal"], "write fizzbuzz");
    }

    #[test]
    fn test_multiple_goals_fill_memory_most_recent_first() {
        let dir = temp_dir();
        let snapshot = run_json(&dir, &["first goal", "second goal"]);

        let memory = snapshot["memory"].as_array().unwrap();
        assert_eq!(memory.len(), 2);
        assert_eq!(memory[0]["goal"], "second goal");
        assert_eq!(memory[1]["goal"], "first goal");
    }

    #[test]
    fn test_run_report_output() {
        let dir = temp_dir();
        agentflow(&dir)
            .args(["run", "--example", "fibonacci", "--ui", "minimal"])
            .assert()
            .success()
            .stdout(predicate::str::contains("> planning"))
            .stdout(predicate::str::contains("Done: complete"))
            .stdout(predicate::str::contains("score 70/100"))
            .stdout(predicate::str::contains("Memory (1)"));
    }

    #[test]
    fn test_run_json_ui_streams_events() {
        let dir = temp_dir();
        agentflow(&dir)
            .args(["run", "plan a trip", "--ui", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"type\":\"run_started\""))
            .stdout(predicate::str::contains("\"type\":\"run_completed\""));
    }

    #[test]
    fn test_run_without_goal_fails() {
        let dir = temp_dir();
        agentflow(&dir)
            .arg("run")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No goal given"));
    }

    #[test]
    fn test_run_blank_goal_is_rejected() {
        let dir = temp_dir();
        agentflow(&dir)
            .args(["run", "   "])
            .assert()
            .failure()
            .stderr(predicate::str::contains("goal is empty"));
    }

    #[test]
    fn test_run_with_everything_disabled_fails() {
        let dir = temp_dir();
        agentflow(&dir)
            .args([
                "run", "goal", "--disable", "planner", "--disable", "executor", "--disable",
                "critic", "--disable", "refiner",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Every stage is disabled"));
    }
}

// =============================================================================
// Config Tests
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = temp_dir();
        agentflow(&dir)
            .arg("config")
            .assert()
            .success()
            .stdout(predicate::str::contains("using defaults"))
            .stdout(predicate::str::contains("phase_delay_ms = 0"));
    }

    #[test]
    fn test_config_init_then_refuse_overwrite() {
        let dir = temp_dir();
        agentflow(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created"));
        assert!(dir.path().join("agentflow.toml").exists());

        agentflow(&dir)
            .args(["config", "init"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));

        agentflow(&dir)
            .args(["config", "init", "--force"])
            .assert()
            .success();
    }

    #[test]
    fn test_custom_keywords_change_classification() {
        let dir = temp_dir();
        fs::write(
            dir.path().join("agentflow.toml"),
            "[classifier]\ninternship_keywords = [\"scam\"]\n",
        )
        .unwrap();

        agentflow(&dir)
            .args(["classify", "is this a scam"])
            .assert()
            .success()
            .stdout(predicate::str::diff("internship\n"));
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let dir = temp_dir();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[classifier]\ninternship_keywords = []\n").unwrap();

        agentflow(&dir)
            .args(["config", "validate", "--config"])
            .arg(&path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("must not be empty"));

        agentflow(&dir)
            .args(["run", "goal", "--config"])
            .arg(&path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn test_env_override_is_validated() {
        let dir = temp_dir();
        agentflow(&dir)
            .env("AGENTFLOW_TASK_DELAY_MS", "soon")
            .arg("config")
            .assert()
            .failure()
            .stderr(predicate::str::contains("AGENTFLOW_TASK_DELAY_MS"));
    }
}
