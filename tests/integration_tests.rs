//! Integration tests for Shipyard
//!
//! Every scheduling test runs against a `--snapshot` file so no tracker is
//! contacted.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to create a shipyard Command with a clean environment
fn shipyard() -> Command {
    let mut cmd = cargo_bin_cmd!("shipyard");
    cmd.env_remove("FORCE_ISSUE")
        .env_remove("GITHUB_REPOSITORY")
        .env_remove("GITHUB_TOKEN")
        .env_remove("GH_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

/// Write `json` as the snapshot file and return its path.
fn write_snapshot(dir: &TempDir, json: &str) -> PathBuf {
    let path = dir.path().join("issues.json");
    fs::write(&path, json).unwrap();
    path
}

fn read_handoff(dir: &TempDir) -> serde_json::Value {
    let content = fs::read_to_string(dir.path().join("out/next_issue.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

const POOL: &str = r#"[
    {"id": 1, "title": "Low priority", "labels": ["ai:ready", "P3"]},
    {"id": 2, "title": "Urgent fix", "labels": ["ai:ready", "P0"], "body": "Depends on #9"},
    {"id": 3, "title": "Important feature", "labels": ["ai:ready", "P1"]},
    {"id": 4, "title": "Held", "labels": ["ai:ready", "P0", "blocked"]},
    {"id": 5, "title": "Shipped", "labels": ["ai:ready", "P0"], "state": "closed"},
    {"id": 9, "title": "Prerequisite", "labels": ["P2"]}
]"#;

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_shipyard_help() {
        shipyard()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("next"));
    }

    #[test]
    fn test_shipyard_version() {
        shipyard().arg("--version").assert().success();
    }

    #[test]
    fn test_init_creates_config() {
        let dir = create_temp_project();

        shipyard()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Wrote default"));

        let content = fs::read_to_string(dir.path().join(".shipyard/shipyard.toml")).unwrap();
        assert!(content.contains("[pickup]"));
        assert!(content.contains("ai:ready"));
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".shipyard")).unwrap();
        fs::write(dir.path().join(".shipyard/shipyard.toml"), "[pickup]\nlabels = [\"go\"]\n").unwrap();

        shipyard()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("left unchanged"));

        let content = fs::read_to_string(dir.path().join(".shipyard/shipyard.toml")).unwrap();
        assert_eq!(content, "[pickup]\nlabels = [\"go\"]\n");
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

mod configuration {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = create_temp_project();

        shipyard()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No shipyard.toml found"))
            .stdout(predicate::str::contains("repo = (not set)"));
    }

    #[test]
    fn test_config_show_cli_repo_override() {
        let dir = create_temp_project();

        shipyard()
            .current_dir(dir.path())
            .args(["--repo", "https://github.com/acme/widgets", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("repo = \"acme/widgets\""));
    }

    #[test]
    fn test_config_validate_clean() {
        let dir = create_temp_project();

        shipyard()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."));
    }

    #[test]
    fn test_config_validate_reports_bad_force_issue() {
        let dir = create_temp_project();

        shipyard()
            .current_dir(dir.path())
            .env("FORCE_ISSUE", "abc")
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("FORCE_ISSUE"));
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".shipyard")).unwrap();
        fs::write(dir.path().join(".shipyard/shipyard.toml"), "[pickup\n").unwrap();

        shipyard()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .failure();
    }
}

// =============================================================================
// Selection Tests
// =============================================================================

mod selection {
    use super::*;

    #[test]
    fn test_next_skips_blocked_dependency() {
        let dir = create_temp_project();
        let snapshot = write_snapshot(&dir, POOL);

        shipyard()
            .current_dir(dir.path())
            .arg("next")
            .arg("--snapshot")
            .arg(&snapshot)
            .assert()
            .success()
            .stdout(predicate::str::contains("#3"));

        let handoff = read_handoff(&dir);
        assert_eq!(handoff["issue_number"], 3);
        assert_eq!(handoff["priority"], "P1");
        assert_eq!(handoff["forced"], false);
    }

    #[test]
    fn test_config_show_reports_current_handoff() {
        let dir = create_temp_project();
        let snapshot = write_snapshot(&dir, POOL);

        shipyard()
            .current_dir(dir.path())
            .arg("next")
            .arg("--snapshot")
            .arg(&snapshot)
            .assert()
            .success();

        shipyard()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Current hand-off: #3 [P1] Important feature"));
    }

    #[test]
    fn test_next_picks_dependent_once_dependency_closed() {
        let dir = create_temp_project();
        let pool = POOL.replace(
            r#"{"id": 9, "title": "Prerequisite", "labels": ["P2"]}"#,
            r#"{"id": 9, "title": "Prerequisite", "labels": ["P2"], "state": "closed"}"#,
        );
        let snapshot = write_snapshot(&dir, &pool);

        shipyard()
            .current_dir(dir.path())
            .arg("next")
            .arg("--snapshot")
            .arg(&snapshot)
            .assert()
            .success();

        assert_eq!(read_handoff(&dir)["issue_number"], 2);
    }

    #[test]
    fn test_next_nothing_runnable_removes_stale_handoff() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join("out")).unwrap();
        fs::write(dir.path().join("out/next_issue.json"), r#"{"issue_number": 42}"#).unwrap();
        let snapshot = write_snapshot(
            &dir,
            r#"[{"id": 1, "title": "Waiting", "labels": ["ai:ready"], "body": "依存: #7"}]"#,
        );

        shipyard()
            .current_dir(dir.path())
            .arg("next")
            .arg("--snapshot")
            .arg(&snapshot)
            .assert()
            .success()
            .stdout(predicate::str::contains("No runnable issue"));

        assert!(!dir.path().join("out/next_issue.json").exists());
    }

    #[test]
    fn test_next_forced_bypasses_labels() {
        let dir = create_temp_project();
        let snapshot = write_snapshot(&dir, POOL);

        shipyard()
            .current_dir(dir.path())
            .args(["next", "--force", "4", "--snapshot"])
            .arg(&snapshot)
            .assert()
            .success()
            .stdout(predicate::str::contains("(forced)"));

        let handoff = read_handoff(&dir);
        assert_eq!(handoff["issue_number"], 4);
        assert_eq!(handoff["forced"], true);
    }

    #[test]
    fn test_next_forced_from_env() {
        let dir = create_temp_project();
        let snapshot = write_snapshot(&dir, POOL);

        shipyard()
            .current_dir(dir.path())
            .env("FORCE_ISSUE", "#1")
            .arg("next")
            .arg("--snapshot")
            .arg(&snapshot)
            .assert()
            .success();

        assert_eq!(read_handoff(&dir)["issue_number"], 1);
    }

    #[test]
    fn test_next_forced_closed_selects_nothing() {
        let dir = create_temp_project();
        let snapshot = write_snapshot(&dir, POOL);

        shipyard()
            .current_dir(dir.path())
            .args(["next", "--force", "5", "--snapshot"])
            .arg(&snapshot)
            .assert()
            .success()
            .stdout(predicate::str::contains("already closed"));

        assert!(!dir.path().join("out/next_issue.json").exists());
    }

    #[test]
    fn test_next_invalid_force_env_fails() {
        let dir = create_temp_project();
        let snapshot = write_snapshot(&dir, POOL);

        shipyard()
            .current_dir(dir.path())
            .env("FORCE_ISSUE", "soon")
            .arg("next")
            .arg("--snapshot")
            .arg(&snapshot)
            .assert()
            .failure()
            .stderr(predicate::str::contains("FORCE_ISSUE"));
    }

    #[test]
    fn test_next_respects_configured_pickup_label() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".shipyard")).unwrap();
        fs::write(dir.path().join(".shipyard/shipyard.toml"), "[pickup]\nlabels = [\"P2\"]\n").unwrap();
        let snapshot = write_snapshot(&dir, POOL);

        shipyard()
            .current_dir(dir.path())
            .arg("next")
            .arg("--snapshot")
            .arg(&snapshot)
            .assert()
            .success();

        assert_eq!(read_handoff(&dir)["issue_number"], 9);
    }

    #[test]
    fn test_claim_conflicts_with_snapshot() {
        let dir = create_temp_project();
        let snapshot = write_snapshot(&dir, POOL);

        shipyard()
            .current_dir(dir.path())
            .args(["next", "--claim", "--snapshot"])
            .arg(&snapshot)
            .assert()
            .failure();
    }

    #[test]
    fn test_next_without_repo_fails() {
        let dir = create_temp_project();

        shipyard()
            .current_dir(dir.path())
            .arg("next")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No repository configured"));
    }
}

// =============================================================================
// Dependency Check Tests
// =============================================================================

mod dependencies {
    use super::*;

    #[test]
    fn test_deps_open_dependency_fails() {
        let dir = create_temp_project();
        let snapshot = write_snapshot(&dir, POOL);

        shipyard()
            .current_dir(dir.path())
            .args(["deps", "2", "--snapshot"])
            .arg(&snapshot)
            .assert()
            .failure()
            .stdout(predicate::str::contains("#9 is open"));
    }

    #[test]
    fn test_deps_missing_dependency_fails() {
        let dir = create_temp_project();
        let snapshot = write_snapshot(
            &dir,
            r#"[{"id": 1, "title": "Waiting", "body": "Depends on #404"}]"#,
        );

        shipyard()
            .current_dir(dir.path())
            .args(["deps", "1", "--snapshot"])
            .arg(&snapshot)
            .assert()
            .failure()
            .stdout(predicate::str::contains("#404 unknown"));
    }

    #[test]
    fn test_deps_none_declared_passes() {
        let dir = create_temp_project();
        let snapshot = write_snapshot(&dir, POOL);

        shipyard()
            .current_dir(dir.path())
            .args(["deps", "3", "--snapshot"])
            .arg(&snapshot)
            .assert()
            .success()
            .stdout(predicate::str::contains("declares no dependencies"));
    }

    #[test]
    fn test_deps_all_closed_passes() {
        let dir = create_temp_project();
        let snapshot = write_snapshot(
            &dir,
            r#"[
                {"id": 1, "title": "Next", "body": "Depends on #2\n依存タスク: #3"},
                {"id": 2, "title": "A", "state": "closed"},
                {"id": 3, "title": "B", "state": "closed"}
            ]"#,
        );

        shipyard()
            .current_dir(dir.path())
            .args(["deps", "1", "--snapshot"])
            .arg(&snapshot)
            .assert()
            .success()
            .stdout(predicate::str::contains("All dependencies of #1 are closed"));
    }
}

// =============================================================================
// Triage Tests
// =============================================================================

mod triage {
    use super::*;

    #[test]
    fn test_triage_writes_report() {
        let dir = create_temp_project();
        let snapshot = write_snapshot(&dir, POOL);

        shipyard()
            .current_dir(dir.path())
            .arg("triage")
            .arg("--snapshot")
            .arg(&snapshot)
            .assert()
            .success()
            .stdout(predicate::str::contains("Next: #3"));

        let content = fs::read_to_string(dir.path().join("out/prioritized_issues.json")).unwrap();
        let report: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(report["summary"]["ready"], 2);
        assert_eq!(report["summary"]["blocked"], 2);
        assert_eq!(report["issues"][0]["number"], 2);
        assert_eq!(report["issues"][0]["status"], "blocked_by_dependency");
    }

    #[test]
    fn test_triage_report_path_from_config() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".shipyard")).unwrap();
        fs::write(
            dir.path().join(".shipyard/shipyard.toml"),
            "[triage]\nreport_path = \"reports/queue.json\"\n",
        )
        .unwrap();
        let snapshot = write_snapshot(&dir, POOL);

        shipyard()
            .current_dir(dir.path())
            .arg("triage")
            .arg("--snapshot")
            .arg(&snapshot)
            .assert()
            .success();

        assert!(dir.path().join("reports/queue.json").exists());
        assert!(!dir.path().join("out/prioritized_issues.json").exists());
    }
}

// =============================================================================
// Security Scan Tests
// =============================================================================

mod security_scan {
    use super::*;

    #[test]
    fn test_scan_clean_tree_passes() {
        let dir = create_temp_project();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("main.rs"), "fn main() {\n    println!(\"hi\");\n}\n").unwrap();

        shipyard()
            .current_dir(dir.path())
            .arg("scan")
            .arg(&src)
            .assert()
            .success();

        let content = fs::read_to_string(dir.path().join("out/security_report.json")).unwrap();
        let report: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(report["passed"], true);
        assert_eq!(report["summary"]["total"], 0);
    }

    #[test]
    fn test_scan_hardcoded_secret_fails() {
        let dir = create_temp_project();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("config.py"), "api_key = \"sk-live-abcdef123456\"\n").unwrap();

        shipyard()
            .current_dir(dir.path())
            .arg("scan")
            .arg(&src)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("CRITICAL"));
    }
}

// =============================================================================
// PR Size Tests
// =============================================================================

mod pr_size {
    use super::*;

    #[test]
    fn test_small_change_passes() {
        let dir = create_temp_project();
        let stat = dir.path().join("stat.txt");
        fs::write(
            &stat,
            " src/lib.rs | 12 ++++++++----\n src/main.rs |  3 +++\n 2 files changed, 11 insertions(+), 4 deletions(-)\n",
        )
        .unwrap();

        shipyard()
            .current_dir(dir.path())
            .args(["pr-size", "--stat-file"])
            .arg(&stat)
            .assert()
            .success()
            .stdout(predicate::str::contains("2 files changed"));
    }

    #[test]
    fn test_large_change_fails() {
        let dir = create_temp_project();
        let stat = dir.path().join("stat.txt");
        fs::write(&stat, " big.rs | 900 ++++++++++\n 1 file changed, 900 insertions(+)\n").unwrap();

        shipyard()
            .current_dir(dir.path())
            .args(["pr-size", "--stat-file"])
            .arg(&stat)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("Split this change"));
    }

    #[test]
    fn test_requires_number_or_file() {
        shipyard().arg("pr-size").assert().failure();
    }
}
