//! Tests for the fleet CLI commands

use assert_cmd::Command;
use fleet_core::{AgentAlert, AlertQuery, AlertSeverity, Database};
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to create a temporary database
async fn setup_test_db() -> (TempDir, PathBuf, Database) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(&db_path).await.unwrap();
    (temp_dir, db_path, db)
}

fn fleet(db_path: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("fleet").unwrap();
    cmd.env_remove("TELEGRAM_BOT_TOKEN")
        .env_remove("FLEET_TIMEZONE")
        .arg("--db-path")
        .arg(db_path.to_str().unwrap());
    cmd
}

#[tokio::test]
async fn test_agents_empty() {
    let (_temp_dir, db_path, _db) = setup_test_db().await;

    fleet(&db_path)
        .arg("agents")
        .assert()
        .success()
        .stdout(predicate::str::contains("No agents found"));
}

#[tokio::test]
async fn test_seed_then_list() {
    let (_temp_dir, db_path, _db) = setup_test_db().await;

    fleet(&db_path)
        .arg("seed")
        .assert()
        .success()
        .stdout(predicate::str::contains("Seeded 4 agents, 28 runs and 3 alerts"));

    fleet(&db_path)
        .arg("agents")
        .assert()
        .success()
        .stdout(predicate::str::contains("Morning Digest"))
        .stdout(predicate::str::contains("Inbox Triage"));

    fleet(&db_path)
        .arg("alerts")
        .assert()
        .success()
        .stdout(predicate::str::contains("Price Monitor is running slowly"))
        .stdout(predicate::str::contains("Runtime restarted").not());

    fleet(&db_path)
        .args(["runs", "--limit", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATED"));
}

#[tokio::test]
async fn test_stats_json() {
    let (_temp_dir, db_path, _db) = setup_test_db().await;

    fleet(&db_path)
        .args(["stats", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"totalAgents\": 0"))
        .stdout(predicate::str::contains("\"chartData\": []"));
}

#[tokio::test]
async fn test_ack_and_clear_alerts() {
    let (_temp_dir, db_path, db) = setup_test_db().await;
    let first = AgentAlert::new(AlertSeverity::Warning, "first");
    let second = AgentAlert::new(AlertSeverity::Critical, "second");
    db.insert_alert(&first).await.unwrap();
    db.insert_alert(&second).await.unwrap();

    fleet(&db_path)
        .arg("ack")
        .arg(first.id.to_string())
        .assert()
        .success()
        .stdout(predicate::str::contains("Acknowledged alert"));

    let open = db
        .list_alerts(&AlertQuery {
            acknowledged: Some(false),
            limit: 10,
        })
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].alert.id, second.id);

    fleet(&db_path)
        .arg("clear-alerts")
        .assert()
        .success()
        .stdout(predicate::str::contains("Acknowledged 1 alert(s)"));

    assert_eq!(db.count_unacknowledged_alerts().await.unwrap(), 0);
}

#[tokio::test]
async fn test_ack_rejects_bad_id() {
    let (_temp_dir, db_path, _db) = setup_test_db().await;

    fleet(&db_path)
        .args(["ack", "not-a-uuid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid alert ID"));
}

#[tokio::test]
async fn test_unknown_timezone_fails() {
    let (_temp_dir, db_path, _db) = setup_test_db().await;

    fleet(&db_path)
        .args(["--timezone", "Mars/Olympus", "stats"])
        .assert()
        .failure();
}

#[tokio::test]
async fn test_set_webhook_requires_token() {
    let (_temp_dir, db_path, _db) = setup_test_db().await;

    fleet(&db_path)
        .args(["set-webhook", "https://example.com/api/webhook/telegram"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TELEGRAM_BOT_TOKEN"));
}
