//! Integration tests for fleet
//!
//! These tests verify end-to-end behavior across multiple crates

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use fleet_bot::{
    AdminList, AgentRuntime, BotConfig, ChatTransport, CommandHandler, RuntimeError,
};
use fleet_core::{
    Agent, AgentAlert, AgentRun, AgentStatus, AlertSeverity, Database, RunStatus,
};
use fleet_web::api::{create_api_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

const ADMIN: i64 = 7;
const VIEWER: i64 = 8;

// ==================== Test Helpers ====================

#[derive(Default)]
struct Outbox {
    messages: Mutex<Vec<String>>,
}

#[async_trait]
impl ChatTransport for Outbox {
    async fn send_message(&self, _chat_id: i64, text: &str) -> fleet_bot::Result<i64> {
        let mut messages = self.messages.lock().unwrap();
        messages.push(text.to_string());
        Ok(messages.len() as i64)
    }

    async fn edit_message(&self, _chat_id: i64, _message_id: i64, text: &str) -> fleet_bot::Result<()> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingRuntime {
    triggered: Mutex<Vec<String>>,
}

#[async_trait]
impl AgentRuntime for RecordingRuntime {
    async fn trigger_run(&self, agent_id: &str) -> Result<(), RuntimeError> {
        self.triggered.lock().unwrap().push(agent_id.to_string());
        Ok(())
    }
}

struct Fleet {
    db: Database,
    router: Router,
    outbox: Arc<Outbox>,
    runtime: Arc<RecordingRuntime>,
}

async fn setup_fleet() -> Fleet {
    let db = Database::in_memory().await.unwrap();
    let outbox = Arc::new(Outbox::default());
    let runtime = Arc::new(RecordingRuntime::default());
    let handler = CommandHandler::new(
        db.clone(),
        outbox.clone(),
        runtime.clone(),
        BotConfig::new(AdminList::parse(&ADMIN.to_string()), chrono_tz::UTC),
    );
    let state = AppState::new(db.clone(), chrono_tz::UTC).with_telegram(Arc::new(handler), None);

    Fleet {
        db,
        router: create_api_router(Arc::new(state)),
        outbox,
        runtime,
    }
}

async fn body_to_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_json(router: &Router, uri: &str) -> Value {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_to_json(response.into_body()).await
}

async fn post_command(router: &Router, user_id: i64, text: &str) -> StatusCode {
    let update = json!({
        "update_id": 1,
        "message": {
            "message_id": 1,
            "date": 1700000000,
            "chat": {"id": 500, "type": "private", "first_name": "Op"},
            "from": {"id": user_id, "is_bot": false, "first_name": "Op"},
            "text": text
        }
    });
    router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/webhook/telegram")
                .header("content-type", "application/json")
                .body(Body::from(update.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

// ==================== Bot and Dashboard Tests ====================

mod bot_and_dashboard {
    use super::*;

    #[tokio::test]
    async fn test_clear_alerts_from_chat_updates_dashboard() {
        let fleet = setup_fleet().await;
        for i in 0..3 {
            fleet
                .db
                .insert_alert(&AgentAlert::new(AlertSeverity::Warning, format!("alert {}", i)))
                .await
                .unwrap();
        }

        let stats = get_json(&fleet.router, "/api/stats").await;
        assert_eq!(stats["activeAlerts"], 3);

        // A viewer cannot clear
        assert_eq!(post_command(&fleet.router, VIEWER, "/clear_alerts").await, StatusCode::OK);
        let stats = get_json(&fleet.router, "/api/stats").await;
        assert_eq!(stats["activeAlerts"], 3);

        assert_eq!(post_command(&fleet.router, ADMIN, "/clear_alerts").await, StatusCode::OK);
        let stats = get_json(&fleet.router, "/api/stats").await;
        assert_eq!(stats["activeAlerts"], 0);

        let open = get_json(&fleet.router, "/api/alerts?acknowledged=false").await;
        assert_eq!(open, json!([]));
        assert_eq!(fleet.outbox.messages.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_run_command_reaches_runtime() {
        let fleet = setup_fleet().await;
        let agent = Agent::new("Digest", "").with_status(AgentStatus::Active);
        fleet.db.insert_agent(&agent).await.unwrap();

        let text = format!("/run@fleet_bot {}", agent.id);
        assert_eq!(post_command(&fleet.router, ADMIN, &text).await, StatusCode::OK);

        assert_eq!(
            *fleet.runtime.triggered.lock().unwrap(),
            vec![agent.id.to_string()]
        );
    }

    #[tokio::test]
    async fn test_status_reply_matches_store() {
        let fleet = setup_fleet().await;
        let agent = Agent::new("Digest", "").with_status(AgentStatus::Active);
        fleet.db.insert_agent(&agent).await.unwrap();
        for status in [RunStatus::Completed, RunStatus::Failed] {
            fleet
                .db
                .insert_run(&AgentRun::new(agent.id).with_status(status))
                .await
                .unwrap();
        }

        assert_eq!(post_command(&fleet.router, VIEWER, "/status").await, StatusCode::OK);

        let messages = fleet.outbox.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("• Total: 1"));
        assert!(messages[0].contains("• Success rate: 50.0%"));
    }
}

// ==================== Statistics Tests ====================

mod statistics {
    use super::*;

    #[tokio::test]
    async fn test_stats_windows_and_daily_buckets() {
        let db = Database::in_memory().await.unwrap();
        let agent = Agent::new("Digest", "");
        db.insert_agent(&agent).await.unwrap();

        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let runs = [
            // Inside the last 24 hours
            (now - Duration::hours(1), RunStatus::Completed, Some(400)),
            (now - Duration::hours(20), RunStatus::Failed, None),
            // Older than a day but inside the week
            (now - Duration::days(3), RunStatus::Completed, Some(100)),
            // Outside both windows
            (now - Duration::days(9), RunStatus::Completed, Some(100)),
        ];
        for (created_at, status, duration) in runs {
            let mut run = AgentRun::new(agent.id)
                .with_status(status)
                .with_created_at(created_at);
            run.duration_ms = duration;
            db.insert_run(&run).await.unwrap();
        }

        let summary = db.stats_summary(now, &chrono_tz::UTC).await.unwrap();

        assert_eq!(summary.total_runs, 2);
        assert_eq!(summary.successful_runs, 1);
        assert_eq!(summary.failed_runs, 1);
        assert_eq!(summary.success_rate, 50.0);
        assert_eq!(summary.avg_duration, 400.0);

        let dates: Vec<&str> = summary.chart_data.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-07", "2024-03-09", "2024-03-10"]);
        let runs_per_day: i64 = summary.chart_data.iter().map(|d| d.runs).sum();
        assert_eq!(runs_per_day, 3);
    }

    #[tokio::test]
    async fn test_day_buckets_follow_timezone() {
        let db = Database::in_memory().await.unwrap();
        let agent = Agent::new("Digest", "");
        db.insert_agent(&agent).await.unwrap();

        // 22:30 UTC is already the next day in Jerusalem
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 23, 0, 0).unwrap();
        let created_at = Utc.with_ymd_and_hms(2024, 6, 1, 22, 30, 0).unwrap();
        db.insert_run(
            &AgentRun::new(agent.id)
                .with_status(RunStatus::Completed)
                .with_created_at(created_at),
        )
        .await
        .unwrap();

        let utc = db.stats_summary(now, &chrono_tz::UTC).await.unwrap();
        let local = db
            .stats_summary(now, &chrono_tz::Asia::Jerusalem)
            .await
            .unwrap();

        assert_eq!(utc.chart_data[0].date, "2024-06-01");
        assert_eq!(local.chart_data[0].date, "2024-06-02");
    }
}
