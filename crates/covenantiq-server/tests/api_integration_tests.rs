//! Integration tests for the CovenantIQ Server API endpoints.

use std::io::Write;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use covenantiq_engine::{CovenantEngine, CovenantEngineBuilder};
use covenantiq_ext_file::{create_memory_storage, parse_seed_json};
use covenantiq_server::routes::create_router;
use covenantiq_server::{load_seed_data, seed_engine, SeedStats, ServerConfig};
use covenantiq_traits::config::EngineConfig;

const SEED: &str = r#"{
  "loans": [
    {
      "id": "loan-acme",
      "user_id": "user-1",
      "title": "Acme Term Loan",
      "borrower_name": "Acme Corp",
      "loan_amount": 5000000,
      "origination_date": "2024-01-15",
      "maturity_date": "2029-01-15",
      "covenants": [
        {
          "id": "cov-lev",
          "covenant_type": "leverage_ratio",
          "covenant_name": "Max Leverage",
          "threshold_value": 1.5,
          "threshold_operator": "<=",
          "measurements": [
            { "measurement_date": "2025-01-01", "actual_value": 1.0 },
            { "measurement_date": "2025-01-31", "actual_value": 1.1 },
            { "measurement_date": "2025-03-02", "actual_value": 1.2 }
          ]
        }
      ]
    },
    {
      "id": "loan-beta",
      "user_id": "user-2",
      "title": "Beta Revolver",
      "borrower_name": "Beta Industries",
      "loan_amount": 2000000,
      "origination_date": "2024-06-01",
      "covenants": [
        {
          "id": "cov-icr",
          "covenant_type": "interest_coverage",
          "covenant_name": "Min Interest Coverage",
          "threshold_value": 2.0,
          "threshold_operator": "greater_or_equal",
          "measurements": [
            { "measurement_date": "2025-03-31", "actual_value": 1.5 }
          ]
        }
      ]
    }
  ]
}"#;

/// Create a test engine loaded with the seed portfolio.
async fn create_test_engine() -> Arc<CovenantEngine> {
    let config = EngineConfig {
        refresh_interval_secs: 0,
        ..EngineConfig::default()
    };
    let engine = CovenantEngineBuilder::new()
        .with_config(config)
        .with_storage(create_memory_storage())
        .build()
        .expect("Failed to build engine");
    let data = parse_seed_json(SEED).expect("Failed to parse seed");
    seed_engine(&engine, data).await.expect("Failed to seed");
    Arc::new(engine)
}

/// Seeded router with alerts computed as of 2025-04-01.
async fn create_test_app() -> Router {
    let app = create_router(create_test_engine().await);
    let (status, _) = send(app.clone(), "POST", "/api/analytics/recompute?as_of=2025-04-01", None).await;
    assert_eq!(status, StatusCode::OK);
    app
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(body)).await
}

// =============================================================================
// HEALTH
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(create_test_engine().await);

    let (status, json) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

// =============================================================================
// ANALYTICS
// =============================================================================

#[tokio::test]
async fn test_recompute_report() {
    let app = create_router(create_test_engine().await);

    let (status, json) = send(app, "POST", "/api/analytics/recompute?as_of=2025-04-01", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["loans_processed"], 2);
    assert_eq!(json["covenants_evaluated"], 2);
    assert_eq!(json["alerts_opened"], 2);
    assert_eq!(json["failed"], json!([]));
}

#[tokio::test]
async fn test_portfolio_summary() {
    let app = create_test_app().await;

    let (status, json) = get_json(app.clone(), "/api/analytics/portfolio-summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_loans"], 2);
    assert_eq!(json["breach_covenants"], 1);
    assert_eq!(json["compliant_covenants"], 1);
    assert_eq!(json["critical_alerts"], 1);
    assert_eq!(json["unread_alerts"], 2);

    let (_, scoped) = get_json(app, "/api/analytics/portfolio-summary?user_id=user-1").await;
    assert_eq!(scoped["total_loans"], 1);
    assert_eq!(scoped["breach_covenants"], 0);
}

#[tokio::test]
async fn test_risk_heatmap_worst_first() {
    let app = create_test_app().await;

    let (status, json) = get_json(app, "/api/analytics/risk-heatmap").await;
    assert_eq!(status, StatusCode::OK);
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["loan_id"], "loan-beta");
    assert_eq!(items[0]["status"], "breach");
    assert_eq!(items[1]["status"], "compliant");
}

#[tokio::test]
async fn test_critical_alerts_severity_order() {
    let app = create_test_app().await;

    let (status, json) = get_json(app.clone(), "/api/analytics/critical-alerts").await;
    assert_eq!(status, StatusCode::OK);
    let alerts = json.as_array().unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0]["alert_type"], "breach");
    assert_eq!(alerts[0]["severity"], "high");
    assert_eq!(alerts[1]["alert_type"], "prediction");
    assert_eq!(alerts[1]["days_until_breach"], 60);

    let (_, limited) = get_json(app, "/api/analytics/critical-alerts?limit=1").await;
    assert_eq!(limited.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_portfolio_trends_aligned() {
    let app = create_test_app().await;

    let (status, json) = get_json(app.clone(), "/api/analytics/portfolio-trends?as_of=2025-03-31").await;
    assert_eq!(status, StatusCode::OK);
    let months = json["months"].as_array().unwrap().len();
    assert_eq!(months, 6);
    assert_eq!(json["current_period"].as_array().unwrap().len(), months);
    assert_eq!(json["previous_period"].as_array().unwrap().len(), months);

    let (status, value) = get_json(app, "/api/analytics/portfolio-value?as_of=2025-03-31").await;
    assert_eq!(status, StatusCode::OK);
    assert!(value["current_value"].is_number());
    assert!(value["change_percentage"].is_number());
}

#[tokio::test]
async fn test_covenant_trends_shape() {
    let app = create_test_app().await;

    let (status, json) = get_json(app, "/api/analytics/covenant-trends?as_of=2025-04-01").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["compliant_change"].is_number());
    assert!(json["warning_change"].is_number());
    assert!(json["breach_change"].is_number());
}

#[tokio::test]
async fn test_invalid_as_of_is_bad_request() {
    let app = create_test_app().await;

    let (status, json) = get_json(app, "/api/analytics/portfolio-value?as_of=04/01/2025").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

// =============================================================================
// COVENANTS
// =============================================================================

#[tokio::test]
async fn test_covenants_for_loan() {
    let app = create_test_app().await;

    let (status, json) = get_json(app.clone(), "/api/covenants/loan/loan-acme").await;
    assert_eq!(status, StatusCode::OK);
    let covenants = json.as_array().unwrap();
    assert_eq!(covenants.len(), 1);
    assert_eq!(covenants[0]["id"], "cov-lev");
    assert_eq!(covenants[0]["threshold_operator"], "<=");
    assert_eq!(covenants[0]["latest_status"], "compliant");
    assert_eq!(covenants[0]["latest_value"], 1.2);

    let (status, json) = get_json(app, "/api/covenants/loan/loan-missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("loan-missing"));
}

#[tokio::test]
async fn test_covenant_detail_and_history() {
    let app = create_test_app().await;

    let (status, json) = get_json(app.clone(), "/api/covenants/cov-icr").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["latest_status"], "breach");
    assert_eq!(json["loan_title"], "Beta Revolver");

    let (status, json) = get_json(app, "/api/covenants/cov-lev/measurements").await;
    assert_eq!(status, StatusCode::OK);
    let history = json.as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["measurement_date"], "2025-03-02");
    assert_eq!(history[2]["measurement_date"], "2025-01-01");
}

#[tokio::test]
async fn test_record_measurement() {
    let app = create_test_app().await;

    let (status, json) = post_json(
        app.clone(),
        "/api/covenants/cov-icr/measurements",
        json!({ "measurement_date": "2025-06-30", "actual_value": 2.5, "notes": "Q2 certificate" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "compliant");
    assert_eq!(json["threshold_value"], 2.0);
    assert_eq!(json["threshold_operator"], ">=");

    let (status, json) = post_json(
        app.clone(),
        "/api/covenants/cov-icr/measurements",
        json!({ "measurement_date": "2025-06-30", "actual_value": 2.7 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].is_string());

    let (status, _) = post_json(
        app,
        "/api/covenants/cov-missing/measurements",
        json!({ "measurement_date": "2025-06-30", "actual_value": 2.7 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_prediction_endpoint() {
    let app = create_test_app().await;

    let (status, json) = get_json(app.clone(), "/api/covenants/cov-lev/prediction?as_of=2025-03-02").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["prediction"]["days_until_breach"], 90);
    assert_eq!(json["prediction"]["predicted_breach_date"], "2025-05-31");
    assert_eq!(json["trajectory"], "deteriorating");
    assert!(json["reason"].is_null());

    let (status, json) = get_json(app, "/api/covenants/cov-icr/prediction?as_of=2025-04-01").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["prediction"].is_null());
    assert_eq!(json["reason"], "insufficient_data");
}

#[tokio::test]
async fn test_covenant_trend_endpoint() {
    let app = create_test_app().await;

    let (status, json) = get_json(app, "/api/covenants/cov-lev/trend?as_of=2025-03-31").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["months"].as_array().unwrap().len(), 6);
    assert_eq!(json["current_period"].as_array().unwrap().len(), 6);
    assert_eq!(json["previous_period"].as_array().unwrap().len(), 6);
}

// =============================================================================
// LOANS
// =============================================================================

#[tokio::test]
async fn test_loan_crud() {
    let app = create_test_app().await;

    let new_loan = json!({
        "id": "loan-delta",
        "title": "Delta Facility",
        "borrower_name": "Delta LLC",
        "loan_amount": 750000,
        "covenants": [
            { "id": "cov-d1", "covenant_type": "current_ratio", "covenant_name": "Min Current Ratio",
              "threshold_value": 1.2, "threshold_operator": ">=" }
        ]
    });
    let (status, json) = post_json(app.clone(), "/api/loans", new_loan.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["id"], "loan-delta");
    assert_eq!(json["covenant_count"], 1);
    assert_eq!(json["status"], "unknown");

    let (status, _) = post_json(app.clone(), "/api/loans", new_loan).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, loans) = get_json(app.clone(), "/api/loans").await;
    assert_eq!(loans.as_array().unwrap().len(), 3);

    let (status, json) = send(app.clone(), "DELETE", "/api/loans/loan-delta", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["covenants_removed"], 1);

    let (status, _) = get_json(app, "/api/loans/loan-delta").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_loan_rejects_bad_operator() {
    let app = create_test_app().await;

    let (status, json) = post_json(
        app,
        "/api/loans",
        json!({
            "title": "Gamma Loan",
            "borrower_name": "Gamma Co",
            "loan_amount": 100000,
            "covenants": [
                { "covenant_type": "leverage_ratio", "covenant_name": "Leverage",
                  "threshold_value": 3.0, "threshold_operator": "at most" }
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("at most"));
}

#[tokio::test]
async fn test_recent_loans_limit() {
    let app = create_test_app().await;

    let (status, json) = get_json(app, "/api/analytics/recent-loans?limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
}

// =============================================================================
// ALERTS
// =============================================================================

#[tokio::test]
async fn test_alert_read_and_resolve() {
    let app = create_test_app().await;

    let (_, alerts) = get_json(app.clone(), "/api/alerts?severity=high").await;
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    let id = alerts[0]["id"].as_str().unwrap().to_string();

    let (status, json) = send(app.clone(), "PUT", &format!("/api/alerts/{id}/read"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_read"], true);

    let (_, unread) = get_json(app.clone(), "/api/alerts?unread_only=true").await;
    assert_eq!(unread.as_array().unwrap().len(), 1);

    let (status, json) = send(app.clone(), "PUT", &format!("/api/alerts/{id}/resolve"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_resolved"], true);

    let (_, open) = get_json(app.clone(), "/api/alerts").await;
    assert_eq!(open.as_array().unwrap().len(), 1);

    let (status, _) = send(app, "PUT", "/api/alerts/alert-missing/read", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// SEARCH
// =============================================================================

#[tokio::test]
async fn test_search() {
    let app = create_test_app().await;

    let (status, json) = get_json(app.clone(), "/api/search?q=acme").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["loans"][0]["id"], "loan-acme");
    assert_eq!(
        json["total"].as_u64().unwrap() as usize,
        json["loans"].as_array().unwrap().len() + json["covenants"].as_array().unwrap().len()
    );

    let (_, covenant_hit) = get_json(app.clone(), "/api/search?q=interest%20coverage").await;
    assert_eq!(covenant_hit["covenants"][0]["loan_title"], "Beta Revolver");

    let (_, short) = get_json(app, "/api/search?q=a").await;
    assert_eq!(short["total"], 0);
}

// =============================================================================
// SEED FILES
// =============================================================================

#[tokio::test]
async fn test_load_seed_files() {
    let mut json_file = tempfile::NamedTempFile::new().unwrap();
    json_file.write_all(SEED.as_bytes()).unwrap();

    let mut csv_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv_file, "covenant_id,measurement_date,actual_value,notes").unwrap();
    writeln!(csv_file, "cov-icr,2025-06-30,1.8,Q2").unwrap();
    writeln!(csv_file, "cov-icr,2025-03-31,1.6,duplicate of the JSON row").unwrap();
    writeln!(csv_file, "cov-unknown,2025-06-30,1.0,").unwrap();

    let config = ServerConfig {
        data_file: Some(json_file.path().display().to_string()),
        measurements_file: Some(csv_file.path().display().to_string()),
        ..ServerConfig::default()
    };
    let engine = CovenantEngineBuilder::new()
        .with_config(EngineConfig {
            refresh_interval_secs: 0,
            ..EngineConfig::default()
        })
        .with_storage(create_memory_storage())
        .build()
        .unwrap();

    let stats = load_seed_data(&engine, &config).await.unwrap();
    assert_eq!(
        stats,
        SeedStats {
            loans: 2,
            covenants: 2,
            measurements: 5,
            skipped: 2,
        }
    );

    let app = create_router(Arc::new(engine));
    let (_, history) = get_json(app, "/api/covenants/cov-icr/measurements").await;
    assert_eq!(history.as_array().unwrap().len(), 2);
    assert_eq!(history[0]["notes"], "Q2");
}
