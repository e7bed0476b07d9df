//! Integration tests for the run-history endpoints.

mod common;

use axum::http::StatusCode;
use chrono::NaiveDate;
use common::{authed, body_json, get};
use sqlx::PgPool;

use wxcard_db::models::run::NewRun;
use wxcard_db::repositories::RunRepo;

async fn seed_run(pool: &PgPool, run_id: &str, succeed: bool) {
    RunRepo::insert(
        pool,
        &NewRun {
            run_id: run_id.to_string(),
            city: "杭州市".to_string(),
            weather_date: NaiveDate::from_ymd_opt(2026, 8, 4).unwrap(),
        },
    )
    .await
    .unwrap();
    if succeed {
        RunRepo::mark_succeeded(pool, run_id, "cards/k.png", "m", 1)
            .await
            .unwrap();
    } else {
        RunRepo::mark_failed(pool, run_id, "boom", 1).await.unwrap();
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn logs_require_the_shared_secret(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/logs").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn logs_list_returns_rows_and_pagination_metadata(pool: PgPool) {
    seed_run(&pool, "ok", true).await;
    seed_run(&pool, "bad", false).await;

    let app = common::build_test_app(pool);
    let response = authed(app, "GET", "/api/v1/logs?page=1&limit=30").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["page"], 1);
    assert_eq!(json["limit"], 30);
    assert_eq!(json["logs"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn logs_status_filter_is_applied(pool: PgPool) {
    seed_run(&pool, "ok", true).await;
    seed_run(&pool, "bad", false).await;

    let app = common::build_test_app(pool);
    let response = authed(app, "GET", "/api/v1/logs?status=failed").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["logs"][0]["run_id"], "bad");
    assert_eq!(json["logs"][0]["error_message"], "boom");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn deleting_a_run_removes_it(pool: PgPool) {
    seed_run(&pool, "ok", true).await;

    let app = common::build_test_app(pool.clone());
    let response = authed(app.clone(), "DELETE", "/api/v1/logs/ok").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], true);

    assert!(RunRepo::find_by_run_id(&pool, "ok").await.unwrap().is_none());

    // Deleting again is a 404.
    let response = authed(app, "DELETE", "/api/v1/logs/ok").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
