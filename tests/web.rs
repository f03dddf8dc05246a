mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use warp::http::{HeaderMap, StatusCode};
use warp::test::request;

use common::{sample_records, Reply, StubSearch};
use research_assistant::app::Assistant;
use research_assistant::config::AppConfig;
use research_assistant::session::SessionRegistry;
use research_assistant::web::routes;

fn setup(reply: Reply) -> (Arc<Assistant>, Arc<SessionRegistry>) {
    let assistant = Assistant::new(Box::new(StubSearch::new(reply)), None, &AppConfig::default());
    (Arc::new(assistant), Arc::new(SessionRegistry::default()))
}

fn body_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("json body")
}

fn session_cookie(headers: &HeaderMap) -> String {
    let header = headers
        .get("set-cookie")
        .expect("cookie issued")
        .to_str()
        .unwrap();
    header.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn index_serves_the_page() {
    let (assistant, sessions) = setup(Reply::Records(vec![]));
    let filter = routes(assistant, sessions);

    let res = request().method("GET").path("/").reply(&filter).await;

    assert_eq!(res.status(), StatusCode::OK);
    let html = String::from_utf8_lossy(res.body());
    assert!(html.contains("Scientific Search Assistant"));
    assert!(html.contains("value=\"2020-01-01\""));
}

#[tokio::test]
async fn search_then_export_with_the_same_session() {
    let (assistant, sessions) = setup(Reply::Records(sample_records()));
    let filter = routes(assistant, sessions.clone());

    let res = request()
        .method("POST")
        .path("/api/search")
        .json(&json!({
            "topic": "soil carbon",
            "start_date": "2020-01-01",
            "end_date": "2024-12-31",
            "language": "en,es"
        }))
        .reply(&filter)
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    let cookie = session_cookie(res.headers());
    assert!(cookie.starts_with("rs_session="));
    let view = body_json(res.body());
    assert_eq!(view["status"], "ok");
    assert_eq!(view["records"].as_array().unwrap().len(), 2);
    assert_eq!(view["summary"]["total_count"], 2);

    let csv = request()
        .method("GET")
        .path("/api/export/csv")
        .header("cookie", cookie.as_str())
        .reply(&filter)
        .await;
    assert_eq!(csv.status(), StatusCode::OK);
    assert!(csv.headers().get("set-cookie").is_none());
    assert_eq!(
        csv.headers()["content-disposition"],
        "attachment; filename=\"busqueda_soil_carbon.csv\""
    );
    assert!(csv.body().starts_with(b"\xEF\xBB\xBF"));

    let state = request()
        .method("GET")
        .path("/api/session")
        .header("cookie", cookie.as_str())
        .reply(&filter)
        .await;
    let state = body_json(state.body());
    assert_eq!(state["state"], "displayed");
    assert_eq!(state["result_count"], 2);
    assert_eq!(sessions.len().await, 1);
}

#[tokio::test]
async fn export_from_a_fresh_session_is_not_found() {
    let (assistant, sessions) = setup(Reply::Records(sample_records()));
    let filter = routes(assistant, sessions);

    let res = request().method("GET").path("/api/export/pdf").reply(&filter).await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = body_json(res.body());
    assert_eq!(body["kind"], "not_found");
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn blank_topic_is_a_bad_request() {
    let (assistant, sessions) = setup(Reply::Records(sample_records()));
    let filter = routes(assistant, sessions);

    let res = request()
        .method("POST")
        .path("/api/search")
        .json(&json!({ "topic": "  " }))
        .reply(&filter)
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res.body());
    assert_eq!(body["kind"], "validation");
    assert_eq!(body["message"], "Please enter a research topic.");
}

#[tokio::test]
async fn upstream_failure_is_a_bad_gateway() {
    let (assistant, sessions) = setup(Reply::ServerError(500, "boom"));
    let filter = routes(assistant, sessions);

    let res = request()
        .method("POST")
        .path("/api/search")
        .json(&json!({ "topic": "soil" }))
        .reply(&filter)
        .await;

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(res.body());
    assert_eq!(body["kind"], "server");
    assert_eq!(body["message"], "Server error (500): boom");
}

#[tokio::test]
async fn empty_result_is_informational() {
    let (assistant, sessions) = setup(Reply::Records(vec![]));
    let filter = routes(assistant, sessions);

    let res = request()
        .method("POST")
        .path("/api/search")
        .json(&json!({ "topic": "nothing" }))
        .reply(&filter)
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res.body());
    assert_eq!(body["status"], "info");
    assert_eq!(body["kind"], "no_results");
}

#[tokio::test]
async fn history_without_store_is_unavailable() {
    let (assistant, sessions) = setup(Reply::Records(vec![]));
    let filter = routes(assistant, sessions);

    let res = request().method("GET").path("/api/history").reply(&filter).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let res = request().method("GET").path("/api/history/3").reply(&filter).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn forged_cookie_is_replaced() {
    let (assistant, sessions) = setup(Reply::Records(vec![]));
    let filter = routes(assistant, sessions);

    let res = request()
        .method("GET")
        .path("/api/session")
        .header("cookie", "rs_session=../../etc")
        .reply(&filter)
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    let cookie = session_cookie(res.headers());
    assert_eq!(cookie.len(), "rs_session=".len() + 24);
    assert_eq!(body_json(res.body())["state"], "idle");
}

#[tokio::test]
async fn cookieless_reads_do_not_register_sessions() {
    let (assistant, sessions) = setup(Reply::Records(sample_records()));
    let filter = routes(assistant, sessions.clone());

    for _ in 0..200 {
        let res = request().method("GET").path("/api/session").reply(&filter).await;
        assert_eq!(res.status(), StatusCode::OK);
        let res = request().method("GET").path("/api/export/csv").reply(&filter).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    assert!(sessions.is_empty().await);
}

#[tokio::test]
async fn cookieless_searches_stay_within_the_session_cap() {
    let assistant = Assistant::new(
        Box::new(StubSearch::new(Reply::Records(sample_records()))),
        None,
        &AppConfig::default(),
    );
    let sessions = Arc::new(SessionRegistry::with_limits(Duration::from_secs(3600), 5));
    let filter = routes(Arc::new(assistant), sessions.clone());

    for _ in 0..50 {
        let res = request()
            .method("POST")
            .path("/api/search")
            .json(&json!({ "topic": "soil" }))
            .reply(&filter)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    assert_eq!(sessions.len().await, 5);
}

#[tokio::test]
async fn script_urls_are_not_linked() {
    let records = vec![json!({
        "titulo": "Injected",
        "url": "javascript:alert(document.cookie)"
    })];
    let (assistant, sessions) = setup(Reply::Records(records));
    let filter = routes(assistant, sessions);

    let res = request()
        .method("POST")
        .path("/api/search")
        .json(&json!({ "topic": "soil" }))
        .reply(&filter)
        .await;

    let view = body_json(res.body());
    assert_eq!(view["records"][0]["title"], "Injected");
    assert_eq!(view["records"][0]["link"], Value::Null);
}
