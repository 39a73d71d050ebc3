use axum::body::Body;
use axum::http::{Request, StatusCode};
use pagelens_core::models::CrawlResult;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::integration::common::{json_body, setup_test_app};

const SITE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Mock Site</title></head>
<body>
  <h1>Hello</h1><h2>A</h2><h2>B</h2>
  <a href="/about">About</a>
  <a href="/gone">Gone</a>
  <form><input type="password" name="secret"></form>
</body>
</html>"#;

async fn mock_site() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SITE))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "ok");
    assert_eq!(json["pending_jobs"], 0);
}

#[tokio::test]
async fn missing_or_wrong_key_returns_401() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/v1/urls").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get("/v1/urls")
                .header("authorization", "Bearer wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "unauthorized");
}

#[tokio::test]
async fn submitted_url_is_crawled_and_retrievable() {
    let app = setup_test_app().await;
    let site = mock_site().await;
    let url = format!("{}/", site.uri());

    let response = app.send("POST", "/v1/urls", Some(json!({ "url": url }))).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = json_body(response).await;
    assert_eq!(json["status"], "queued");
    let id = json["id"].as_str().unwrap().to_string();

    app.wait_for_crawls().await;

    let response = app.send("GET", &format!("/v1/urls/{id}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "completed");
    assert_eq!(json["page_title"], "Mock Site");
    assert_eq!(json["html_version"], "HTML5");
    assert_eq!(json["headings"]["h1"], 1);
    assert_eq!(json["headings"]["h2"], 2);
    assert_eq!(json["internal_links_count"], 2);
    assert_eq!(json["external_links_count"], 0);
    assert_eq!(json["inaccessible_links_count"], 1);
    assert_eq!(json["broken_links"][0]["status_code"], 404);
    assert_eq!(json["has_login_form"], true);
}

#[tokio::test]
async fn unreachable_url_is_recorded_as_error() {
    let app = setup_test_app().await;
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);

    let response = app.send("POST", "/v1/urls", Some(json!({ "url": url }))).await;
    let id = json_body(response).await["id"].as_str().unwrap().to_string();
    app.wait_for_crawls().await;

    let json = json_body(app.send("GET", &format!("/v1/urls/{id}"), None).await).await;
    assert_eq!(json["status"], "error");
    assert!(!json["error_message"].as_str().unwrap().is_empty());
    assert_eq!(json["internal_links_count"], 0);
    assert!(json["headings"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_urls_are_rejected() {
    let app = setup_test_app().await;

    for bad in ["not a url", "ftp://files.example/", "/relative/path"] {
        let response = app.send("POST", "/v1/urls", Some(json!({ "url": bad }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{bad}");
        assert_eq!(json_body(response).await["error"], "validation_error");
    }
    assert!(app.db.result_repo().list(&Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn get_unknown_result_returns_404() {
    let app = setup_test_app().await;

    let response = app
        .send("GET", &format!("/v1/urls/{}", uuid::Uuid::new_v4()), None)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "not_found");
}

#[tokio::test]
async fn list_filters_sorts_and_validates() {
    let app = setup_test_app().await;
    let repo = app.db.result_repo();
    for (url, internal) in [
        ("https://docs.example/a", 4),
        ("https://blog.example/b", 8),
        ("https://docs.example/c", 1),
    ] {
        let mut record = CrawlResult::queued(url);
        record.internal_links_count = internal;
        repo.create(&record).await.unwrap();
    }

    let response = app
        .send("GET", "/v1/urls?filter=docs&sort_by=-internal_links_count", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let urls: Vec<&str> = json["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["url"].as_str().unwrap())
        .collect();
    assert_eq!(urls, vec!["https://docs.example/a", "https://docs.example/c"]);

    let json = json_body(app.send("GET", "/v1/urls?limit=1&offset=1", None).await).await;
    assert_eq!(json["limit"], 1);
    assert_eq!(json["results"].as_array().unwrap().len(), 1);

    let response = app.send("GET", "/v1/urls?sort_by=password", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_removes_requested_results() {
    let app = setup_test_app().await;
    let repo = app.db.result_repo();
    let a = repo.create(&CrawlResult::queued("https://a.example")).await.unwrap();
    let b = repo.create(&CrawlResult::queued("https://b.example")).await.unwrap();

    let response = app
        .send("DELETE", "/v1/urls", Some(json!({ "ids": [a, uuid::Uuid::new_v4()] })))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["deleted"], 1);
    assert!(repo.get(a).await.unwrap_err().is_not_found());
    assert!(repo.get(b).await.is_ok());
}

#[tokio::test]
async fn rerun_recrawls_existing_results_in_place() {
    let app = setup_test_app().await;
    let site = mock_site().await;
    let repo = app.db.result_repo();

    let mut stale = CrawlResult::queued(format!("{}/", site.uri()));
    stale.mark_completed();
    stale.internal_links_count = 10;
    stale.headings.insert("h5".into(), 3);
    let id = repo.create(&stale).await.unwrap();
    let ghost = uuid::Uuid::new_v4();

    let response = app
        .send("POST", "/v1/urls/rerun", Some(json!({ "ids": [id, ghost, id, ghost] })))
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = json_body(response).await;
    assert_eq!(json["submitted"], 1);
    assert_eq!(json["missing"], json!([ghost.to_string()]));

    app.wait_for_crawls().await;

    let refreshed = repo.get(id).await.unwrap();
    assert_eq!(refreshed.internal_links_count, 2);
    assert_eq!(refreshed.headings.get("h5"), None);
    assert_eq!(refreshed.page_title, "Mock Site");
    assert_eq!(repo.list(&Default::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["info"]["title"], "PageLens API");
    assert!(json["paths"]["/v1/urls"].is_object());
}
