use std::fs;
use std::time::Duration;

use pagelens_engine::{FailureKind, LoaderSettings, PageLoader};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn loads_html_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>ok</body></html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/doc", server.uri());
    let page = PageLoader::default().load(&url).await.expect("load ok");
    assert_eq!(page.url, url);
    assert_eq!(page.html, "<html><body>ok</body></html>");
    assert!(!page.restricted);
}

#[tokio::test]
async fn follows_redirects_and_reports_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>moved</p>", "text/html"))
        .mount(&server)
        .await;

    let page = PageLoader::default()
        .load(&format!("{}/old", server.uri()))
        .await
        .unwrap();
    assert_eq!(page.url, format!("{}/new", server.uri()));
}

#[tokio::test]
async fn redirect_loops_hit_the_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
        .mount(&server)
        .await;

    let loader = PageLoader::new(LoaderSettings {
        redirect_limit: 2,
        ..LoaderSettings::default()
    });
    let err = loader
        .load(&format!("{}/loop", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::RedirectLimitExceeded);
}

#[tokio::test]
async fn http_errors_are_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = PageLoader::default()
        .load(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn non_html_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let err = PageLoader::default()
        .load(&format!("{}/api", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::UnsupportedContentType {
            content_type: "application/json".into()
        }
    );
}

#[tokio::test]
async fn oversized_pages_are_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("x".repeat(64), "text/html"))
        .mount(&server)
        .await;

    let loader = PageLoader::new(LoaderSettings {
        max_bytes: 16,
        ..LoaderSettings::default()
    });
    let err = loader.load(&server.uri()).await.unwrap_err();
    assert!(matches!(err.kind, FailureKind::TooLarge { max_bytes: 16, .. }), "{err}");
}

#[tokio::test]
async fn slow_servers_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<p>late</p>", "text/html")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let loader = PageLoader::new(LoaderSettings {
        request_timeout: Duration::from_millis(50),
        ..LoaderSettings::default()
    });
    let err = loader.load(&server.uri()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn local_files_load_by_path_and_file_url() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("page.html");
    fs::write(&file, "<body><p>local</p></body>").unwrap();

    let by_path = PageLoader::default()
        .load(file.to_str().unwrap())
        .await
        .unwrap();
    assert!(by_path.url.starts_with("file://"));
    assert_eq!(by_path.html, "<body><p>local</p></body>");
    assert!(!by_path.restricted);

    let by_url = PageLoader::default().load(&by_path.url).await.unwrap();
    assert_eq!(by_url, by_path);
}

#[tokio::test]
async fn missing_files_are_io_errors() {
    let temp = TempDir::new().unwrap();
    let err = PageLoader::default()
        .load(temp.path().join("nope.html").to_str().unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Io);
}

#[tokio::test]
async fn other_schemes_load_as_restricted_pages() {
    let page = PageLoader::default().load("chrome://extensions").await.unwrap();
    assert!(page.restricted);
    assert!(page.html.is_empty());
}
