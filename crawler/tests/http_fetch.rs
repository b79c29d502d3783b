use axum::http::{header, StatusCode};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use catalog_core::{Fetch, FetchError};
use catalog_crawler::{FetchOptions, HttpFetcher};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

async fn serve_catalog() -> Url {
    let app = Router::new()
        .route("/robots.txt", get(|| async { "User-agent: *\nDisallow: /private\n" }))
        .route("/ok", get(|| async { Html("<html><body><h1>Fotografía</h1></body></html>") }))
        .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "no such course") }))
        .route("/catalogo.pdf", get(|| async { ([(header::CONTENT_TYPE, "application/pdf")], "%PDF-1.4") }))
        .route("/private/curso", get(|| async { Html("<html></html>") }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Html("<html></html>")
            }),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}

fn fetcher(respect_robots: bool) -> HttpFetcher {
    HttpFetcher::new(FetchOptions {
        timeout: Duration::from_millis(300),
        respect_robots,
        ..FetchOptions::default()
    })
    .unwrap()
}

#[tokio::test]
async fn html_page_is_returned() {
    let base = serve_catalog().await;
    let body = fetcher(true).fetch(&base.join("ok").unwrap()).await.unwrap();
    assert!(body.contains("<h1>Fotografía</h1>"));
}

#[tokio::test]
async fn error_responses_map_to_fetch_errors() {
    let base = serve_catalog().await;
    let f = fetcher(true);

    let err = f.fetch(&base.join("missing").unwrap()).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, .. }), "{err:?}");

    let err = f.fetch(&base.join("catalogo.pdf").unwrap()).await.unwrap_err();
    assert!(matches!(err, FetchError::Unsupported { ref reason, .. } if reason.contains("application/pdf")), "{err:?}");

    let err = f.fetch(&base.join("slow").unwrap()).await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout { .. }), "{err:?}");
}

#[tokio::test]
async fn robots_rules_are_enforced_unless_ignored() {
    let base = serve_catalog().await;
    let url = base.join("private/curso").unwrap();

    let err = fetcher(true).fetch(&url).await.unwrap_err();
    assert!(matches!(err, FetchError::Disallowed { .. }), "{err:?}");

    assert!(fetcher(false).fetch(&url).await.is_ok());
}
