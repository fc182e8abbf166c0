#![allow(clippy::unwrap_used, clippy::panic, missing_docs)]

use sitesearch_core::config::CONFIG_FILE_NAME;
use sitesearch_core::{Error, SearchService, SerializedIndexData, run_build};
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(dir: &TempDir, body: &str) {
    fs::write(dir.path().join(CONFIG_FILE_NAME), body).unwrap();
}

async fn docs_site() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<main>
                 <h1>Handbook</h1>
                 <h2 id="setup">Setup</h2>
                 <p>Install the toolchain before anything else.</p>
                 <a href="/guide.html">guide</a>
               </main>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/guide.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<h2 id="usage">Usage</h2><p>Searching is instant once indexed.</p>"#,
        ))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn build_writes_searchable_artifact() {
    let server = docs_site().await;
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        &format!(
            r#"
            site_origin = "{}"
            start_url = "/"
            output_path = "public/site-search.json"
            concurrency = 2

            [[rules]]
            hierarchy = [{{ selector = "h1", default = "Handbook" }}, {{ selector = "h2" }}]
            text = {{ selector = "p" }}
            "#,
            server.uri()
        ),
    );

    let summary = run_build(dir.path()).await.unwrap();
    assert_eq!(summary.documents, 2);
    assert_eq!(summary.report.pages_fetched, 2);
    assert_eq!(summary.output_path, dir.path().join("public/site-search.json"));

    let data = SerializedIndexData::read(&summary.output_path).unwrap();
    assert_eq!(data.hierarchy_field_names, vec!["l_0", "l_1"]);

    let guide = data.corpus.iter().find(|doc| doc.path == "/guide.html").unwrap();
    assert_eq!(
        guide.hierarchy,
        vec![Some("Handbook".to_string()), Some("Usage".to_string())]
    );
    assert_eq!(guide.anchor.as_deref(), Some("usage"));

    let service = SearchService::new(data);
    let response = service.search(Some("toolch")).await.unwrap();
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].path, "/");
    assert_eq!(response.results[0].anchor.as_deref(), Some("setup"));
    assert_eq!(
        response.results[0].snippet.parts,
        vec!["Install the ", "toolchain", " before anything else."]
    );
}

#[tokio::test]
async fn invalid_config_fails_before_crawling() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        r#"
        site_origin = "http://127.0.0.1:9"
        start_url = "/"

        [[rules]]
        hierarchy = []
        text = { selector = "p[" }
        "#,
    );

    match run_build(dir.path()).await {
        Err(Error::InvalidConfig(problems)) => assert_eq!(problems.len(), 2, "{problems:?}"),
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn site_exiting_early_fails_build() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        r#"
        site_start_cmd = "exit 7"
        site_origin = "http://127.0.0.1:9"
        start_url = "/"

        [[rules]]
        hierarchy = [{ selector = "h1" }]
        text = { selector = "p" }
        "#,
    );

    let err = run_build(dir.path()).await.unwrap_err();
    assert!(matches!(err, Error::SiteProcessExited(_)), "{err:?}");
    assert!(err.to_string().contains("stopped unexpectedly"));
    assert!(!dir.path().join("sitesearch.json").exists());
}
