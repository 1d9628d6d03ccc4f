//! Loading configuration files from disk and building a chain from them.

use std::io::Write;

use http::{header, Method, StatusCode};
use tempfile::{Builder, NamedTempFile};
use toolbox_config::{ConfigError, ConfigLoader};
use toolbox_core::{body, Request, RequestContext, Response};

fn config_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn make_request(method: Method, path: &str, headers: &[(&str, &str)]) -> Request {
    let mut builder = http::Request::builder().method(method).uri(path);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(body::empty()).unwrap()
}

async fn echo_trace_id(ctx: RequestContext, _request: Request) -> Response {
    http::Response::builder()
        .header(header::CONTENT_TYPE, "text/plain")
        .body(body::full(ctx.trace_id().to_owned()))
        .unwrap()
}

#[test]
fn test_toml_file() {
    let file = config_file(
        ".toml",
        r#"
        [exclusion]
        paths = ["/healthz"]

        [cors]
        allowed_origins = ["https://app.example.com"]
        allow_credentials = true

        [json]
        max_bytes = 2048
        "#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert_eq!(config.exclusion.paths, vec!["/healthz"]);
    assert!(config.cors.allow_credentials);
    assert_eq!(config.json_responder().max_bytes(), 2048);
}

#[test]
fn test_json_file_over_toml_file() {
    let base = config_file(".toml", "[compression]\nlevel = 3\nmin_size = 10");
    let overlay = config_file(".json", r#"{"compression": {"level": 8}}"#);

    let config = ConfigLoader::new()
        .with_file(base.path())
        .unwrap()
        .with_optional_file(overlay.path())
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(config.compression.level, 8);
    assert_eq!(config.compression.min_size, 10);
}

#[test]
fn test_unsupported_extension() {
    let file = config_file(".yaml", "cors: {}");
    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
}

#[test]
fn test_malformed_toml() {
    let file = config_file(".toml", "[cors\nenabled = true");
    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::TomlError(_))));
}

#[test]
fn test_wildcard_with_credentials_rejected_on_load() {
    let file = config_file(
        ".toml",
        r#"
        [cors]
        allowed_origins = ["*"]
        allow_credentials = true
        "#,
    );

    let result = ConfigLoader::new().with_file(file.path()).unwrap().load();
    assert!(matches!(result, Err(ConfigError::Cors(_))));
}

#[tokio::test]
async fn test_chain_from_file() {
    let file = config_file(
        ".toml",
        r#"
        [exclusion]
        paths = ["/healthz"]

        [trace_id]
        echo_response_header = true

        [cors]
        allowed_origins = ["https://app.example.com"]
        "#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    let chain = config.chain_builder().unwrap().build(echo_trace_id);

    let response = chain
        .handle(make_request(
            Method::GET,
            "/v1/orders",
            &[("X-Request-Id", "req-7"), ("Origin", "https://app.example.com")],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-7");
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://app.example.com"
    );

    let response = chain
        .handle(make_request(Method::GET, "/healthz", &[("X-Request-Id", "req-8")]))
        .await;
    assert!(response.headers().get("x-request-id").is_none());
    assert_eq!(body::to_bytes(response.into_body()).await.unwrap(), "unknown");
}
