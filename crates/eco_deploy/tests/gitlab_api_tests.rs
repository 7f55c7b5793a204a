//! GitLab API client tests against a one-shot local HTTP server.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use eco_deploy::{
    extract_pipeline_id, parse_trigger_response, post_merge_request_comment, CommentConfig,
    DeployConfig, DeployError, GitLabPipelines, PipelineAction, PipelineBackend, PipelineStatus,
};
use eco_iac::DeploymentId;

/// Serve one request with a canned response; the raw request is sent back.
async fn serve_once(status_line: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        let _ = tx.send(request);
    });

    (format!("http://{}", addr), rx)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn config(base: &str) -> DeployConfig {
    DeployConfig::default()
        .with_pipeline("glptt-test", "4242")
        .with_api_url(format!("{}/api/v4", base))
        .with_project_url("https://gitlab.com/acme/infra")
}

fn id() -> DeploymentId {
    DeploymentId::parse("abc-123").unwrap()
}

#[tokio::test]
async fn test_trigger_posts_form_and_builds_missing_url() {
    let (base, request) = serve_once("201 Created", r#"{"id": 55, "status": "created"}"#).await;
    let client = GitLabPipelines::from_config(&config(&base)).unwrap();

    let result = client
        .trigger(r#"[{"type":"storage"}]"#, &id(), PipelineAction::Apply)
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.pipeline_id, Some(55));
    assert_eq!(
        result.pipeline_url.as_deref(),
        Some("https://gitlab.com/acme/infra/-/pipelines/55")
    );

    let request = request.await.unwrap();
    assert!(request.starts_with("POST /api/v4/projects/4242/trigger/pipeline "));
    assert!(request.contains("token=glptt-test"));
    assert!(request.contains("ref=main"));
    assert!(request.contains("variables%5BECOARCH_DEPLOYMENT_ID%5D=abc-123"));
    assert!(request.contains("variables%5BECOARCH_ACTION%5D=apply"));
    assert!(request.contains("variables%5BTF_VAR_architecture_json%5D="));
}

#[tokio::test]
async fn test_trigger_rejection_keeps_status_and_body() {
    let (base, _request) = serve_once("400 Bad Request", r#"{"message":"400 Bad request - reference not found"}"#).await;
    let client = GitLabPipelines::from_config(&config(&base)).unwrap();

    let result = client.trigger("[]", &id(), PipelineAction::Destroy).await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.starts_with("GitLab API 400"));
    assert!(error.contains("reference not found"));
}

#[tokio::test]
async fn test_trigger_unreachable_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = GitLabPipelines::from_config(&config(&base)).unwrap();
    let result = client.trigger("[]", &id(), PipelineAction::Apply).await;

    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("Cannot reach GitLab"));
}

#[tokio::test]
async fn test_status_sends_private_token() {
    let (base, request) = serve_once("200 OK", r#"{"id": 9, "status": "waiting_for_resource"}"#).await;
    let mut config = config(&base);
    config.api_token = Some("read-token".to_string());
    let client = GitLabPipelines::from_config(&config).unwrap();

    let status = client.status(9).await.unwrap();
    assert_eq!(status, Some(PipelineStatus::Running));

    let request = request.await.unwrap();
    assert!(request.starts_with("GET /api/v4/projects/4242/pipelines/9 "));
    assert!(request.to_lowercase().contains("private-token: read-token"));
}

#[tokio::test]
async fn test_status_error_is_reported() {
    let (base, _request) = serve_once("404 Not Found", r#"{"message":"404 Not found"}"#).await;
    let client = GitLabPipelines::from_config(&config(&base)).unwrap();

    let err = client.status(1).await.unwrap_err();
    assert!(matches!(err, DeployError::RemoteTrigger(ref msg) if msg.starts_with("GitLab API 404")));
}

#[tokio::test]
async fn test_merge_request_comment_is_posted() {
    let (base, request) = serve_once("201 Created", r#"{"id": 1}"#).await;
    let config = CommentConfig {
        server_url: Some(base),
        project_id: Some("42".to_string()),
        merge_request_iid: Some("7".to_string()),
        token: Some("ci-token".to_string()),
        extra_host: Some("127.0.0.1".to_string()),
    };

    let posted = post_merge_request_comment(&config, "## EcoArch FinOps Analysis")
        .await
        .unwrap();
    assert!(posted);

    let request = request.await.unwrap();
    assert!(request.starts_with("POST /api/v4/projects/42/merge_requests/7/notes "));
    assert!(request.contains(r###"{"body":"## EcoArch FinOps Analysis"}"###));
}

#[tokio::test]
async fn test_merge_request_comment_on_foreign_host_is_blocked() {
    let config = CommentConfig {
        server_url: Some("http://127.0.0.1:9".to_string()),
        project_id: Some("42".to_string()),
        merge_request_iid: Some("7".to_string()),
        token: Some("ci-token".to_string()),
        extra_host: None,
    };

    assert!(matches!(
        post_merge_request_comment(&config, "report").await,
        Err(DeployError::CommentRejected(_))
    ));
}

#[tokio::test]
async fn test_merge_request_comment_rejected_by_server() {
    let (base, _request) = serve_once("403 Forbidden", r#"{"message":"403 Forbidden"}"#).await;
    let config = CommentConfig {
        server_url: Some(base),
        project_id: Some("42".to_string()),
        merge_request_iid: Some("7".to_string()),
        token: Some("ci-token".to_string()),
        extra_host: Some("127.0.0.1".to_string()),
    };

    let err = post_merge_request_comment(&config, "report").await.unwrap_err();
    assert!(err.to_string().contains("GitLab API 403"));
}

#[test]
fn test_parse_trigger_response() {
    let sent = parse_trigger_response(
        201,
        r#"{"id": 12, "web_url": "https://gitlab.com/g/p/-/pipelines/12"}"#,
        "https://ignored",
    );
    assert_eq!(sent.pipeline_url.as_deref(), Some("https://gitlab.com/g/p/-/pipelines/12"));

    let empty_url = parse_trigger_response(201, r#"{"id": 12, "web_url": ""}"#, "https://gitlab.com/g/p/");
    assert_eq!(empty_url.pipeline_url.as_deref(), Some("https://gitlab.com/g/p/-/pipelines/12"));

    assert!(!parse_trigger_response(200, r#"{"id": 12}"#, "x").success);
    assert!(!parse_trigger_response(201, "{}", "x").success);
    assert!(!parse_trigger_response(201, "<html>", "x").success);

    let long = "x".repeat(500);
    let failed = parse_trigger_response(502, &long, "x");
    assert!(failed.error.unwrap().len() < 230);
}

#[test]
fn test_extract_pipeline_id() {
    assert_eq!(extract_pipeline_id("https://gitlab.com/g/p/-/pipelines/123"), Some(123));
    assert_eq!(extract_pipeline_id("https://gitlab.com/g/p/-/pipelines/123/"), Some(123));
    assert_eq!(extract_pipeline_id("https://gitlab.com/g/p/-/pipelines/abc"), None);
    assert_eq!(extract_pipeline_id("https://gitlab.com/g/p/-/jobs/5"), None);
    assert_eq!(extract_pipeline_id(""), None);
}
