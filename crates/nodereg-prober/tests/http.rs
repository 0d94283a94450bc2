//! HTTP probing against a mock node.

use nodereg_core::{EndpointRole, Link, NodeRecord};
use nodereg_prober::{HttpProber, NodeProber, ProbeConfig, ProbeOutcome};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn prober() -> HttpProber {
    HttpProber::new(&ProbeConfig::default().with_timeout_secs(5)).unwrap()
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_text(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// An address nothing listens on.
fn closed_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

#[tokio::test]
async fn test_fetches_both_resources_by_url_suffix() {
    let server = MockServer::start().await;
    mount_json(&server, "/version", json!({"version": "1.2.3"})).await;
    mount_json(&server, "/services", json!({"services": []})).await;

    let record = NodeRecord::with_url(format!("{}/", server.uri()));
    match prober().probe("node", &record).await {
        ProbeOutcome::Fetched(payload) => {
            assert_eq!(payload.version["version"], "1.2.3");
            assert_eq!(payload.services["services"], json!([]));
        }
        other => panic!("expected fetched, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetches_by_link_table() {
    let server = MockServer::start().await;
    mount_json(&server, "/api/v", json!({"version": "2.0.0"})).await;
    mount_json(&server, "/api/c", json!({"services": [{"name": "a"}]})).await;

    let record = NodeRecord::with_links(vec![
        Link::new("version", format!("{}/api/v", server.uri())),
        Link::new("collection", format!("{}/api/c", server.uri())),
    ]);
    let outcome = prober().probe("node", &record).await;
    assert!(outcome.is_fetched(), "got {outcome:?}");
}

#[tokio::test]
async fn test_requests_json() {
    let server = MockServer::start().await;
    for (route, body) in [
        ("/version", json!({"version": "1.0.0"})),
        ("/services", json!({"services": []})),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let outcome = prober()
        .probe("node", &NodeRecord::with_url(server.uri()))
        .await;
    assert!(outcome.is_fetched(), "got {outcome:?}");
}

#[tokio::test]
async fn test_unreachable_node_is_offline() {
    let record = NodeRecord::with_url(closed_address());
    let outcome = prober().probe("node", &record).await;
    assert!(matches!(outcome, ProbeOutcome::Offline { .. }), "got {outcome:?}");
}

#[tokio::test]
async fn test_one_unreachable_endpoint_is_offline() {
    let server = MockServer::start().await;
    mount_json(&server, "/version", json!({"version": "1.0.0"})).await;

    let record = NodeRecord::with_links(vec![
        Link::new("version", format!("{}/version", server.uri())),
        Link::new("collection", format!("{}/services", closed_address())),
    ]);
    let outcome = prober().probe("node", &record).await;
    assert!(matches!(outcome, ProbeOutcome::Offline { .. }), "got {outcome:?}");
}

#[tokio::test]
async fn test_invalid_json_is_unresponsive() {
    let server = MockServer::start().await;
    mount_text(&server, "/version", "<html>maintenance</html>").await;
    mount_json(&server, "/services", json!({"services": []})).await;

    let outcome = prober()
        .probe("node", &NodeRecord::with_url(server.uri()))
        .await;
    match outcome {
        ProbeOutcome::Unresponsive { role, body } => {
            assert_eq!(role, EndpointRole::Version);
            assert_eq!(body, "<html>maintenance</html>");
        }
        other => panic!("expected unresponsive, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_object_services_is_unresponsive() {
    let server = MockServer::start().await;
    mount_json(&server, "/version", json!({"version": "1.0.0"})).await;
    mount_json(&server, "/services", json!([{"name": "a"}])).await;

    let outcome = prober()
        .probe("node", &NodeRecord::with_url(server.uri()))
        .await;
    assert!(
        matches!(
            outcome,
            ProbeOutcome::Unresponsive {
                role: EndpointRole::Collection,
                ..
            }
        ),
        "got {outcome:?}"
    );
}

#[tokio::test]
async fn test_version_body_checked_first() {
    let server = MockServer::start().await;
    mount_text(&server, "/version", "not json").await;
    mount_text(&server, "/services", "also not json").await;

    let outcome = prober()
        .probe("node", &NodeRecord::with_url(server.uri()))
        .await;
    assert!(
        matches!(
            outcome,
            ProbeOutcome::Unresponsive {
                role: EndpointRole::Version,
                ..
            }
        ),
        "got {outcome:?}"
    );
}

#[tokio::test]
async fn test_error_status_with_json_body_is_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/version"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "busy"})))
        .mount(&server)
        .await;
    mount_json(&server, "/services", json!({"services": []})).await;

    let outcome = prober()
        .probe("node", &NodeRecord::with_url(server.uri()))
        .await;
    assert!(outcome.is_fetched(), "got {outcome:?}");
}

#[tokio::test]
async fn test_missing_collection_link_is_offline() {
    let server = MockServer::start().await;
    let record = NodeRecord::with_links(vec![Link::new(
        "version",
        format!("{}/version", server.uri()),
    )]);

    let outcome = prober().probe("node", &record).await;
    match outcome {
        ProbeOutcome::Offline { reason } => assert!(reason.contains("collection")),
        other => panic!("expected offline, got {other:?}"),
    }
}
