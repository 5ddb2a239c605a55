//! IMDSv2 client tests using wiremock
//!
//! Verifies the token-then-fetch protocol (methods, paths, headers), status
//! and transport failures, and a full bind with a mocked metadata service.

use std::sync::Arc;
use std::time::Duration;

use eip_binder::test_utils::{DirectoryCall, MockDirectory};
use eip_binder::{
    Address, AttachmentPoint, BindError, Binder, ImdsClient, MetadataClient, MetadataConfig,
    MetadataError,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// HELPERS
// =============================================================================

fn client_for(server: &MockServer) -> ImdsClient {
    let config = MetadataConfig::default().with_endpoint(&server.uri()).unwrap();
    ImdsClient::from_config(&config).unwrap()
}

async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("PUT"))
        .and(path("/latest/api/token"))
        .and(header("X-aws-ec2-metadata-token-ttl-seconds", "300"))
        .respond_with(ResponseTemplate::new(200).set_body_string(token))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_value(server: &MockServer, token: &str, metadata_path: &str, value: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/latest/{}", metadata_path)))
        .and(header("X-aws-ec2-metadata-token", token))
        .respond_with(ResponseTemplate::new(200).set_body_string(value))
        .expect(1)
        .mount(server)
        .await;
}

// =============================================================================
// TOKEN
// =============================================================================

#[tokio::test]
async fn test_token_is_put_with_ttl_header() {
    let server = MockServer::start().await;
    mount_token(&server, "test-token-abc").await;

    let token = client_for(&server).fetch_token().await.unwrap();

    assert_eq!(token, "test-token-abc");
}

#[tokio::test]
async fn test_token_ttl_is_configurable() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/latest/api/token"))
        .and(header("X-aws-ec2-metadata-token-ttl-seconds", "60"))
        .respond_with(ResponseTemplate::new(200).set_body_string("short-lived"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).with_token_ttl(60);

    assert_eq!(client.fetch_token().await.unwrap(), "short-lived");
}

#[tokio::test]
async fn test_token_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/latest/api/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_token().await.unwrap_err();

    assert_eq!(
        err,
        MetadataError::Status {
            path: "api/token".to_string(),
            status: 500,
        }
    );
}

#[tokio::test]
async fn test_token_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/latest/api/token"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client_for(&server).fetch_token().await.is_err());
    // expect(1) is verified when the server drops
}

// =============================================================================
// METADATA READS
// =============================================================================

#[tokio::test]
async fn test_metadata_get_carries_token() {
    let server = MockServer::start().await;
    mount_value(&server, "tok", "meta-data/public-ipv4", "54.1.2.3").await;

    let value = client_for(&server)
        .fetch_metadata("tok", "meta-data/public-ipv4")
        .await
        .unwrap();

    assert_eq!(value, "54.1.2.3");
}

#[tokio::test]
async fn test_metadata_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest/meta-data/public-ipv4"))
        .and(header_exists("X-aws-ec2-metadata-token"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_metadata("tok", "meta-data/public-ipv4")
        .await
        .unwrap_err();

    assert!(matches!(err, MetadataError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_metadata_unauthorized_without_valid_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest/meta-data/instance-id"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_metadata("expired", "meta-data/instance-id")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        MetadataError::Status {
            path: "meta-data/instance-id".to_string(),
            status: 401,
        }
    );
}

#[tokio::test]
async fn test_metadata_timeout_is_a_request_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest/meta-data/instance-id"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("i-slow")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = MetadataConfig {
        timeout: Duration::from_millis(200),
        ..MetadataConfig::default().with_endpoint(&server.uri()).unwrap()
    };
    let client = ImdsClient::from_config(&config).unwrap();

    let err = client
        .fetch_metadata("tok", "meta-data/instance-id")
        .await
        .unwrap_err();

    assert!(matches!(err, MetadataError::Request { .. }));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_request_error() {
    // Bind then drop a listener so the port is closed
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = MetadataConfig::default()
        .with_endpoint(&format!("http://127.0.0.1:{}", port))
        .unwrap();
    let client = ImdsClient::from_config(&config).unwrap();

    let err = client.fetch_token().await.unwrap_err();

    assert!(matches!(err, MetadataError::Request { ref path, .. } if path == "api/token"));
}

// =============================================================================
// FULL BIND WITH A MOCKED METADATA SERVICE
// =============================================================================

#[tokio::test]
async fn test_bind_with_wiremock_metadata() {
    let server = MockServer::start().await;
    mount_token(&server, "integration-test-token").await;
    mount_value(&server, "integration-test-token", "meta-data/public-ipv4", "10.0.0.1").await;
    mount_value(&server, "integration-test-token", "meta-data/instance-id", "i-myinst").await;

    let directory = Arc::new(
        MockDirectory::new()
            .with_address(Address::new("54.162.153.80", "eipalloc-111"))
            .with_attachment_point(AttachmentPoint::new("eni-aaa"))
            .with_new_association("eipassoc-new"),
    );
    let binder = Binder::new(directory.clone(), Arc::new(client_for(&server)));

    let result = binder
        .bind("54.162.153.80", &CancellationToken::new())
        .await
        .unwrap();

    assert!(!result.already_bound);
    assert_eq!(result.instance_id, "i-myinst");
    assert_eq!(result.association_id.as_deref(), Some("eipassoc-new"));
    assert_eq!(
        directory.calls()[1],
        DirectoryCall::FindAttachmentPoints("10.0.0.1".to_string())
    );
}

#[tokio::test]
async fn test_bind_metadata_failure_is_wrapped_with_sub_step() {
    let server = MockServer::start().await;
    mount_token(&server, "tok").await;
    Mock::given(method("GET"))
        .and(path("/latest/meta-data/public-ipv4"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let directory = Arc::new(
        MockDirectory::new().with_address(Address::new("54.162.153.80", "eipalloc-111")),
    );
    let binder = Binder::new(directory, Arc::new(client_for(&server)));

    let err = binder
        .bind("54.162.153.80", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, BindError::Metadata { step: "public-ipv4", .. }));
    assert!(err.to_string().contains("404"));
}
