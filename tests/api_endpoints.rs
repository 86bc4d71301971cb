//! Integration tests for the bridge routes
//!
//! The router is driven through `axum-test` against a recording stub client,
//! and once end to end against the development network.

use async_trait::async_trait;
use axum::body::Bytes;
use axum_test::TestServer;
use fabric_bridge::api::{build_api_router, Bridge, INVALID_ACTION, SERVICE_AVAILABLE};
use fabric_bridge::client::{DevNetworkClient, FabricClient, TargetFilter, TrxnResponse};
use fabric_bridge::error::{ClientError, Result};
use fabric_bridge::request::{EnrollmentRequest, InvocationRequest};
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Invoke(InvocationRequest),
    Query(InvocationRequest),
    EnrollAdmin(bool, String),
    EnrollUser(EnrollmentRequest),
}

struct StubClient {
    outcome: Result<TrxnResponse>,
    enroll_ok: bool,
    calls: Mutex<Vec<Call>>,
}

impl StubClient {
    fn new(outcome: Result<TrxnResponse>, enroll_ok: bool) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            enroll_ok,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn returning(payload: &[u8], success: bool) -> Arc<Self> {
        Self::new(
            Ok(TrxnResponse {
                payload: payload.to_vec(),
                success,
                tx_id: "tx-stub".to_string(),
            }),
            true,
        )
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FabricClient for StubClient {
    async fn init(&self, _config_path: &Path) -> Result<()> {
        Ok(())
    }

    async fn invoke_trxn(
        &self,
        request: &InvocationRequest,
        _filter: Option<&TargetFilter>,
    ) -> Result<TrxnResponse> {
        self.calls.lock().unwrap().push(Call::Invoke(request.clone()));
        self.outcome.clone()
    }

    async fn query(
        &self,
        request: &InvocationRequest,
        _filter: Option<&TargetFilter>,
    ) -> Result<TrxnResponse> {
        self.calls.lock().unwrap().push(Call::Query(request.clone()));
        self.outcome.clone()
    }

    async fn enroll_org_admin(&self, force_reenroll: bool, admin_id: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .push(Call::EnrollAdmin(force_reenroll, admin_id.to_string()));
        self.enroll_ok
    }

    async fn enroll_org_user(&self, request: &EnrollmentRequest) -> bool {
        self.calls
            .lock()
            .unwrap()
            .push(Call::EnrollUser(request.clone()));
        self.enroll_ok
    }

    async fn shutdown(&self) {}
}

fn server_for(client: Arc<dyn FabricClient>) -> TestServer {
    let bridge = Arc::new(Bridge::new(client));
    TestServer::new(build_api_router(bridge)).expect("Failed to create test server")
}

fn chaincode_body() -> Value {
    json!({
        "channel": "mychannel",
        "ccid": "kvstore",
        "fn": "put",
        "user": "appuser",
        "peers": ["peer0.org1", 3],
        "args": ["color", "blue"]
    })
}

/// Asserts the envelope invariants and hands back the payload.
fn payload_of(json: &Value) -> &Value {
    assert_eq!(json["isSuccess"], json!(true));
    assert!(json["ts"].is_string());
    &json["payload"]
}

#[tokio::test]
async fn test_health_check() {
    let server = server_for(StubClient::returning(b"", true));

    let response = server.get("/").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(payload_of(&json), &json!(SERVICE_AVAILABLE));
}

#[tokio::test]
async fn test_invoke_passes_text_payload_through() {
    let stub = StubClient::returning(b"ok", true);
    let server = server_for(stub.clone());

    let response = server
        .post("/api/chaincode/invoke")
        .json(&chaincode_body())
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(payload_of(&json), &json!("ok"));

    assert_eq!(
        stub.calls(),
        vec![Call::Invoke(InvocationRequest {
            channel: "mychannel".to_string(),
            chaincode_id: "kvstore".to_string(),
            function: "put".to_string(),
            user: "appuser".to_string(),
            peers: vec!["peer0.org1".to_string(), String::new()],
            args: vec![b"color".to_vec(), b"blue".to_vec()],
        })]
    );
}

#[tokio::test]
async fn test_query_embeds_json_payload_as_structure() {
    let stub = StubClient::returning(br#"{"a":1}"#, true);
    let server = server_for(stub.clone());

    let response = server
        .post("/api/chaincode/query")
        .json(&chaincode_body())
        .await;
    let json: Value = response.json();
    assert_eq!(payload_of(&json), &json!({"a": 1}));
    assert!(matches!(stub.calls().as_slice(), [Call::Query(_)]));
}

#[tokio::test]
async fn test_unsuccessful_invoke_still_reports_success_flag() {
    let server = server_for(StubClient::returning(b"ok", false));

    let response = server
        .post("/api/chaincode/invoke")
        .json(&chaincode_body())
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    let payload = payload_of(&json).as_str().unwrap();
    assert!(payload.contains("failed"), "payload: {}", payload);
    assert!(payload.starts_with("Invoke"));
}

#[tokio::test]
async fn test_client_error_is_embedded_in_payload() {
    let stub = StubClient::new(
        Err(ClientError::Identity("user appuser is not enrolled".to_string())),
        true,
    );
    let server = server_for(stub);

    let response = server
        .post("/api/chaincode/query")
        .json(&chaincode_body())
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(
        payload_of(&json),
        &json!("Query failed with Identity error: user appuser is not enrolled")
    );
}

#[tokio::test]
async fn test_unknown_action_never_reaches_client() {
    let stub = StubClient::returning(b"ok", true);
    let server = server_for(stub.clone());

    let response = server
        .post("/api/chaincode/delete")
        .json(&chaincode_body())
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(payload_of(&json), &json!(INVALID_ACTION));
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_bodies_are_reported_not_rejected() {
    let stub = StubClient::returning(b"ok", true);
    let server = server_for(stub.clone());

    for (path, body) in [
        ("/api/chaincode/invoke", &b"{not json"[..]),
        ("/api/chaincode/query", &b"[\"put\"]"[..]),
        ("/api/chaincode/invoke", &b""[..]),
        ("/api/admin/enrolluser", &b"{\"userId\":"[..]),
    ] {
        let response = server.post(path).bytes(Bytes::copy_from_slice(body)).await;
        assert_eq!(response.status_code(), 200);
        let json: Value = response.json();
        let payload = payload_of(&json).as_str().unwrap();
        assert!(
            payload.starts_with("Unable to parse json body"),
            "{} -> {}",
            path,
            payload
        );
    }
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_oversized_bodies_report_unreadable_body() {
    let stub = StubClient::returning(b"ok", true);
    let server = server_for(stub.clone());

    let mut body = b"{\"fn\":\"put\",\"pad\":\"".to_vec();
    body.resize(3 * 1024 * 1024, b'x');
    body.extend_from_slice(b"\"}");
    let body = Bytes::from(body);

    for path in ["/api/chaincode/invoke", "/api/admin/enrolluser"] {
        let response = server.post(path).bytes(body.clone()).await;
        assert_eq!(response.status_code(), 200, "{}", path);
        let json: Value = response.json();
        assert_eq!(payload_of(&json), &json!("Unable to read the post body"));
    }
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_null_body_defaults_every_field() {
    let stub = StubClient::returning(b"", true);
    let server = server_for(stub.clone());

    let response = server
        .post("/api/chaincode/query")
        .bytes(Bytes::from_static(b"null"))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(stub.calls(), vec![Call::Query(InvocationRequest::default())]);
}

#[tokio::test]
async fn test_enroll_admin_forces_reenrollment() {
    let stub = StubClient::returning(b"", true);
    let server = server_for(stub.clone());

    let response = server.post("/api/admin/enrolladmin/admin").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(payload_of(&json), &json!("AdminID admin enrolled successfully"));
    assert_eq!(
        stub.calls(),
        vec![Call::EnrollAdmin(true, "admin".to_string())]
    );
}

#[tokio::test]
async fn test_enroll_admin_failure() {
    let stub = StubClient::new(Err(ClientError::NotInitialized), false);
    let server = server_for(stub);

    let json: Value = server.post("/api/admin/enrolladmin/admin").await.json();
    assert_eq!(payload_of(&json), &json!("Unable to enroll adminID admin"));
}

#[tokio::test]
async fn test_enroll_user() {
    let stub = StubClient::returning(b"", true);
    let server = server_for(stub.clone());

    let json: Value = server
        .post("/api/admin/enrolluser")
        .json(&json!({"userId": "appuser", "secret": "pw", "org": "Org1"}))
        .await
        .json();
    assert_eq!(payload_of(&json), &json!("UserID appuser enrolled successfully"));
    assert_eq!(
        stub.calls(),
        vec![Call::EnrollUser(EnrollmentRequest {
            user_id: "appuser".to_string(),
            secret: "pw".to_string(),
            org: "Org1".to_string(),
        })]
    );

    let failing = server_for(StubClient::new(Err(ClientError::Closed), false));
    let json: Value = failing
        .post("/api/admin/enrolluser")
        .json(&json!({"userId": "appuser", "secret": 42}))
        .await
        .json();
    assert_eq!(payload_of(&json), &json!("Unable to enroll userID appuser"));
}

#[tokio::test]
async fn test_unroutable_requests_use_framework_defaults() {
    let server = server_for(StubClient::returning(b"", true));

    assert_eq!(server.get("/api/unknown").await.status_code(), 404);
    assert_eq!(server.get("/api/chaincode/invoke").await.status_code(), 405);
}

const DEVNET_PROFILE: &str = r#"
    [client]
    organization = "Org1"

    [[organizations]]
    name = "Org1"
    admins = ["admin"]
    peers = ["peer0.org1.example.com", "peer1.org1.example.com"]
    registrations = [{ user_id = "appuser", secret = "appuserpw" }]

    [[channels]]
    name = "mychannel"
    chaincodes = ["kvstore"]
"#;

#[tokio::test]
async fn test_devnet_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(DEVNET_PROFILE.as_bytes()).unwrap();

    let devnet = Arc::new(DevNetworkClient::new());
    devnet.init(file.path()).await.unwrap();
    let server = server_for(devnet);

    let json: Value = server.post("/api/admin/enrolladmin/admin").await.json();
    assert_eq!(payload_of(&json), &json!("AdminID admin enrolled successfully"));

    let json: Value = server.post("/api/admin/enrolladmin/intruder").await.json();
    assert_eq!(payload_of(&json), &json!("Unable to enroll adminID intruder"));

    let json: Value = server
        .post("/api/admin/enrolluser")
        .json(&json!({"userId": "appuser", "secret": "appuserpw", "org": "Org1"}))
        .await
        .json();
    assert_eq!(payload_of(&json), &json!("UserID appuser enrolled successfully"));

    let json: Value = server
        .post("/api/chaincode/invoke")
        .json(&json!({
            "channel": "mychannel",
            "ccid": "kvstore",
            "fn": "put",
            "user": "appuser",
            "args": ["profile", "{\"name\":\"owl\",\"legs\":2}"]
        }))
        .await
        .json();
    assert_eq!(payload_of(&json), &json!({"name": "owl", "legs": 2}));

    let json: Value = server
        .post("/api/chaincode/query")
        .json(&json!({
            "channel": "mychannel",
            "ccid": "kvstore",
            "fn": "keys",
            "user": "appuser",
            "peers": ["peer1.org1.example.com"]
        }))
        .await
        .json();
    assert_eq!(payload_of(&json), &json!(["profile"]));

    let json: Value = server
        .post("/api/chaincode/query")
        .json(&json!({
            "channel": "mychannel",
            "ccid": "kvstore",
            "fn": "put",
            "user": "appuser",
            "args": ["k", "v"]
        }))
        .await
        .json();
    let payload = payload_of(&json).as_str().unwrap();
    assert!(payload.starts_with("Query failed with Chaincode error"), "{}", payload);
}
