//! HTTP surface of the bridge
//!
//! Every route answers 200 with a [`ResponseEnvelope`](crate::envelope::ResponseEnvelope).
//! Failures are reported as text in the payload.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::client::{FabricClient, TrxnResponse};
use crate::envelope::{render, Payload};
use crate::error::{BridgeError, ClientError};
use crate::request::{decode_object, EnrollmentRequest, InvocationRequest};

pub const SERVICE_AVAILABLE: &str = "Service Available";
pub const INVALID_ACTION: &str =
    "Invalid action provided. Valid values are invoke|query. Access url pattern is api/chaincode/<action>";

/// Shared handler state: the single SDK client of the process.
#[derive(Clone)]
pub struct Bridge {
    client: Arc<dyn FabricClient>,
}

impl Bridge {
    pub fn new(client: Arc<dyn FabricClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<dyn FabricClient> {
        &self.client
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChaincodeAction {
    Invoke,
    Query,
}

impl ChaincodeAction {
    fn parse(action: &str) -> Option<Self> {
        match action {
            "invoke" => Some(ChaincodeAction::Invoke),
            "query" => Some(ChaincodeAction::Query),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ChaincodeAction::Invoke => "Invoke",
            ChaincodeAction::Query => "Query",
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the bridge router.
pub fn build_api_router(bridge: Arc<Bridge>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/", get(health_check))
        .route("/api/chaincode/:action", post(chaincode_action))
        .route("/api/admin/enrolladmin/:admin_id", post(enroll_admin))
        .route("/api/admin/enrolluser", post(enroll_user))
        .with_state(bridge)
        .layer(middleware::from_fn(logging_middleware))
        .layer(cors)
}

/// Serve the bridge on an already bound listener until the process exits.
pub async fn run_api_server(
    bridge: Arc<Bridge>,
    listener: tokio::net::TcpListener,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = listener.local_addr()?;
    info!(%addr, "bridge listening");

    axum::serve(listener, build_api_router(bridge)).await?;
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check() -> Response {
    render(StatusCode::OK, SERVICE_AVAILABLE)
}

/// Read and parse a JSON object body; the error is the response to send.
fn read_json_body(body: Result<Bytes, BytesRejection>) -> Result<Map<String, Value>, Response> {
    let bytes = body.map_err(|e| {
        let err = BridgeError::UnreadableBody(e.body_text());
        warn!(error = ?err, "request body rejected");
        render(StatusCode::OK, err.to_string())
    })?;

    decode_object(&bytes).map_err(|err| {
        warn!(error = %err, "request body is not a JSON object");
        render(StatusCode::OK, err.to_string())
    })
}

async fn chaincode_action(
    State(bridge): State<Arc<Bridge>>,
    Path(action): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let map = match read_json_body(body) {
        Ok(map) => map,
        Err(response) => return response,
    };
    let request = InvocationRequest::from_json(&map);

    let Some(action) = ChaincodeAction::parse(&action) else {
        return render(StatusCode::OK, INVALID_ACTION);
    };

    let outcome = match action {
        ChaincodeAction::Invoke => bridge.client.invoke_trxn(&request, None).await,
        ChaincodeAction::Query => bridge.client.query(&request, None).await,
    };

    render(StatusCode::OK, chaincode_payload(action, &request, outcome))
}

fn chaincode_payload(
    action: ChaincodeAction,
    request: &InvocationRequest,
    outcome: Result<TrxnResponse, ClientError>,
) -> Payload {
    match outcome {
        Ok(resp) if resp.success => {
            info!(
                action = action.label(),
                channel = %request.channel,
                chaincode = %request.chaincode_id,
                tx_id = %resp.tx_id,
                success = true,
                "chaincode.returned"
            );
            Payload::Raw(resp.payload)
        }
        Ok(resp) => {
            warn!(action = action.label(), tx_id = %resp.tx_id, success = false, "chaincode.returned");
            Payload::Message(format!(
                "{} failed with unsuccessful response (tx {})",
                action.label(),
                resp.tx_id
            ))
        }
        Err(e) => {
            warn!(action = action.label(), error = %e, success = false, "chaincode.returned");
            Payload::Message(format!("{} failed with {}", action.label(), e))
        }
    }
}

async fn enroll_admin(State(bridge): State<Arc<Bridge>>, Path(admin_id): Path<String>) -> Response {
    if !bridge.client.enroll_org_admin(true, &admin_id).await {
        return render(StatusCode::OK, format!("Unable to enroll adminID {}", admin_id));
    }
    render(StatusCode::OK, format!("AdminID {} enrolled successfully", admin_id))
}

async fn enroll_user(
    State(bridge): State<Arc<Bridge>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let map = match read_json_body(body) {
        Ok(map) => map,
        Err(response) => return response,
    };
    let request = EnrollmentRequest::from_json(&map);

    if !bridge.client.enroll_org_user(&request).await {
        return render(
            StatusCode::OK,
            format!("Unable to enroll userID {}", request.user_id),
        );
    }
    render(
        StatusCode::OK,
        format!("UserID {} enrolled successfully", request.user_id),
    )
}
