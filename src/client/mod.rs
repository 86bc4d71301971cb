//! SDK client contract consumed by the bridge
//!
//! The bridge never talks to a network itself. Everything goes through a
//! single [`FabricClient`] handle that is created at startup and shared by
//! all in-flight requests.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::request::{EnrollmentRequest, InvocationRequest};

pub mod devnet;

pub use devnet::DevNetworkClient;

/// Predicate applied to candidate endorsing peers.
pub type TargetFilter = dyn Fn(&str) -> bool + Send + Sync;

/// Outcome of an invoke or query that reached the network.
///
/// `success == false` means the network answered but did not accept the
/// transaction; transport and validation failures come back as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrxnResponse {
    pub payload: Vec<u8>,
    pub success: bool,
    pub tx_id: String,
}

/// Operations the bridge needs from a blockchain client SDK.
///
/// Implementations are shared across tasks and must synchronize their own
/// connection and credential state.
#[async_trait]
pub trait FabricClient: Send + Sync {
    /// Load the client profile at `config_path` and connect.
    async fn init(&self, config_path: &Path) -> Result<()>;

    /// Submit a state-changing transaction.
    async fn invoke_trxn(
        &self,
        request: &InvocationRequest,
        filter: Option<&TargetFilter>,
    ) -> Result<TrxnResponse>;

    /// Evaluate a transaction without touching the ledger.
    async fn query(
        &self,
        request: &InvocationRequest,
        filter: Option<&TargetFilter>,
    ) -> Result<TrxnResponse>;

    async fn enroll_org_admin(&self, force_reenroll: bool, admin_id: &str) -> bool;

    async fn enroll_org_user(&self, request: &EnrollmentRequest) -> bool;

    /// Release network resources. Later calls fail.
    async fn shutdown(&self);
}
