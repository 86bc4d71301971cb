//! In-process development network
//!
//! Simulates a small permissioned network described by a [`NetworkProfile`]:
//! organizations with admins, registered users and peers, channels with
//! deployed chaincodes. Every deployed chaincode is a key/value store:
//! - `put`/`set` key value
//! - `delete`/`del` key
//! - `get` key
//! - `keys` (JSON array, sorted)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

use super::{FabricClient, TargetFilter, TrxnResponse};
use crate::config::{load_profile, ChannelConfig, NetworkProfile, OrganizationConfig};
use crate::error::{ClientError, Result};
use crate::request::{EnrollmentRequest, InvocationRequest};

type WorldState = BTreeMap<String, Vec<u8>>;

/// Enrollment certificate issued to an admin or user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user_id: String,
    pub org: String,
    pub msp_id: String,
    pub fingerprint: String,
    pub enrolled_at: DateTime<Utc>,
}

impl Credential {
    fn issue(org: &OrganizationConfig, user_id: &str) -> Self {
        let nonce: [u8; 16] = rand::random();
        let mut hasher = Sha256::new();
        hasher.update(org.msp_id.as_bytes());
        hasher.update(user_id.as_bytes());
        hasher.update(nonce);

        Self {
            user_id: user_id.to_string(),
            org: org.name.clone(),
            msp_id: org.msp_id.clone(),
            fingerprint: hex::encode(hasher.finalize()),
            enrolled_at: Utc::now(),
        }
    }
}

struct Network {
    profile: NetworkProfile,
    credentials: HashMap<String, Credential>,
    /// Keyed by (channel, chaincode id).
    ledgers: HashMap<(String, String), WorldState>,
}

impl Network {
    fn new(profile: NetworkProfile) -> Self {
        let ledgers = profile
            .channels
            .iter()
            .flat_map(|c| {
                c.chaincodes
                    .iter()
                    .map(move |cc| ((c.name.clone(), cc.clone()), WorldState::new()))
            })
            .collect();

        Self {
            profile,
            credentials: HashMap::new(),
            ledgers,
        }
    }

    fn creator(&self, user: &str) -> Result<&Credential> {
        if user.is_empty() {
            return Err(ClientError::Identity("no user provided".to_string()));
        }
        self.credentials
            .get(user)
            .ok_or_else(|| ClientError::Identity(format!("user {} is not enrolled", user)))
    }

    fn channel(&self, request: &InvocationRequest) -> Result<&ChannelConfig> {
        let channel = self
            .profile
            .channel(&request.channel)
            .ok_or_else(|| ClientError::ChannelNotFound(request.channel.clone()))?;
        if !channel.chaincodes.contains(&request.chaincode_id) {
            return Err(ClientError::ChaincodeNotFound(format!(
                "{} is not deployed on channel {}",
                request.chaincode_id, channel.name
            )));
        }
        Ok(channel)
    }

    /// Checks identity, channel, chaincode and endorsers. Returns the tx id.
    fn prepare(&self, request: &InvocationRequest, filter: Option<&TargetFilter>) -> Result<String> {
        let creator = self.creator(&request.user)?;
        let channel = self.channel(request)?;
        let targets = endorsers(channel, &request.peers, filter)?;
        let tx_id = transaction_id(creator, &channel.name);
        debug!(
            tx_id = %tx_id,
            channel = %channel.name,
            chaincode = %request.chaincode_id,
            function = %request.function,
            endorsers = ?targets,
            "devnet.proposal"
        );
        Ok(tx_id)
    }

    /// An existing credential for `user_id` issued by a different organization.
    fn foreign_credential(&self, org: &str, user_id: &str) -> Option<&Credential> {
        self.credentials.get(user_id).filter(|c| c.org != org)
    }

    fn ledger_key(request: &InvocationRequest) -> (String, String) {
        (request.channel.clone(), request.chaincode_id.clone())
    }
}

fn endorsers(
    channel: &ChannelConfig,
    requested: &[String],
    filter: Option<&TargetFilter>,
) -> Result<Vec<String>> {
    if let Some(peer) = requested.iter().find(|p| !channel.peers.contains(*p)) {
        return Err(ClientError::Peer(format!(
            "peer {} has not joined channel {}",
            peer, channel.name
        )));
    }
    let candidates = if requested.is_empty() {
        channel.peers.as_slice()
    } else {
        requested
    };
    let targets: Vec<String> = candidates
        .iter()
        .filter(|p| filter.map_or(true, |f| f(p.as_str())))
        .cloned()
        .collect();

    if targets.is_empty() {
        return Err(ClientError::Peer(format!(
            "no endorsing peers available on channel {}",
            channel.name
        )));
    }
    Ok(targets)
}

fn transaction_id(creator: &Credential, channel: &str) -> String {
    let nonce: [u8; 24] = rand::random();
    let mut hasher = Sha256::new();
    hasher.update(creator.msp_id.as_bytes());
    hasher.update(creator.fingerprint.as_bytes());
    hasher.update(channel.as_bytes());
    hasher.update(nonce);
    hex::encode(hasher.finalize())
}

/// A call against the key/value chaincode.
#[derive(Debug, PartialEq, Eq)]
enum KvOp {
    Put(String, Vec<u8>),
    Delete(String),
    Get(String),
    Keys,
}

impl KvOp {
    fn parse(function: &str, args: &[Vec<u8>]) -> Result<Self> {
        match function {
            "put" | "set" => {
                expect_args(function, args, 2)?;
                Ok(KvOp::Put(utf8_key(&args[0])?, args[1].clone()))
            }
            "delete" | "del" => {
                expect_args(function, args, 1)?;
                Ok(KvOp::Delete(utf8_key(&args[0])?))
            }
            "get" => {
                expect_args(function, args, 1)?;
                Ok(KvOp::Get(utf8_key(&args[0])?))
            }
            "keys" => {
                expect_args(function, args, 0)?;
                Ok(KvOp::Keys)
            }
            other => Err(ClientError::Chaincode(format!("unknown function {:?}", other))),
        }
    }

    fn is_write(&self) -> bool {
        matches!(self, KvOp::Put(..) | KvOp::Delete(_))
    }

    fn read(&self, state: &WorldState) -> Result<Vec<u8>> {
        match self {
            KvOp::Get(key) => state
                .get(key)
                .cloned()
                .ok_or_else(|| ClientError::Chaincode(format!("key {} not found", key))),
            KvOp::Keys => {
                let keys: Vec<&String> = state.keys().collect();
                serde_json::to_vec(&keys).map_err(|e| ClientError::Chaincode(e.to_string()))
            }
            KvOp::Put(..) | KvOp::Delete(_) => Err(ClientError::Chaincode(
                "write operation on a read path".to_string(),
            )),
        }
    }

    fn apply(self, state: &mut WorldState) -> Result<Vec<u8>> {
        match self {
            KvOp::Put(key, value) => {
                state.insert(key, value.clone());
                Ok(value)
            }
            KvOp::Delete(key) => {
                state.remove(&key);
                Ok(Vec::new())
            }
            read => read.read(state),
        }
    }
}

fn expect_args(function: &str, args: &[Vec<u8>], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(ClientError::Chaincode(format!(
            "{} expects {} argument(s), got {}",
            function,
            expected,
            args.len()
        )));
    }
    Ok(())
}

fn utf8_key(arg: &[u8]) -> Result<String> {
    String::from_utf8(arg.to_vec())
        .map_err(|_| ClientError::Chaincode("key must be valid UTF-8".to_string()))
}

enum ClientState {
    Idle,
    Connected(Network),
    Closed,
}

impl ClientState {
    fn network(&self) -> Result<&Network> {
        match self {
            ClientState::Connected(network) => Ok(network),
            ClientState::Idle => Err(ClientError::NotInitialized),
            ClientState::Closed => Err(ClientError::Closed),
        }
    }

    fn network_mut(&mut self) -> Result<&mut Network> {
        match self {
            ClientState::Connected(network) => Ok(network),
            ClientState::Idle => Err(ClientError::NotInitialized),
            ClientState::Closed => Err(ClientError::Closed),
        }
    }
}

/// [`FabricClient`] backed by an in-memory network.
pub struct DevNetworkClient {
    state: RwLock<ClientState>,
}

impl Default for DevNetworkClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DevNetworkClient {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ClientState::Idle),
        }
    }

    /// Connect directly from an already parsed profile.
    pub fn connect(&self, profile: NetworkProfile) -> Result<()> {
        let mut state = self.state.write();
        match *state {
            ClientState::Idle => {
                info!(
                    organization = %profile.client.organization,
                    channels = profile.channels.len(),
                    peers = profile.all_peers().len(),
                    "devnet.connected"
                );
                *state = ClientState::Connected(Network::new(profile));
                Ok(())
            }
            ClientState::Connected(_) => Err(ClientError::AlreadyInitialized),
            ClientState::Closed => Err(ClientError::Closed),
        }
    }

    /// Credential currently held by `user_id`, if enrolled.
    pub fn credential(&self, user_id: &str) -> Option<Credential> {
        let state = self.state.read();
        let network = state.network().ok()?;
        network.credentials.get(user_id).cloned()
    }

    pub fn is_connected(&self) -> bool {
        matches!(*self.state.read(), ClientState::Connected(_))
    }
}

#[async_trait]
impl FabricClient for DevNetworkClient {
    async fn init(&self, config_path: &Path) -> Result<()> {
        let profile = load_profile(config_path)?;
        self.connect(profile)
    }

    async fn invoke_trxn(
        &self,
        request: &InvocationRequest,
        filter: Option<&TargetFilter>,
    ) -> Result<TrxnResponse> {
        let mut state = self.state.write();
        let network = state.network_mut()?;
        let op = KvOp::parse(&request.function, &request.args)?;
        let tx_id = network.prepare(request, filter)?;
        let ledger = network
            .ledgers
            .entry(Network::ledger_key(request))
            .or_default();
        let payload = op.apply(ledger)?;

        Ok(TrxnResponse {
            payload,
            success: true,
            tx_id,
        })
    }

    async fn query(
        &self,
        request: &InvocationRequest,
        filter: Option<&TargetFilter>,
    ) -> Result<TrxnResponse> {
        let state = self.state.read();
        let network = state.network()?;
        let op = KvOp::parse(&request.function, &request.args)?;
        if op.is_write() {
            return Err(ClientError::Chaincode(format!(
                "function {} modifies state and must be invoked",
                request.function
            )));
        }
        let tx_id = network.prepare(request, filter)?;
        let payload = match network.ledgers.get(&Network::ledger_key(request)) {
            Some(ledger) => op.read(ledger)?,
            None => op.read(&WorldState::new())?,
        };

        Ok(TrxnResponse {
            payload,
            success: true,
            tx_id,
        })
    }

    async fn enroll_org_admin(&self, force_reenroll: bool, admin_id: &str) -> bool {
        let mut state = self.state.write();
        let network = match state.network_mut() {
            Ok(network) => network,
            Err(e) => {
                warn!(admin_id, error = %e, "devnet.enroll_admin");
                return false;
            }
        };

        let Some(org) = network.profile.organization(&network.profile.client.organization) else {
            return false;
        };
        if !org.admins.iter().any(|a| a == admin_id) {
            warn!(admin_id, org = %org.name, "admin is not registered with organization");
            return false;
        }
        if let Some(existing) = network.foreign_credential(&org.name, admin_id) {
            warn!(admin_id, held_by = %existing.org, "identity already enrolled with another organization");
            return false;
        }
        if !force_reenroll && network.credentials.contains_key(admin_id) {
            return true;
        }

        let credential = Credential::issue(org, admin_id);
        info!(admin_id, msp_id = %credential.msp_id, "devnet.admin_enrolled");
        network.credentials.insert(admin_id.to_string(), credential);
        true
    }

    async fn enroll_org_user(&self, request: &EnrollmentRequest) -> bool {
        let mut state = self.state.write();
        let network = match state.network_mut() {
            Ok(network) => network,
            Err(e) => {
                warn!(user_id = %request.user_id, error = %e, "devnet.enroll_user");
                return false;
            }
        };

        let Some(org) = network.profile.organization(&request.org) else {
            warn!(org = %request.org, "unknown organization");
            return false;
        };
        let registered = org
            .registrations
            .iter()
            .any(|r| r.user_id == request.user_id && r.secret == request.secret);
        if !registered {
            warn!(user_id = %request.user_id, org = %org.name, "enrollment rejected");
            return false;
        }

        if let Some(existing) = network.foreign_credential(&org.name, &request.user_id) {
            warn!(user_id = %request.user_id, held_by = %existing.org, "identity already enrolled with another organization");
            return false;
        }

        let credential = Credential::issue(org, &request.user_id);
        info!(user_id = %request.user_id, msp_id = %credential.msp_id, "devnet.user_enrolled");
        network
            .credentials
            .insert(request.user_id.clone(), credential);
        true
    }

    async fn shutdown(&self) {
        let mut state = self.state.write();
        if let ClientState::Connected(network) = &*state {
            info!(
                credentials = network.credentials.len(),
                ledgers = network.ledgers.len(),
                "devnet.shutdown"
            );
        }
        *state = ClientState::Closed;
    }
}
