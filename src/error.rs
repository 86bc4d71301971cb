//! Error types for the bridge and the SDK client layer

use std::fmt;

/// Failures while turning an HTTP request body into a JSON object.
///
/// The `Display` text is what ends up in the response payload, so callers
/// can tell the two cases apart without inspecting the status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    UnreadableBody(String),
    InvalidJson(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BridgeError::UnreadableBody(_) => write!(f, "Unable to read the post body"),
            BridgeError::InvalidJson(msg) => write!(f, "Unable to parse json body: {}", msg),
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::InvalidJson(err.to_string())
    }
}

/// Errors reported by a [`FabricClient`](crate::client::FabricClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    NotInitialized,
    AlreadyInitialized,
    Closed,
    Config(String),
    Io(String),
    ChannelNotFound(String),
    ChaincodeNotFound(String),
    Identity(String),
    Peer(String),
    Chaincode(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ClientError::NotInitialized => write!(f, "SDK client is not initialized"),
            ClientError::AlreadyInitialized => write!(f, "SDK client is already initialized"),
            ClientError::Closed => write!(f, "SDK client has been shut down"),
            ClientError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ClientError::Io(msg) => write!(f, "IO error: {}", msg),
            ClientError::ChannelNotFound(name) => write!(f, "Channel not found: {}", name),
            ClientError::ChaincodeNotFound(msg) => write!(f, "Chaincode not found: {}", msg),
            ClientError::Identity(msg) => write!(f, "Identity error: {}", msg),
            ClientError::Peer(msg) => write!(f, "Peer error: {}", msg),
            ClientError::Chaincode(msg) => write!(f, "Chaincode error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

/// Convenience alias used across the client layer
pub type Result<T> = std::result::Result<T, ClientError>;
