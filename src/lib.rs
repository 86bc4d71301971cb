//! fabric-bridge - JSON over HTTP in front of a blockchain client SDK
//!
//! # Architecture
//!
//! ## Request Path
//! - [`request`] - Body decoding and total field projections
//! - [`api`] - Routes and action dispatch
//! - [`envelope`] - Uniform `{isSuccess, ts, payload}` responses
//!
//! ## SDK Client
//! - [`client`] - The `FabricClient` contract
//! - [`client::devnet`] - In-process development network
//! - [`lifecycle`] - Client init and signal-driven shutdown
//!
//! ## Configuration & Utilities
//! - [`config`] - Network profile and server settings
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Request Path
// ============================================================================
#[cfg(feature = "api")]
pub mod api;
pub mod envelope;
pub mod request;

// ============================================================================
// SDK Client
// ============================================================================
pub mod client;
pub mod lifecycle;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
