//! Registration Gateway - signature-verified homeserver accounts for
//! Ethereum addresses.
//!
//! The gateway sits in front of a homeserver's registration endpoint to:
//! - Require proof that the caller holds the key behind the claimed address
//! - Register each address at most once
//! - Hand every accepted registration to the homeserver exactly once

pub mod api;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod registration;
pub mod registry;
pub mod signature;

pub use config::Config;
pub use error::GatewayError;
pub use forwarder::Forwarder;
pub use registration::{Registrar, RegistrationRequest};
pub use registry::{Account, AccountRegistry, Commit, LocalRegistry, Store};
pub use signature::{SignatureScheme, SignatureVerifier};
