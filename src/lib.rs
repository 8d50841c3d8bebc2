//! ecm-gateway - resilient gateway exposing an ECM REST API as callable operations
//!
//! Layers, leaf first:
//! - [`auth`]: credentials for outgoing requests
//! - [`client`]: rate limiting, retry and the request pipeline
//! - [`cache`]: short-TTL response cache
//! - [`backend`]: per-product REST translation
//! - [`ops`]: validated, cached, audited domain operations
//! - [`gateway`]: the operation table and the single entry point

pub mod audit;
pub mod auth;
pub mod backend;
pub mod cache;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod ops;
pub mod utils;

pub use backend::{BackendProfile, EcmBackend};
pub use client::{AttemptEvent, AttemptObserver, RequestPipeline, RequestSpec, Transport};
pub use config::Config;
pub use error::{ErrorKind, GatewayError, Result};
pub use gateway::{Gateway, OperationTable};
pub use ops::EcmOperations;
