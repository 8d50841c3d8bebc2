//! Gateway facade: the single entry point for callers.
//!
//! A [`Gateway`] owns the request pipeline, the backend adapter and the
//! operation table. Callers hand it `(operation name, JSON arguments)` and
//! get back a decoded entity as JSON, or a tagged error via [`Gateway::dispatch`].

pub mod stdio;
pub mod table;

pub use table::{Handler, OperationCategory, OperationDescriptor, OperationSpec, OperationTable};

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{error, info};

use crate::auth::AuthProvider;
use crate::backend::{build_backend, BackendProfile};
use crate::client::{
    AttemptObserver, FanoutObserver, RateLimiter, ReqwestTransport, RequestPipeline,
    TracingObserver, Transport,
};
use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::ops::{EcmOperations, OpsSettings};
use crate::utils::metrics::MetricsCollector;

/// URI scheme of addressable resources.
pub const RESOURCE_SCHEME: &str = "ecm://";

/// Resource URI templates served by [`Gateway::read_resource`].
pub const RESOURCE_TEMPLATES: [&str; 4] = [
    "ecm://documents/{id}",
    "ecm://folders/{id}",
    "ecm://folders/{id}/tree",
    "ecm://schemas/{type}",
];

/// Entry point wiring configuration, pipeline, backend and operation table.
pub struct Gateway {
    ops: EcmOperations,
    table: OperationTable,
    metrics: Arc<MetricsCollector>,
    profile: BackendProfile,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("profile", &self.profile)
            .field("operations", &self.table.len())
            .field("ops", &self.ops)
            .finish()
    }
}

impl Gateway {
    /// Build a gateway talking HTTP to `config.backend.base_url`.
    ///
    /// Fails with `Config` when the settings have error-level diagnostics.
    pub fn new(config: &Config) -> Result<Self> {
        config.check()?;
        let transport = ReqwestTransport::new(&config.backend.base_url, &config.http)?;
        Self::with_transport(config, Arc::new(transport), None)
    }

    /// Build a gateway over an arbitrary transport.
    ///
    /// Attempt events go to the tracing observer, the metrics collector and,
    /// when given, `observer`.
    pub fn with_transport(
        config: &Config,
        transport: Arc<dyn Transport>,
        observer: Option<Arc<dyn AttemptObserver>>,
    ) -> Result<Self> {
        let metrics = Arc::new(MetricsCollector::new());
        let mut fanout = FanoutObserver::new()
            .with(Arc::new(TracingObserver))
            .with(metrics.clone());
        if let Some(extra) = observer {
            fanout = fanout.with(extra);
        }

        let auth = Arc::new(AuthProvider::from_config(&config.auth, transport.clone()));
        let limiter = Arc::new(RateLimiter::per_minute(
            config.rate_limit.capacity,
            config.rate_limit.refill_per_minute,
        ));
        let headers = config
            .backend
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let pipeline = Arc::new(
            RequestPipeline::new(transport, auth)
                .with_rate_limiter(limiter)
                .with_retry(config.retry)
                .with_timeout(Duration::from_secs(config.http.timeout_secs))
                .with_max_connections(config.http.max_connections)
                .with_headers(headers)
                .with_observer(Arc::new(fanout)),
        );

        let profile = config.backend.profile;
        let backend = build_backend(profile, pipeline);
        let ops = EcmOperations::new(backend, OpsSettings::from_config(config));
        let table = OperationTable::standard();

        info!(
            component = "gateway",
            profile = %profile,
            base_url = %config.backend.base_url,
            auth = ops_auth_scheme(config),
            operations = table.len(),
            "Gateway ready"
        );

        Ok(Self {
            ops,
            table,
            metrics,
            profile,
        })
    }

    /// Run `operation` with `args`.
    ///
    /// Arguments are checked against the operation's schema before the
    /// handler runs. Errors carry the operation name.
    pub async fn call(&self, operation: &str, args: Value) -> Result<Value> {
        let spec = self.table.resolve(operation)?;
        let args = OperationTable::check_args(spec, args)?;
        let start = Instant::now();

        match (spec.handler)(&self.ops, args).await {
            Ok(value) => {
                info!(
                    component = "gateway",
                    operation = operation,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Operation completed"
                );
                Ok(value)
            }
            Err(e) => {
                let e = e.with_operation(operation);
                error!(
                    component = "gateway",
                    operation = operation,
                    kind = %e.kind(),
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Operation failed"
                );
                Err(e)
            }
        }
    }

    /// Like [`call`](Self::call), with failures rendered as a tagged error object.
    pub async fn dispatch(&self, operation: &str, args: Value) -> Value {
        match self.call(operation, args).await {
            Ok(value) => value,
            Err(e) => e.to_tagged(),
        }
    }

    /// Resolve an `ecm://` resource URI to its entity.
    pub async fn read_resource(&self, uri: &str) -> Result<Value> {
        let path = uri.strip_prefix(RESOURCE_SCHEME).ok_or_else(|| {
            GatewayError::InvalidArgument(format!(
                "resource URI must start with {}: '{}'",
                RESOURCE_SCHEME, uri
            ))
        })?;
        let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();

        let value = match segments.as_slice() {
            ["documents", id] => serde_json::to_value(self.ops.get_document(id).await?)?,
            ["folders", id] => serde_json::to_value(self.ops.get_folder(id).await?)?,
            ["folders", id, "tree"] => {
                serde_json::to_value(self.ops.get_folder_tree(Some(*id), None).await?)?
            }
            ["schemas", document_type] => {
                serde_json::to_value(self.ops.get_metadata_schema(document_type).await?)?
            }
            _ => {
                return Err(GatewayError::InvalidArgument(format!(
                    "unknown resource '{}' (expected one of {})",
                    uri,
                    RESOURCE_TEMPLATES.join(", ")
                )))
            }
        };
        Ok(value)
    }

    /// The operation catalog with parameter schemas.
    pub fn catalog(&self) -> Vec<OperationDescriptor> {
        self.table.descriptors()
    }

    pub fn table(&self) -> &OperationTable {
        &self.table
    }

    pub fn operations(&self) -> &EcmOperations {
        &self.ops
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn profile(&self) -> BackendProfile {
        self.profile
    }

    /// Live entries in the response cache.
    pub fn cache_len(&self) -> usize {
        self.ops.cache_len()
    }
}

fn ops_auth_scheme(config: &Config) -> &'static str {
    match config.auth {
        crate::config::AuthConfig::OAuth2 { .. } => "oauth2",
        crate::config::AuthConfig::ApiKey { .. } => "api_key",
        crate::config::AuthConfig::Basic { .. } => "basic",
    }
}
