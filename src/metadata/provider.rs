//! Metadata provider abstraction and instance collection.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::models::Instance;

/// Metadata keys the agent needs to identify the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKey {
    InstanceId,
    InstanceType,
    AvailabilityZone,
    LocalIpv4,
}

impl MetadataKey {
    /// All keys, in collection order.
    pub const ALL: [Self; 4] = [
        Self::InstanceId,
        Self::InstanceType,
        Self::AvailabilityZone,
        Self::LocalIpv4,
    ];

    /// Path below `/latest/meta-data/`.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::InstanceId => "instance-id",
            Self::InstanceType => "instance-type",
            Self::AvailabilityZone => "placement/availability-zone",
            Self::LocalIpv4 => "local-ipv4",
        }
    }
}

impl std::fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Errors from instance metadata operations.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to build metadata HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Metadata request for {target} failed: {source}")]
    Request {
        target: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Metadata request for {target} timed out")]
    Timeout { target: &'static str },

    #[error("Metadata service returned HTTP {status} for {target}")]
    Status {
        target: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("Metadata service returned an empty value for {target}")]
    Empty { target: &'static str },
}

/// Source of host identity metadata.
///
/// A session token must be acquired before keys are fetched.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Acquire a session token for subsequent fetches.
    async fn acquire_token(&self) -> Result<String, MetadataError>;

    /// Fetch a single metadata value.
    async fn fetch(&self, token: &str, key: MetadataKey) -> Result<String, MetadataError>;
}

/// Collect a full [`Instance`] snapshot from `provider`.
///
/// Keys are fetched in [`MetadataKey::ALL`] order; the first failure aborts.
///
/// # Errors
///
/// Returns the first token or fetch error encountered.
pub async fn collect_instance(provider: &dyn MetadataProvider) -> Result<Instance, MetadataError> {
    let token = provider.acquire_token().await?;

    let instance_id = provider.fetch(&token, MetadataKey::InstanceId).await?;
    let instance_type = provider.fetch(&token, MetadataKey::InstanceType).await?;
    let availability_zone = provider
        .fetch(&token, MetadataKey::AvailabilityZone)
        .await?;
    let private_ip_address = provider.fetch(&token, MetadataKey::LocalIpv4).await?;

    let instance = Instance {
        instance_id,
        instance_type,
        availability_zone,
        private_ip_address,
        last_seen_at: Utc::now(),
    };

    tracing::info!(
        instance_id = %instance.instance_id,
        instance_type = %instance.instance_type,
        availability_zone = %instance.availability_zone,
        "Collected instance metadata"
    );

    Ok(instance)
}
