//! DNS provider client.

mod cloudflare;

pub use cloudflare::{CloudflareProvider, DnsRecord, RecordMeta};

use crate::error::Result;
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Per-request timeout shared by every outbound call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// TTL written on every update, in seconds.
pub const RECORD_TTL: u32 = 120;

const MAX_IDLE_CONNECTIONS: usize = 10;
const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of a successful DNS update.
#[derive(Debug, Clone)]
pub struct UpdateResult {
    /// Provider name.
    pub provider: String,
    /// Record that was updated.
    pub domain: String,
    /// Provider-issued record identifier.
    pub record_id: String,
    /// New IP address.
    pub ip: Ipv4Addr,
    /// Timestamp of the update.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Trait for the DNS provider consulted and mutated by the updater.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Look up the identifier of the configured A record.
    async fn resolve_record_id(&self) -> Result<String>;

    /// Fetch the configured A record.
    async fn get_record(&self) -> Result<DnsRecord>;

    /// Overwrite the record's content with `ip`.
    async fn update_record(&self, record_id: &str, ip: Ipv4Addr) -> Result<UpdateResult>;
}

/// Connection settings shared by the provider and IP detection clients.
pub(crate) fn client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(concat!("cf-ddns/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS)
        .pool_idle_timeout(IDLE_TIMEOUT)
        .no_gzip()
        .timeout(REQUEST_TIMEOUT)
}
