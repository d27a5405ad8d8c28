//! The update loop: resolve the record once, then poll and push changes.

use crate::detector::IpSource;
use crate::error::Result;
use crate::providers::{DnsProvider, UpdateResult};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Process exit status when the record cannot be resolved at startup.
pub const RESOLVE_FAILURE_EXIT_CODE: i32 = 1;

/// What a single pass of the loop did.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// The public IP could not be determined; nothing was sent.
    FetchFailed,
    /// The public IP matches the last applied value.
    Unchanged(Ipv4Addr),
    /// The record now points at the new IP.
    Updated(UpdateResult),
    /// The provider rejected or never received the update.
    UpdateFailed(Ipv4Addr),
}

/// Keeps one DNS record in sync with the caller's public IP.
pub struct Updater {
    ip_source: Box<dyn IpSource>,
    provider: Box<dyn DnsProvider>,
    record_id: String,
    interval: Duration,
    last_applied: Option<Ipv4Addr>,
}

impl Updater {
    /// Resolve the record identifier and build an updater for it.
    ///
    /// Any error here is fatal for the caller: without an identifier no
    /// update can ever be issued.
    pub async fn connect(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        interval: Duration,
    ) -> Result<Self> {
        tracing::info!("Getting the ID of the record");
        let record_id = provider.resolve_record_id().await?;
        tracing::info!("Got record ID: {}", record_id);

        Ok(Self::new(ip_source, provider, record_id, interval))
    }

    /// Like [`Updater::connect`], but maps a resolve failure to the process
    /// exit status after logging it.
    pub async fn start(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        interval: Duration,
    ) -> std::result::Result<Self, i32> {
        Self::connect(ip_source, provider, interval)
            .await
            .map_err(|e| {
                tracing::error!("Cannot resolve record: {}", e);
                RESOLVE_FAILURE_EXIT_CODE
            })
    }

    /// Create an updater for an already known record.
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        record_id: String,
        interval: Duration,
    ) -> Self {
        Self {
            ip_source,
            provider,
            record_id,
            interval,
            last_applied: None,
        }
    }

    /// Identifier of the record being kept in sync.
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    /// The last IP the provider accepted, if any.
    pub fn last_applied(&self) -> Option<Ipv4Addr> {
        self.last_applied
    }

    /// Run one iteration: fetch, compare, update if changed.
    pub async fn tick(&mut self) -> TickOutcome {
        let ip = match self.ip_source.current_ipv4().await {
            Ok(ip) => ip,
            Err(e) => {
                tracing::warn!("Failed to detect public IP: {}", e);
                return TickOutcome::FetchFailed;
            }
        };

        if self.last_applied == Some(ip) {
            tracing::info!("No change to public IP");
            return TickOutcome::Unchanged(ip);
        }

        tracing::info!("Current public IP: {}", ip);

        match self.provider.update_record(&self.record_id, ip).await {
            Ok(result) => {
                tracing::info!(
                    "Updated {} -> {} at {}",
                    result.domain,
                    result.ip,
                    result.timestamp.format("%Y-%m-%d %H:%M:%S")
                );
                self.last_applied = Some(ip);
                TickOutcome::Updated(result)
            }
            Err(e) => {
                tracing::warn!("Error setting IP: {}", e);
                TickOutcome::UpdateFailed(ip)
            }
        }
    }

    /// Poll forever at the configured interval.
    pub async fn run(&mut self) {
        tracing::info!("Polling every {}s", self.interval.as_secs());

        loop {
            self.tick().await;
            tokio::time::sleep(self.interval).await;
        }
    }
}
