//! Public IP detection.

use crate::error::{DdnsError, Result};
use crate::providers::client_builder;
use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Source of the caller's current public IPv4 address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Fetch the current public IPv4 address.
    async fn current_ipv4(&self) -> Result<Ipv4Addr>;
}

/// IP detector backed by plain-text "what is my IP" services.
pub struct IpDetector {
    client: reqwest::Client,
    services: Vec<String>,
}

impl IpDetector {
    /// Create a new IP detector with the default service.
    pub fn new() -> Result<Self> {
        Self::with_services(vec!["https://icanhazip.com".to_string()])
    }

    /// Create a new IP detector with custom services, tried in order.
    pub fn with_services(services: Vec<String>) -> Result<Self> {
        if services.is_empty() {
            return Err(DdnsError::Config(
                "At least one IP detection service is required".to_string(),
            ));
        }

        let client = client_builder().build()?;
        Ok(Self { client, services })
    }

    /// Detect public IPv4 address.
    pub async fn detect_ipv4(&self) -> Result<Ipv4Addr> {
        let mut last_error = None;

        for service in &self.services {
            match self.try_service(service).await {
                Ok(ip) => {
                    tracing::debug!("Detected IPv4 {} from {}", ip, service);
                    return Ok(ip);
                }
                Err(e) => {
                    tracing::debug!("Service {} failed: {}", service, e);
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) if self.services.len() == 1 => e,
            _ => DdnsError::IpDetection("All IP detection services failed".to_string()),
        })
    }

    /// Try a single IP detection service.
    async fn try_service(&self, url: &str) -> Result<Ipv4Addr> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(DdnsError::IpDetection(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let text = response.text().await?;
        let ip_str = text.trim();

        ip_str
            .parse()
            .map_err(|_| DdnsError::IpDetection(format!("Invalid IPv4 response: {}", ip_str)))
    }
}

#[async_trait]
impl IpSource for IpDetector {
    async fn current_ipv4(&self) -> Result<Ipv4Addr> {
        self.detect_ipv4().await
    }
}
