//! Cloudflare DNS provider.

use super::{client_builder, DnsProvider, UpdateResult, RECORD_TTL};
use crate::config::DEFAULT_API_BASE_URL;
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

const RECORD_TYPE: &str = "A";

/// Cloudflare DNS provider bound to one zone and one record name.
pub struct CloudflareProvider {
    client: reqwest::Client,
    zone_id: String,
    record_name: String,
    base_url: String,
}

impl fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("zone_id", &self.zone_id)
            .field("record_name", &self.record_name)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<CloudflareMessage>,
}

#[derive(Debug, Deserialize)]
struct CloudflareMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl<T> CloudflareResponse<T> {
    fn first_error(&self) -> Option<String> {
        self.errors
            .first()
            .map(|e| format!("{} (code {})", e.message, e.code))
    }
}

/// DNS record as returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    #[serde(rename = "type", default)]
    pub record_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub proxiable: bool,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default)]
    pub ttl: u32,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub zone_name: Option<String>,
    #[serde(default)]
    pub created_on: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub modified_on: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub meta: Option<RecordMeta>,
}

/// Provider bookkeeping attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordMeta {
    #[serde(default)]
    pub auto_added: bool,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: String,
    ttl: u32,
    proxied: bool,
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider.
    pub fn new(api_token: &str, zone_id: String, record_name: String) -> Result<Self> {
        Self::with_base_url(api_token, zone_id, record_name, DEFAULT_API_BASE_URL.to_string())
    }

    /// Create with custom API base URL.
    pub fn with_base_url(
        api_token: &str,
        zone_id: String,
        record_name: String,
        base_url: String,
    ) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_token))
            .map_err(|_| DdnsError::Config("API token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = client_builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            zone_id,
            record_name,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The record name this provider manages.
    pub fn record_name(&self) -> &str {
        &self.record_name
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    /// List A records matching the configured name.
    async fn list_records(&self) -> Result<Vec<DnsRecord>> {
        tracing::debug!("Listing A records named {} in zone {}", self.record_name, self.zone_id);

        let response = self
            .client
            .get(self.records_url())
            .query(&[("type", RECORD_TYPE), ("name", self.record_name.as_str())])
            .send()
            .await?;

        let response = check_status(response).await?;
        let body = response.text().await?;
        let parsed: CloudflareResponse<Vec<DnsRecord>> = serde_json::from_str(&body)?;

        if !parsed.success {
            return Err(DdnsError::Provider {
                status: StatusCode::OK.as_u16(),
                message: parsed
                    .first_error()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            });
        }

        Ok(parsed.result.unwrap_or_default())
    }
}

/// Map non-success statuses to provider errors.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<CloudflareResponse<serde_json::Value>>(&body)
        .ok()
        .and_then(|r| r.first_error())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

    Err(DdnsError::Provider {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn resolve_record_id(&self) -> Result<String> {
        self.get_record().await.map(|record| record.id)
    }

    async fn get_record(&self) -> Result<DnsRecord> {
        self.list_records()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DdnsError::NotFound(self.record_name.clone()))
    }

    async fn update_record(&self, record_id: &str, ip: Ipv4Addr) -> Result<UpdateResult> {
        let url = format!("{}/{}", self.records_url(), record_id);

        let request = UpdateRequest {
            record_type: RECORD_TYPE,
            name: &self.record_name,
            content: ip.to_string(),
            ttl: RECORD_TTL,
            proxied: false,
        };

        let response = self.client.put(&url).json(&request).send().await?;
        check_status(response).await?;

        Ok(UpdateResult {
            provider: "cloudflare".to_string(),
            domain: self.record_name.clone(),
            record_id: record_id.to_string(),
            ip,
            timestamp: chrono::Utc::now(),
        })
    }
}
