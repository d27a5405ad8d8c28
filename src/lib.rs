//! # cf-ddns
//!
//! Keeps a single Cloudflare "A" record pointed at the public IPv4
//! address of the machine it runs on.
//!
//! On startup the record's identifier is looked up once by zone and name.
//! After that the public IP is polled on a fixed interval and the record is
//! overwritten whenever the address differs from the last one the provider
//! accepted. A failed update is simply retried on the next poll.
//!
//! ## Usage
//!
//! ```bash
//! export APIKey=... Zone=... RecordName=home.example.com
//!
//! # Run forever
//! cf-ddns run
//!
//! # One pass, then exit
//! cf-ddns once
//!
//! # Show detected IP and current record content
//! cf-ddns status
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod providers;
pub mod updater;

pub use config::Config;
pub use detector::{IpDetector, IpSource};
pub use error::{DdnsError, Result};
pub use providers::{CloudflareProvider, DnsProvider};
pub use updater::{TickOutcome, Updater};
