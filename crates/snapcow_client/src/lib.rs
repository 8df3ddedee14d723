//! # Snapcow Client
//!
//! Control client for the user-space snapshot merge daemon.
//!
//! During an A/B update two daemon instances exist: the first-stage
//! daemon started in early boot, and the second-stage daemon that takes
//! over once the root filesystem is live. Exactly one is *active* at a
//! time. This crate speaks the daemon's text control protocol over local
//! stream sockets and drives the first-stage → second-stage handoff:
//!
//! ```ignore
//! let config = ClientConfig::new("/run/snapd-first.sock", "/run/snapd-second.sock");
//! let client = DaemonClient::new(config);
//! client.restart(&[DeviceTriple::new("system_cow", "system_a", "dm-user-0")])?;
//! ```
//!
//! ## Protocol
//!
//! One command per connection, a single send and a single receive, raw
//! ASCII bounded by the packet size:
//!
//! | Request | Reply |
//! |---|---|
//! | `query` | `active` \| `passive` \| `fail` |
//! | `start,<cow>,<base>,<control>` | `success` \| `fail` |
//! | `terminate-request` | `success` \| `fail` |
//! | `stop` | *(none)* |
//!
//! Replies are classified by exact token match; an unrecognized reply is
//! a protocol error rather than a guess.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod connection;
mod error;

pub use client::{DaemonClient, DeviceTriple};
pub use config::{ClientConfig, PACKET_SIZE};
pub use connection::{DaemonConnection, Reply};
pub use error::{ClientError, ClientResult};
