//! TAPIR API client
//!
//! Typed HTTP client for the TAPIR daemons' management API.
//!
//! # Usage
//!
//! ```ignore
//! use tapir_api::{ApiClient, TlsSettings};
//! use tapir_protocol::CommandPost;
//!
//! let api = ApiClient::builder("https://127.0.0.1:9098/api/v1")
//!     .api_key("be-vewy-vewy-quiet")
//!     .tls(TlsSettings::new("/etc/dnstapir/certs/tapir-cli.crt", "/etc/dnstapir/certs/tapir-cli.key"))
//!     .build()?;
//!
//! let resp = api.send_command(&CommandPost::new("status")).await?;
//! println!("{}", resp.msg);
//! ```
//!
//! # Endpoints
//!
//! | Endpoint | Daemon | Call |
//! |---|---|---|
//! | `/command` | TAPIR-POP | [`ApiClient::send_command`] |
//! | `/debug` | TAPIR-POP | [`ApiClient::send_debug`] |
//! | `/bootstrap` | TAPIR-POP, bootstrap servers | [`ApiClient::send_bootstrap`] |
//! | `/status` | TAPIR-Slogger | [`ApiClient::send_slogger`] |
//! | `/ping` | all | [`ApiClient::send_ping`] |
//! | `/show/api` | TAPIR-POP | [`ApiClient::show_api`] |

mod client;
mod error;
mod export;

pub use client::{API_KEY_HEADER, ApiClient, ApiClientBuilder, DEFAULT_TIMEOUT, TlsSettings};
pub use error::{ApiError, Result};
pub use export::GreylistExport;
pub use reqwest::{Method, StatusCode};
