//! HTTP client for one TAPIR daemon
//!
//! Every call is a JSON `POST` to `<base_url><endpoint>` carrying the
//! `X-API-Key` header. TLS setups present the CLI's client certificate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Certificate, Identity, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tapir_protocol::{
    BootstrapPost, BootstrapResponse, CommandPost, CommandResponse, DebugPost, DebugResponse,
    PingPost, PingResponse, ShowApiResponse, SloggerCmdPost, SloggerCmdResponse,
};
use tracing::{debug, trace};

use crate::error::{ApiError, Result};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const PING_MSG: &str = "One ping to rule them all and in the darkness bind them.";

/// Client certificate setup
#[derive(Debug, Clone)]
pub struct TlsSettings {
    /// CA bundle to trust in addition to the system roots
    pub ca_file: Option<PathBuf>,
    /// Client certificate (PEM)
    pub cert_file: PathBuf,
    /// Client private key (PEM)
    pub key_file: PathBuf,
    /// Skip server certificate verification
    pub accept_invalid_certs: bool,
}

impl TlsSettings {
    /// Client certificate without a private CA
    pub fn new(cert_file: impl Into<PathBuf>, key_file: impl Into<PathBuf>) -> Self {
        Self {
            ca_file: None,
            cert_file: cert_file.into(),
            key_file: key_file.into(),
            accept_invalid_certs: false,
        }
    }
}

/// Builder for [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ApiClientBuilder {
    base_url: String,
    api_key: String,
    tls: Option<TlsSettings>,
    timeout: Duration,
}

impl ApiClientBuilder {
    /// Set the API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Use a client certificate
    pub fn tls(mut self, tls: TlsSettings) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient> {
        let mut builder = reqwest::Client::builder().timeout(self.timeout);

        if let Some(tls) = &self.tls {
            builder = builder.use_rustls_tls();

            if let Some(ca_file) = &tls.ca_file {
                let ca = Certificate::from_pem(&read(ca_file)?).map_err(ApiError::Tls)?;
                builder = builder.add_root_certificate(ca);
            }

            // rustls wants key and certificate in a single PEM buffer
            let mut pem = read(&tls.cert_file)?;
            pem.push(b'\n');
            pem.extend(read(&tls.key_file)?);
            let identity = Identity::from_pem(&pem).map_err(ApiError::Tls)?;
            builder = builder
                .identity(identity)
                .danger_accept_invalid_certs(tls.accept_invalid_certs);
        }

        let http = builder.build().map_err(ApiError::Build)?;
        debug!(
            base_url = %self.base_url,
            tls = self.tls.is_some(),
            "api client ready"
        );

        Ok(ApiClient {
            http,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            api_key: self.api_key,
        })
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| ApiError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// HTTP client for one daemon
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    /// Start building a client for `base_url` (e.g. `https://host:9098/api/v1`)
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: base_url.into(),
            api_key: String::new(),
            tls: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Same client pointed at another server
    ///
    /// The connection pool, TLS identity and API key are shared.
    pub fn with_base_url(&self, base_url: impl Into<String>) -> Self {
        Self {
            http: self.http.clone(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: self.api_key.clone(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Send `body` as JSON and return the raw reply
    pub async fn request<B>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> Result<(StatusCode, Bytes)>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(endpoint);
        debug!(%method, url = %url, "api request");

        let mut request = self.http.request(method, &url).json(body);
        if !self.api_key.is_empty() {
            request = request.header(API_KEY_HEADER, &self.api_key);
        }

        let response = request.send().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ApiError::Transport { url, source })?;

        trace!(
            status = status.as_u16(),
            body = %String::from_utf8_lossy(&bytes),
            "api response"
        );
        Ok((status, bytes))
    }

    /// POST `body` and decode a JSON reply
    pub async fn post_json<Req, Resp>(&self, endpoint: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let (status, bytes) = self.request(Method::POST, endpoint, body).await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                body: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    /// `POST /command`
    pub async fn send_command(&self, post: &CommandPost) -> Result<CommandResponse> {
        self.post_json("/command", post).await
    }

    /// `POST /debug`
    pub async fn send_debug(&self, post: &DebugPost) -> Result<DebugResponse> {
        self.post_json("/debug", post).await
    }

    /// `POST /bootstrap`
    pub async fn send_bootstrap(&self, post: &BootstrapPost) -> Result<BootstrapResponse> {
        self.post_json("/bootstrap", post).await
    }

    /// `POST /status` (TAPIR-Slogger)
    pub async fn send_slogger(&self, post: &SloggerCmdPost) -> Result<SloggerCmdResponse> {
        self.post_json("/status", post).await
    }

    /// `POST /ping` asking for `count` pongs
    pub async fn send_ping(&self, count: u32) -> Result<PingResponse> {
        let post = PingPost {
            msg: PING_MSG.to_string(),
            pings: count,
        };
        self.post_json("/ping", &post).await
    }

    /// `POST /show/api`
    pub async fn show_api(&self) -> Result<ShowApiResponse> {
        self.post_json("/show/api", &CommandPost::new("show")).await
    }
}
