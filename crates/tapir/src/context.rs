//! Global flags and the state shared by every command

use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use clap::Args;
use serde::Serialize;
use tapir_api::{ApiClient, TlsSettings};
use tapir_config::{Config, DEFAULT_CONFIG_FILE, Service};
use tracing::debug;

use crate::table::Table;

/// Flags accepted by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Run without a configuration file (only local commands work)
    #[arg(long, global = true)]
    pub standalone: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Debug output, including raw responses
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Show column headers
    #[arg(short = 'H', long, global = true)]
    pub headers: bool,

    /// Talk plain HTTP instead of HTTPS with a client certificate
    #[arg(long, global = true)]
    pub no_tls: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

/// Flags plus the loaded configuration
#[derive(Debug, Clone)]
pub struct Context {
    pub verbose: bool,
    pub debug: bool,
    pub headers: bool,
    pub use_tls: bool,
    config: Option<Config>,
}

impl Context {
    /// Build the context, loading the configuration file when `load_config` is set
    pub fn new(args: &GlobalArgs, load_config: bool) -> Result<Self> {
        let config = if args.standalone || !load_config {
            None
        } else {
            let config = Config::load(&args.config).with_context(|| {
                format!("failed to load configuration from {}", args.config.display())
            })?;
            debug!(path = %args.config.display(), "configuration loaded");
            Some(config)
        };

        Ok(Self {
            verbose: args.verbose,
            debug: args.debug,
            headers: args.headers,
            use_tls: !args.no_tls,
            config,
        })
    }

    /// Context around an already loaded configuration
    #[cfg(test)]
    pub fn with_config(config: Config) -> Self {
        Self {
            verbose: false,
            debug: false,
            headers: true,
            use_tls: true,
            config: Some(config),
        }
    }

    /// The configuration, or an error in standalone mode
    pub fn config(&self) -> Result<&Config> {
        match &self.config {
            Some(config) => Ok(config),
            None => bail!("this command needs a configuration file (not available with --standalone)"),
        }
    }

    /// API client for TAPIR-POP
    pub fn pop_api(&self) -> Result<ApiClient> {
        self.api(Service::Pop)
    }

    /// API client for TAPIR-Slogger
    pub fn slogger_api(&self) -> Result<ApiClient> {
        self.api(Service::Slogger)
    }

    fn api(&self, service: Service) -> Result<ApiClient> {
        let config = self.config()?;
        let server = config.cli.server(service);
        let base_url = server.base_url(service, self.use_tls)?;

        let mut builder = ApiClient::builder(base_url).api_key(&server.apikey);
        if self.use_tls {
            let cert = config.certs.own_cert()?;
            builder = builder.tls(self.tls_settings(cert.cert, cert.key)?);
        }

        builder
            .build()
            .with_context(|| format!("could not set up API client to {service} at {base_url}"))
    }

    /// TLS setup presenting the given client certificate
    ///
    /// Server certificates are not verified; lab servers carry no usable SANs.
    pub fn tls_settings(&self, cert: PathBuf, key: PathBuf) -> Result<TlsSettings> {
        let config = self.config()?;
        Ok(TlsSettings {
            ca_file: config.certs.cacertfile.clone(),
            accept_invalid_certs: true,
            ..TlsSettings::new(cert, key)
        })
    }

    /// Table honouring `--headers`
    pub fn table<I, S>(&self, header: I) -> Table
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Table::new(header).with_header(self.headers)
    }

    /// Print a response as indented JSON when `--debug` is on
    pub fn dump<T: Serialize>(&self, what: &str, value: &T) {
        if !self.debug {
            return;
        }
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{what}:\n{json}"),
            Err(e) => debug!(error = %e, "could not render {what} as JSON"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn args() -> GlobalArgs {
        GlobalArgs {
            config: PathBuf::from("/nonexistent/tapir-cli.yaml"),
            standalone: false,
            verbose: false,
            debug: false,
            headers: false,
            no_tls: false,
            log_level: None,
        }
    }

    #[test]
    fn test_standalone_skips_config() {
        let mut args = args();
        args.standalone = true;
        let ctx = Context::new(&args, true).unwrap();
        assert!(ctx.config().is_err());
        assert!(ctx.pop_api().is_err());
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let err = Context::new(&args(), true).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tapir-cli.yaml"));
    }

    #[test]
    fn test_headers_off_by_default() {
        let ctx = Context::new(&args(), false).unwrap();
        assert!(!ctx.headers);
        assert!(ctx.use_tls);
    }

    #[test]
    fn test_flags_copied() {
        let mut args = args();
        args.headers = true;
        args.no_tls = true;
        args.verbose = true;
        let ctx = Context::new(&args, false).unwrap();
        assert!(ctx.headers);
        assert!(!ctx.use_tls);
        assert!(ctx.verbose);
    }

    #[test]
    fn test_plain_http_client() {
        let config = Config::from_str(
            "cli:\n  tapir-pop:\n    url: http://127.0.0.1:9099/api/v1\n    apikey: k\n",
        )
        .unwrap();
        let mut ctx = Context::with_config(config);
        ctx.use_tls = false;

        let api = ctx.pop_api().unwrap();
        assert_eq!(api.base_url(), "http://127.0.0.1:9099/api/v1");
    }

    #[test]
    fn test_tls_requires_tlsurl() {
        let config = Config::from_str(
            "cli:\n  tapir-slogger:\n    url: http://127.0.0.1:9399/api/v1\n",
        )
        .unwrap();
        let ctx = Context::with_config(config);

        let err = ctx.slogger_api().unwrap_err();
        assert!(format!("{err:#}").contains("cli.tapir-slogger.tlsurl"));
    }

    #[test]
    fn test_tls_requires_certdir() {
        let config = Config::from_str(
            "cli:\n  tapir-pop:\n    tlsurl: https://127.0.0.1:9098/api/v1\n",
        )
        .unwrap();
        let ctx = Context::with_config(config);

        let err = ctx.pop_api().unwrap_err();
        assert!(format!("{err:#}").contains("certs.certdir"));
    }
}
