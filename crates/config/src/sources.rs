//! TAPIR-POP sources file
//!
//! The POP reads its policy sources from a separate YAML file. The CLI only
//! needs it to find the bootstrap servers of MQTT greylist sources.
//!
//! ```yaml
//! sources:
//!   tapir:
//!     name: dns-tapir
//!     type: greylist
//!     source: mqtt
//!     topic: events/up/+/observations
//!     bootstrap: [ 192.0.2.10:5454, 192.0.2.11:5454 ]
//!     bootstrapurl: https://%s/api/v1
//!     bootstrapkey: be-vewy-vewy-quiet
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SourcesFile {
    sources: BTreeMap<String, SourceConf>,
}

/// One policy source
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceConf {
    /// List name (e.g. `dns-tapir`)
    pub name: String,
    /// Free-text description
    pub description: String,
    /// `whitelist`, `blacklist` or `greylist`
    #[serde(rename = "type")]
    pub list_type: String,
    /// MQTT topic for `mqtt` sources
    pub topic: String,
    /// Where the data comes from (`mqtt`, `file`, `xfr`, ...)
    pub source: String,
    /// Format of the source data
    pub src_format: String,
    /// Internal storage format
    pub format: String,
    /// Data source location
    pub datasource: String,
    /// Bootstrap servers (`host:port`)
    pub bootstrap: Vec<String>,
    /// URL template; `%s` is replaced by the server
    pub bootstrapurl: String,
    /// API key for the bootstrap servers
    pub bootstrapkey: String,
}

impl SourceConf {
    /// Base URL of a bootstrap server
    pub fn bootstrap_url(&self, server: &str) -> String {
        self.bootstrapurl.replacen("%s", server, 1)
    }

    /// Whether this is the MQTT-fed greylist called `list`
    pub fn is_mqtt_greylist(&self, list: &str) -> bool {
        self.name == list && self.source == "mqtt" && self.list_type == "greylist"
    }
}

/// Parse the sources file at `path`, keyed by source id
pub fn parse_sources<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, SourceConf>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_sources_str(&contents)
}

/// Parse sources from a YAML string
pub fn parse_sources_str(s: &str) -> Result<BTreeMap<String, SourceConf>> {
    let file: SourcesFile = serde_yaml::from_str(s)?;
    Ok(file.sources)
}
