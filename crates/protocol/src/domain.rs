//! Domain observations and colour lists

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnNull, serde_as};

use crate::tags::TagMask;

/// Make a domain name fully qualified by appending the root dot
pub fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// A domain name carried in an observation message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Domain {
    pub name: String,
    pub time_added: DateTime<Utc>,
    /// Seconds the observation stays valid
    #[serde(rename = "TTL")]
    pub ttl: u32,
    pub tag_mask: TagMask,
}

/// Observation message published on the observations topic
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TapirMsg {
    pub src_name: String,
    pub creator: String,
    pub msg_type: String,
    pub list_type: String,
    pub msg: String,
    #[serde_as(as = "DefaultOnNull")]
    pub added: Vec<Domain>,
    #[serde_as(as = "DefaultOnNull")]
    pub removed: Vec<Domain>,
    pub time_stamp: DateTime<Utc>,
}

impl TapirMsg {
    /// Empty greylist observation from `src_name`
    pub fn observation(src_name: impl Into<String>) -> Self {
        Self {
            src_name: src_name.into(),
            creator: crate::CREATOR.to_string(),
            msg_type: "observation".to_string(),
            list_type: "greylist".to_string(),
            time_stamp: Utc::now(),
            ..Default::default()
        }
    }

    /// True when nothing has been added or removed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// A name held in a white/black/grey list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TapirName {
    pub name: String,
    pub time_added: DateTime<Utc>,
    /// Lifetime in nanoseconds
    #[serde(rename = "TTL")]
    pub ttl: i64,
    pub tag_mask: TagMask,
    #[serde(rename = "RR")]
    pub rr: Option<String>,
}

impl TapirName {
    /// Lifetime left at `now`, negative once expired
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        let ttl = Duration::from_nanos(self.ttl.max(0) as u64).as_secs() as i64;
        let age = (now - self.time_added).num_seconds();
        ttl - age
    }
}

/// A named white, black or grey list
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WbgList {
    pub name: String,
    pub description: String,
    #[serde(rename = "Type")]
    pub list_type: String,
    pub src_format: String,
    pub format: String,
    pub datasource: String,
    #[serde_as(as = "DefaultOnNull")]
    pub names: BTreeMap<String, TapirName>,
    /// Names scheduled for deletion, keyed by deletion time
    #[serde_as(as = "DefaultOnNull<BTreeMap<_, DefaultOnNull>>")]
    pub reaper_data: BTreeMap<DateTime<Utc>, BTreeMap<String, bool>>,
}

impl WbgList {
    /// Names scheduled for deletion at each reaper time
    pub fn reaper_schedule(&self) -> impl Iterator<Item = (&DateTime<Utc>, BTreeSet<&str>)> {
        self.reaper_data
            .iter()
            .map(|(t, names)| (t, names.keys().map(String::as_str).collect()))
    }
}

/// Key upload message: a JWS over the public key plus the signer's certificate chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PubKeyUpload {
    #[serde(rename = "JWSMessage")]
    pub jws_message: String,
    #[serde(rename = "ClientCertPEM")]
    pub client_cert_pem: String,
}
