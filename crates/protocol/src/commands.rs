//! HTTP request and response bodies
//!
//! TAPIR-POP serves `/command`, `/debug`, `/bootstrap`, `/ping` and
//! `/show/api`; TAPIR-Slogger serves `/status` and `/ping`. Every endpoint
//! takes a JSON POST body naming a `Command` and answers with a response that
//! carries `Error`/`ErrorMsg` alongside the payload.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnNull, serde_as};

use crate::domain::WbgList;
use crate::status::{ComponentStatus, TapirFunctionStatus};

/// Body of `POST /command`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CommandPost {
    pub command: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub zone: String,
}

impl CommandPost {
    /// Command without arguments
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            zone: String::new(),
        }
    }

    /// Command targeting one zone
    pub fn for_zone(command: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            zone: zone.into(),
        }
    }
}

/// Reply to `POST /command`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CommandResponse {
    pub time: DateTime<Utc>,
    pub status: String,
    pub msg: String,
    pub tapir_function_status: TapirFunctionStatus,
    pub error: bool,
    pub error_msg: String,
}

/// Body of `POST /debug`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DebugPost {
    pub command: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub zone: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub qname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qtype: Option<u16>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ComponentStatus>,
}

impl DebugPost {
    /// Debug command without arguments
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }
}

/// One RPZ output entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RpzName {
    pub name: String,
    #[serde(rename = "RR")]
    pub rr: Option<String>,
}

/// MQTT message counters kept by the TAPIR-POP MQTT engine
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MqttStats {
    #[serde_as(as = "DefaultOnNull")]
    pub msg_counters: BTreeMap<String, u32>,
    #[serde_as(as = "DefaultOnNull")]
    pub msg_time_stamps: BTreeMap<String, DateTime<Utc>>,
}

/// Per greylist: deletion time → names deleted at that time
pub type ReaperStats = BTreeMap<String, BTreeMap<DateTime<Utc>, Vec<String>>>;

/// Reply to `POST /debug`
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DebugResponse {
    pub msg: String,
    /// Colour ("whitelist", "blacklist", "greylist") → list name → list
    #[serde_as(as = "DefaultOnNull<BTreeMap<_, DefaultOnNull>>")]
    pub lists: BTreeMap<String, BTreeMap<String, WbgList>>,
    #[serde_as(as = "DefaultOnNull")]
    pub blacklisted_names: Vec<String>,
    #[serde_as(as = "DefaultOnNull")]
    pub greylisted_names: Vec<String>,
    #[serde_as(as = "DefaultOnNull")]
    pub rpz_output: Vec<RpzName>,
    pub mqtt_stats: MqttStats,
    #[serde_as(as = "DefaultOnNull<BTreeMap<_, DefaultOnNull<BTreeMap<_, DefaultOnNull>>>>")]
    pub reaper_stats: ReaperStats,
    pub error: bool,
    pub error_msg: String,
}

/// Body of `POST /bootstrap`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BootstrapPost {
    pub command: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub list_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub encoding: String,
}

/// Publish/subscribe counters for one MQTT topic on a bootstrap server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TopicData {
    pub pub_msgs: u64,
    pub sub_msgs: u64,
    pub latest_pub: DateTime<Utc>,
    pub latest_sub: DateTime<Utc>,
}

/// Reply to `POST /bootstrap`
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BootstrapResponse {
    pub time: DateTime<Utc>,
    pub status: String,
    pub msg: String,
    #[serde_as(as = "DefaultOnNull")]
    pub topic_data: BTreeMap<String, TopicData>,
    pub error: bool,
    pub error_msg: String,
}

/// Body of `POST /status` on TAPIR-Slogger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SloggerCmdPost {
    pub command: String,
}

/// Reply to `POST /status` on TAPIR-Slogger
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SloggerCmdResponse {
    pub time: DateTime<Utc>,
    pub msg: String,
    /// Function ID → latest status report from that TAPIR-POP
    #[serde_as(as = "DefaultOnNull")]
    pub pop_status: BTreeMap<String, TapirFunctionStatus>,
    /// Function ID → latest status report from that TAPIR-EDM
    #[serde_as(as = "DefaultOnNull")]
    pub edm_status: BTreeMap<String, TapirFunctionStatus>,
    pub error: bool,
    pub error_msg: String,
}

/// Body of `POST /ping`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PingPost {
    pub msg: String,
    pub pings: u32,
}

/// Reply to `POST /ping`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PingResponse {
    pub time: DateTime<Utc>,
    pub boot_time: DateTime<Utc>,
    pub daemon: String,
    pub server_host: String,
    pub client: String,
    pub version: String,
    pub msg: String,
    pub pings: u32,
    pub pongs: u32,
}

/// Reply to `POST /show/api`
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ShowApiResponse {
    pub status: u16,
    pub msg: String,
    #[serde_as(as = "DefaultOnNull")]
    pub data: Vec<String>,
}
