//! TAPIR Protocol - Wire types for the TAPIR daemons
//!
//! This crate holds the request and response structs exchanged with
//! TAPIR-POP, TAPIR-Slogger and the MQTT bootstrap servers, plus the
//! messages carried on the MQTT bus:
//!
//! - `CommandPost` / `DebugPost` / `BootstrapPost` / `SloggerCmdPost` - HTTP requests
//! - `TapirMsg` - Observation messages (added/removed domains with tags)
//! - `TapirFunctionStatus` - Component status reports
//! - `TagMask` - Bitmask over the defined observation tags
//!
//! # Wire Format
//!
//! All structs serialize as JSON with PascalCase field names, which is what
//! the daemons expect. Missing fields decode to their defaults so that older
//! daemons with fewer fields remain readable.

mod commands;
mod domain;
mod error;
mod status;
mod tags;

pub use commands::{
    BootstrapPost, BootstrapResponse, CommandPost, CommandResponse, DebugPost, DebugResponse,
    MqttStats, PingPost, PingResponse, ReaperStats, RpzName, ShowApiResponse, SloggerCmdPost,
    SloggerCmdResponse, TopicData,
};
pub use domain::{Domain, PubKeyUpload, TapirMsg, TapirName, WbgList, fqdn};
pub use error::ProtocolError;
pub use status::{
    ComponentStatus, ComponentStatusUpdate, TapirComponentStatus, TapirFunctionStatus,
};
pub use tags::{DEFINED_TAGS, TagMask};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Timestamp layout used when printing times in tables
pub const TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// Creator name stamped on messages originating from the CLI
pub const CREATOR: &str = "tapir-cli";
