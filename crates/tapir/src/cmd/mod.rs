//! Command implementations for the TAPIR CLI

pub mod api;
pub mod debug;
pub mod keyupload;
pub mod mqtt;
pub mod ping;
pub mod pop;
pub mod slogger;
