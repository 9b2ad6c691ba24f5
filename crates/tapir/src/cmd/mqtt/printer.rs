//! Printing of messages received on subscribed topics
//!
//! | Topic | Payload | Output |
//! |---|---|---|
//! | `events/up/<edge>/observations` | `TapirMsg` | ADD/DEL table |
//! | `events/down/<edge>/general` | `TapirMsg` | ADD/DEL table |
//! | `status/up/axfr/tapir-pop` | `TapirFunctionStatus` | one line per component |
//! | anything else | raw | payload as text |

use anyhow::Result;
use regex::Regex;
use tapir_mqtt::MqttPkgIn;
use tapir_protocol::{ComponentStatus, TapirFunctionStatus, TapirMsg};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::format::format_rfc3339;
use crate::table::Table;

/// Topic TAPIR-POP instances report status on
pub const POP_STATUS_TOPIC: &str = "status/up/axfr/tapir-pop";

const OBSERVATION_TOPIC: &str = r"^events/(up/[^/]+/observations|down/[^/]+/general)$";

/// Renders received packages
pub struct SubPrinter {
    observations: Regex,
}

impl SubPrinter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            observations: Regex::new(OBSERVATION_TOPIC)?,
        })
    }

    /// Text to print for `pkg`
    pub fn render(&self, pkg: &MqttPkgIn) -> String {
        if self.observations.is_match(&pkg.topic) {
            return match serde_json::from_slice::<TapirMsg>(&pkg.payload) {
                Ok(msg) => format!(
                    "Received TAPIR Observation Message on topic {}\n{}",
                    pkg.topic,
                    observation_table(&msg)
                ),
                Err(e) => format!("MQTT: failed to decode json: {e}"),
            };
        }

        if pkg.topic == POP_STATUS_TOPIC {
            return match serde_json::from_slice::<TapirFunctionStatus>(&pkg.payload) {
                Ok(tfs) => status_lines(&tfs),
                Err(e) => format!("MQTT: failed to decode json: {e}"),
            };
        }

        format!(
            "Received TAPIR MQTT Message on topic {}:\n{}",
            pkg.topic,
            String::from_utf8_lossy(&pkg.payload)
        )
    }

    /// Print every package arriving on `inbox` until it closes
    pub fn spawn(self, mut inbox: mpsc::Receiver<MqttPkgIn>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(pkg) = inbox.recv().await {
                debug!(topic = %pkg.topic, validated = pkg.validated, "message received");
                println!("{}", self.render(&pkg));
            }
        })
    }
}

/// `ADD: name  mask` / `DEL: name` rows of an observation
pub fn observation_table(msg: &TapirMsg) -> Table {
    let mut table = Table::headerless();
    for d in &msg.added {
        table.row([format!("ADD: {}", d.name), d.tag_mask.to_string()]);
    }
    for d in &msg.removed {
        table.row([format!("DEL: {}", d.name)]);
    }
    table
}

fn status_lines(tfs: &TapirFunctionStatus) -> String {
    let lines: Vec<String> = tfs
        .component_status
        .values()
        .map(|comp| {
            let (message, label, time) = match comp.status {
                ComponentStatus::Fail => (&comp.error_msg, "failure", &comp.last_fail),
                ComponentStatus::Warn => (&comp.error_msg, "warning", &comp.last_warn),
                ComponentStatus::Ok => (&comp.msg, "success", &comp.last_success),
            };
            format!(
                "TAPIR-POP {} Component: {}, Status: {}, Message: {}, Time of {}: {}",
                tfs.function_id,
                comp.component,
                comp.status,
                message,
                label,
                format_rfc3339(time)
            )
        })
        .collect();

    format!(
        "Received TAPIR-POP status report from {}\n{}",
        tfs.function_id,
        lines.join("\n")
    )
}
