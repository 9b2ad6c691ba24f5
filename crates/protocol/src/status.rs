//! Component status reporting
//!
//! TAPIR functions (POP, EDM) report the health of their components as a
//! `TapirFunctionStatus`. The CLI reads these from TAPIR-POP and
//! TAPIR-Slogger, and can also compose and publish them for testing.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnNull, serde_as};

use crate::error::ProtocolError;

/// Health of a single component
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is failing
    Fail,
    /// Component works but reported a warning
    Warn,
    /// Component is healthy
    #[default]
    Ok,
}

impl ComponentStatus {
    /// All statuses in severity order
    pub const ALL: [Self; 3] = [Self::Fail, Self::Warn, Self::Ok];

    /// Get the string name of this status
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Warn => "warn",
            Self::Ok => "ok",
        }
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ComponentStatus {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" => Ok(Self::Fail),
            "warn" => Ok(Self::Warn),
            "ok" => Ok(Self::Ok),
            other => Err(ProtocolError::invalid_status(other)),
        }
    }
}

/// Status of one component within a TAPIR function
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TapirComponentStatus {
    pub component: String,
    pub status: ComponentStatus,
    pub error_msg: String,
    pub msg: String,
    pub num_fails: u32,
    pub num_warnings: u32,
    pub last_fail: DateTime<Utc>,
    pub last_warn: DateTime<Utc>,
    pub last_success: DateTime<Utc>,
}

impl TapirComponentStatus {
    /// A healthy component with no history
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            ..Default::default()
        }
    }

    /// Record a new status observed at `now`
    ///
    /// Failures and warnings bump their counters and timestamps and keep the
    /// message as the error text. Success clears the error text.
    pub fn record(&mut self, status: ComponentStatus, message: String, now: DateTime<Utc>) {
        self.status = status;
        match status {
            ComponentStatus::Fail => {
                self.last_fail = now;
                self.num_fails += 1;
                self.error_msg = message;
            }
            ComponentStatus::Warn => {
                self.last_warn = now;
                self.num_warnings += 1;
                self.error_msg = message;
            }
            ComponentStatus::Ok => {
                self.last_success = now;
                self.error_msg.clear();
                self.msg = message;
            }
        }
    }
}

/// Status report for a whole TAPIR function (e.g. one TAPIR-POP instance)
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TapirFunctionStatus {
    pub function: String,
    #[serde(rename = "FunctionID")]
    pub function_id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub component_status: BTreeMap<String, TapirComponentStatus>,
    pub num_failures: u32,
}

impl TapirFunctionStatus {
    /// Components currently in the failing state
    pub fn failing(&self) -> impl Iterator<Item = (&String, &TapirComponentStatus)> {
        self.component_status
            .iter()
            .filter(|(_, c)| c.status == ComponentStatus::Fail)
    }
}

/// Status update emitted by a long-running component (e.g. the MQTT engine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComponentStatusUpdate {
    pub component: String,
    pub status: ComponentStatus,
    pub msg: String,
    pub time_stamp: DateTime<Utc>,
}

impl ComponentStatusUpdate {
    /// Update stamped with the current time
    pub fn now(component: impl Into<String>, status: ComponentStatus, msg: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status,
            msg: msg.into(),
            time_stamp: Utc::now(),
        }
    }
}

impl fmt::Display for ComponentStatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({})",
            self.component,
            self.status,
            if self.msg.is_empty() { "-" } else { &self.msg }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_str() {
        assert_eq!("ok".parse::<ComponentStatus>().unwrap(), ComponentStatus::Ok);
        assert_eq!("warn".parse::<ComponentStatus>().unwrap(), ComponentStatus::Warn);
        assert_eq!("fail".parse::<ComponentStatus>().unwrap(), ComponentStatus::Fail);
        assert!("OK".parse::<ComponentStatus>().is_err());
        assert!("".parse::<ComponentStatus>().is_err());
    }

    #[test]
    fn test_status_roundtrips_through_as_str() {
        for status in ComponentStatus::ALL {
            assert_eq!(status.as_str().parse::<ComponentStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_record_fail_bumps_counters() {
        let now = Utc::now();
        let mut comp = TapirComponentStatus::new("rpz-update");
        comp.record(ComponentStatus::Fail, "boom".to_string(), now);
        comp.record(ComponentStatus::Fail, "boom again".to_string(), now);

        assert_eq!(comp.status, ComponentStatus::Fail);
        assert_eq!(comp.num_fails, 2);
        assert_eq!(comp.last_fail, now);
        assert_eq!(comp.error_msg, "boom again");
    }

    #[test]
    fn test_record_warn_then_ok_clears_error() {
        let now = Utc::now();
        let mut comp = TapirComponentStatus::new("mqtt-msg");
        comp.record(ComponentStatus::Warn, "slow".to_string(), now);
        assert_eq!(comp.num_warnings, 1);
        assert_eq!(comp.error_msg, "slow");

        comp.record(ComponentStatus::Ok, "fine now".to_string(), now);
        assert_eq!(comp.status, ComponentStatus::Ok);
        assert!(comp.error_msg.is_empty());
        assert_eq!(comp.msg, "fine now");
        assert_eq!(comp.last_success, now);
        assert_eq!(comp.num_warnings, 1);
    }

    #[test]
    fn test_failing_filters_components() {
        let mut tfs = TapirFunctionStatus::default();
        let mut bad = TapirComponentStatus::new("a");
        bad.status = ComponentStatus::Fail;
        tfs.component_status.insert("a".to_string(), bad);
        tfs.component_status
            .insert("b".to_string(), TapirComponentStatus::new("b"));

        let failing: Vec<_> = tfs.failing().map(|(name, _)| name.as_str()).collect();
        assert_eq!(failing, vec!["a"]);
    }

    #[test]
    fn test_function_status_wire_names() {
        let tfs = TapirFunctionStatus {
            function: "tapir-pop".to_string(),
            function_id: "pop-1".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&tfs).unwrap();
        assert_eq!(json["Function"], "tapir-pop");
        assert_eq!(json["FunctionID"], "pop-1");
        assert!(json["ComponentStatus"].is_object());
    }
}
