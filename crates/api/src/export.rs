//! Greylist export replies
//!
//! `export-greylist` answers with the list itself when it exists. When the
//! daemon cannot serve the list it answers with a plain `BootstrapResponse`
//! instead, so the reply has to be told apart by shape.

use serde_json::Value;
use tapir_protocol::{BootstrapResponse, WbgList};

/// Decoded reply to an `export-greylist` bootstrap request
#[derive(Debug, Clone, PartialEq)]
pub enum GreylistExport {
    /// The exported list
    List(WbgList),
    /// A status reply (usually an error) instead of the list
    Reply(BootstrapResponse),
}

impl GreylistExport {
    /// Decode an export reply
    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        let is_list = value
            .as_object()
            .is_some_and(|o| o.contains_key("Names") || o.contains_key("ReaperData"));

        if is_list {
            serde_json::from_value(value).map(Self::List)
        } else {
            serde_json::from_value(value).map(Self::Reply)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_list() {
        let body = br#"{
            "Name": "dns-tapir",
            "Type": "greylist",
            "Names": {
                "bad.example.": {"Name": "bad.example.", "TTL": 3600000000000, "TagMask": 5}
            },
            "ReaperData": {}
        }"#;
        match GreylistExport::decode(body).unwrap() {
            GreylistExport::List(list) => {
                assert_eq!(list.name, "dns-tapir");
                assert_eq!(list.names["bad.example."].tag_mask.bits(), 5);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_reply() {
        let body = br#"{"Msg": "", "Error": true, "ErrorMsg": "greylist foo not found"}"#;
        match GreylistExport::decode(body).unwrap() {
            GreylistExport::Reply(br) => {
                assert!(br.error);
                assert_eq!(br.error_msg, "greylist foo not found");
            }
            other => panic!("expected reply, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_garbage() {
        assert!(GreylistExport::decode(b"\x00\x01gob").is_err());
    }
}
