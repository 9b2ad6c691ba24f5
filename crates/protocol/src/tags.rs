//! Observation tags
//!
//! Every observed domain carries a `TagMask`: bit `i` is set when the tag
//! `DEFINED_TAGS[i]` applies. The order of `DEFINED_TAGS` is therefore part
//! of the wire format and must never be reshuffled, only appended to.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Tags known to TAPIR, in bit order
pub const DEFINED_TAGS: &[&str] = &[
    "newdomain",
    "highvolume",
    "verynewdomain",
    "lowvolume",
    "badip",
    "cdntracker",
    "likelymalware",
    "likelybotnetcc",
    "childporn",
    "porn",
    "gambling",
    "phishing",
];

/// Bitmask over `DEFINED_TAGS`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMask(pub u32);

impl TagMask {
    /// Empty mask
    pub const NONE: Self = Self(0);

    /// Build a mask from tag names
    ///
    /// Fails on the first name that is not a defined tag.
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Result<Self, ProtocolError> {
        let mut mask = 0u32;
        for tag in tags {
            let tag = tag.as_ref();
            let bit = DEFINED_TAGS
                .iter()
                .position(|t| *t == tag)
                .ok_or_else(|| ProtocolError::unknown_tag(tag))?;
            mask |= 1 << bit;
        }
        Ok(Self(mask))
    }

    /// Mask with only the bit for `tag` set
    pub fn for_tag(tag: &str) -> Result<Self, ProtocolError> {
        Self::from_tags(&[tag])
    }

    /// Number of tags present
    #[inline]
    pub const fn num_tags(self) -> u32 {
        self.0.count_ones()
    }

    /// Names of the defined tags present in this mask
    pub fn tags(self) -> Vec<&'static str> {
        DEFINED_TAGS
            .iter()
            .enumerate()
            .filter(|(bit, _)| self.0 & (1 << bit) != 0)
            .map(|(_, tag)| *tag)
            .collect()
    }

    /// Raw mask value
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TagMask {
    /// Zero-padded 32 digit binary, the way the daemons log masks
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032b}", self.0)
    }
}
