//! Key names for inboxes and inflight lists.
//!
//! A queue identity is an optional suffix (the channel, e.g. `sms`) and an
//! optional [`PriorityClass`]. Names are built as
//! `{kind}[:{suffix}][:{priority}]`, keeping the suffix column empty when only
//! a priority class is given (`inbox::bulk`), so that every identity maps to a
//! distinct name:
//!
//! | suffix | priority | inbox           | inflight prefix     |
//! |--------|----------|-----------------|---------------------|
//! | -      | -        | `inbox`         | `in-flight`         |
//! | `sms`  | -        | `inbox:sms`     | `in-flight:sms`     |
//! | -      | `bulk`   | `inbox::bulk`   | `in-flight::bulk`   |
//! | `sms`  | `bulk`   | `inbox:sms:bulk`| `in-flight:sms:bulk`|
//!
//! An inflight list is named `{inflight prefix}:{receipt}`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::StorageError;

/// Characters a suffix may not contain: the name separator and the glob
/// metacharacters understood by `SCAN MATCH`.
const RESERVED_SUFFIX_CHARS: &[char] = &[':', '*', '?', '[', ']', '\\'];

/// Processing class of a queue, used to split one channel into lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityClass {
    Bulk,
    Normal,
    Priority,
}

impl PriorityClass {
    pub const ALL: [PriorityClass; 3] = [
        PriorityClass::Bulk,
        PriorityClass::Normal,
        PriorityClass::Priority,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityClass::Bulk => "bulk",
            PriorityClass::Normal => "normal",
            PriorityClass::Priority => "priority",
        }
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorityClass {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bulk" => Ok(PriorityClass::Bulk),
            "normal" => Ok(PriorityClass::Normal),
            "priority" => Ok(PriorityClass::Priority),
            other => Err(StorageError::Configuration(format!(
                "unknown priority class '{}'",
                other
            ))),
        }
    }
}

/// The two kinds of list a queue owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Buffer {
    Inbox,
    InFlight,
}

impl Buffer {
    /// Base token every name of this kind starts with.
    pub fn token(&self) -> &'static str {
        match self {
            Buffer::Inbox => "inbox",
            Buffer::InFlight => "in-flight",
        }
    }

    /// Name for this kind of list under the given identity.
    ///
    /// For [`Buffer::InFlight`] this is the prefix shared by all of the
    /// identity's inflight lists.
    pub fn name(&self, suffix: Option<&str>, priority_class: Option<PriorityClass>) -> String {
        let base = self.token();
        match (non_empty(suffix), priority_class) {
            (Some(suffix), Some(priority)) => format!("{}:{}:{}", base, suffix, priority),
            (Some(suffix), None) => format!("{}:{}", base, suffix),
            (None, Some(priority)) => format!("{}::{}", base, priority),
            (None, None) => base.to_string(),
        }
    }
}

/// Inbox name for an identity.
pub fn inbox_name(suffix: Option<&str>, priority_class: Option<PriorityClass>) -> String {
    Buffer::Inbox.name(suffix, priority_class)
}

/// Prefix shared by every inflight list of an identity.
pub fn inflight_prefix(suffix: Option<&str>, priority_class: Option<PriorityClass>) -> String {
    Buffer::InFlight.name(suffix, priority_class)
}

/// Name of the inflight list created by the poll that minted `receipt`.
pub fn inflight_name(
    receipt: &Uuid,
    suffix: Option<&str>,
    priority_class: Option<PriorityClass>,
) -> String {
    format!("{}:{}", inflight_prefix(suffix, priority_class), receipt)
}

/// Reject suffixes that would make names ambiguous or break prefix scans.
pub fn validate_suffix(suffix: &str) -> Result<(), StorageError> {
    if let Some(c) = suffix.chars().find(|c| RESERVED_SUFFIX_CHARS.contains(c)) {
        return Err(StorageError::Configuration(format!(
            "queue suffix '{}' contains reserved character '{}'",
            suffix, c
        )));
    }
    Ok(())
}

/// An empty suffix names the same queue as no suffix.
fn non_empty(suffix: Option<&str>) -> Option<&str> {
    suffix.filter(|s| !s.is_empty())
}
