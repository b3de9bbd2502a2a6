//! Partition-key layout of the label table
//!
//! Label-association rows live under `LABEL#<label>`. Every such key sorts
//! after the bare `LABEL` prefix and before `VIDEO`, so the half-open range
//! `["LABEL", "VIDEO")` selects exactly the label rows as long as no other
//! row family uses a prefix inside that interval.

use thiserror::Error;

use crate::store::KeyCondition;

/// Prefix of label-association partition keys
pub const LABEL_PREFIX: &str = "LABEL";

/// Exclusive upper bound of the label range (the next row family)
pub const LABEL_RANGE_END: &str = "VIDEO";

/// Separator between a key family and its value
pub const KEY_DELIMITER: char = '#';

/// Longest label accepted for key composition, in bytes
pub const MAX_LABEL_LEN: usize = 256;

/// Reasons a label cannot be composed into a partition key
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("label is empty")]
    Empty,

    #[error("label is {len} bytes, limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("label contains the key delimiter '{0}'")]
    ContainsDelimiter(char),

    #[error("label contains a control character")]
    ControlCharacter,
}

/// Check that a label can be embedded in a partition key without changing its structure
pub fn validate_label(label: &str) -> Result<(), KeyError> {
    if label.is_empty() {
        return Err(KeyError::Empty);
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(KeyError::TooLong {
            len: label.len(),
            max: MAX_LABEL_LEN,
        });
    }
    if label.contains(KEY_DELIMITER) {
        return Err(KeyError::ContainsDelimiter(KEY_DELIMITER));
    }
    if label.chars().any(char::is_control) {
        return Err(KeyError::ControlCharacter);
    }
    Ok(())
}

/// Validated `LABEL#<label>` partition key
pub fn label_partition_key(label: &str) -> Result<String, KeyError> {
    validate_label(label)?;
    Ok(compose_label_key(label))
}

/// Unchecked key composition for rows built from trusted data
pub(crate) fn compose_label_key(label: &str) -> String {
    format!("{}{}{}", LABEL_PREFIX, KEY_DELIMITER, label)
}

/// Label carried in a `LABEL#<label>` partition key
pub fn label_from_partition_key(partition_key: &str) -> Option<&str> {
    partition_key
        .strip_prefix(LABEL_PREFIX)
        .and_then(|rest| rest.strip_prefix(KEY_DELIMITER))
}

/// Range condition covering every label-association row
pub fn label_range() -> KeyCondition {
    KeyCondition::range(LABEL_PREFIX, LABEL_RANGE_END)
}
