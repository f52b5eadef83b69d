//! Input validation for addresses and name aliases

use thiserror::Error;

/// Why a submitted query was not accepted. Nothing changes when one of these
/// is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputRejection {
    #[error("enter an address or .eth name")]
    Empty,
    #[error("not a valid address or .eth name: {0}")]
    InvalidAddress(String),
    #[error("no valid addresses in batch input")]
    NoValidAddresses,
    #[error("select at least one network")]
    NoNetworksSelected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Address,
    Alias,
}

/// `0x` followed by 40 hex characters
pub fn is_valid_address(text: &str) -> bool {
    let Some(payload) = text.strip_prefix("0x") else {
        return false;
    };
    payload.len() == 40 && hex::decode(payload).is_ok()
}

/// ENS-style name
pub fn is_valid_alias(text: &str) -> bool {
    let name = text.trim().to_lowercase();
    name.len() > ".eth".len() && name.ends_with(".eth") && !name.contains(char::is_whitespace)
}

pub fn classify(text: &str) -> Option<InputKind> {
    if is_valid_address(text) {
        Some(InputKind::Address)
    } else if is_valid_alias(text) {
        Some(InputKind::Alias)
    } else {
        None
    }
}

pub fn is_valid_address_or_alias(text: &str) -> bool {
    classify(text).is_some()
}

/// Validated single query input, trimmed.
pub fn parse_address_input(text: &str) -> Result<String, InputRejection> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InputRejection::Empty);
    }
    if !is_valid_address_or_alias(trimmed) {
        return Err(InputRejection::InvalidAddress(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchInput {
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
}

/// Split batch text on newlines, commas and whitespace. Duplicates and the
/// batch limit are handled later by `QueryTarget::batch`.
pub fn parse_batch_input(text: &str) -> BatchInput {
    let mut input = BatchInput::default();
    for token in text
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        if is_valid_address_or_alias(token) {
            input.accepted.push(token.to_string());
        } else {
            input.rejected.push(token.to_string());
        }
    }
    input
}
