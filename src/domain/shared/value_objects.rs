//! Shared value objects used across multiple bounded contexts

use super::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a phone number accepted at the boundary
pub const MAX_PHONE_NUMBER_LEN: usize = 20;

/// Call identifier, assigned by the store when a call is first persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(i64);

impl CallId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Phone number value object
///
/// Non-empty and at most [`MAX_PHONE_NUMBER_LEN`] characters. The number is
/// kept verbatim; two numbers are the same line only if the strings match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(number: impl Into<String>) -> Result<Self, DomainError> {
        let number = number.into();

        if number.is_empty() {
            return Err(DomainError::InvalidRequest(
                "Phone number must not be empty".to_string(),
            ));
        }

        if number.chars().count() > MAX_PHONE_NUMBER_LEN {
            return Err(DomainError::InvalidRequest(format!(
                "Phone number {} exceeds {} characters",
                number, MAX_PHONE_NUMBER_LEN
            )));
        }

        Ok(Self(number))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<PhoneNumber> for String {
    fn from(number: PhoneNumber) -> Self {
        number.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
