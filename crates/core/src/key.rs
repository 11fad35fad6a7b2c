//! Namespaced event keys.
//!
//! Event keys are the stable names authoring data uses to refer to audio
//! event definitions (e.g., `player:footstep`). They key the active instance
//! registry, so they are hashable, ordered and validated on parse.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Namespace used when a key omits one.
pub const DEFAULT_NAMESPACE: &str = "game";

/// Error returned when parsing an invalid [`EventKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid event key `{input}`: {reason}")]
pub struct EventKeyError {
    input: String,
    reason: &'static str,
}

impl EventKeyError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// A key of the form `namespace:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventKey {
    namespace: String,
    name: String,
}

impl EventKey {
    /// Parse a key, falling back to [`DEFAULT_NAMESPACE`] when none is given.
    pub fn parse(input: &str) -> Result<Self, EventKeyError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EventKeyError::new(input, "key cannot be empty"));
        }

        let (namespace, name) = trimmed
            .split_once(':')
            .unwrap_or((DEFAULT_NAMESPACE, trimmed));

        if let Err(reason) = check_namespace(namespace).and_then(|()| check_name(name)) {
            return Err(EventKeyError::new(input, reason));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    /// Build a key from parts known to be valid (literals in code).
    pub fn new(namespace: &str, name: &str) -> Self {
        debug_assert!(
            check_namespace(namespace).and_then(|()| check_name(name)).is_ok(),
            "invalid event key {namespace}:{name}"
        );
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Key namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key name within the namespace.
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn check_namespace(namespace: &str) -> Result<(), &'static str> {
    if namespace.is_empty() || namespace.len() > 64 {
        return Err("namespace must be 1-64 chars");
    }
    if !namespace
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '-'))
    {
        return Err("namespace allows only a-z0-9_-");
    }
    Ok(())
}

fn check_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() || name.len() > 128 {
        return Err("name must be 1-128 chars");
    }
    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.' | '/'))
    {
        return Err("name allows only a-z0-9_./-");
    }
    Ok(())
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

impl FromStr for EventKey {
    type Err = EventKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EventKey {
    type Error = EventKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EventKey> for String {
    fn from(key: EventKey) -> Self {
        key.to_string()
    }
}
