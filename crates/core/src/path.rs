//! Engine-side object paths (`event:/Player/Footstep`, `bus:/SFX`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of engine object a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PathKind {
    /// A playable event (`event:/...`).
    Event,
    /// A mixing bus (`bus:/...`).
    Bus,
}

impl PathKind {
    /// Scheme prefix without the trailing `:/`.
    pub fn scheme(self) -> &'static str {
        match self {
            PathKind::Event => "event",
            PathKind::Bus => "bus",
        }
    }
}

/// Errors emitted when parsing an [`AudioPath`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioPathError {
    /// The scheme was missing or unknown.
    #[error("unknown path scheme in `{0}` (expected event:/ or bus:/)")]
    Scheme(String),
    /// A path segment was empty or contained a control character.
    #[error("invalid segment in `{0}`")]
    Segment(String),
    /// An event path must name at least one segment.
    #[error("event path `{0}` has no name")]
    Empty(String),
}

/// A parsed engine path.
///
/// The bus root (`bus:/`) is the only path allowed to have no segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AudioPath {
    kind: PathKind,
    segments: Vec<String>,
}

impl AudioPath {
    /// Parse `scheme:/seg/seg`.
    pub fn parse(input: &str) -> Result<Self, AudioPathError> {
        let input = input.trim();
        let (kind, rest) = if let Some(rest) = input.strip_prefix("event:/") {
            (PathKind::Event, rest)
        } else if let Some(rest) = input.strip_prefix("bus:/") {
            (PathKind::Bus, rest)
        } else {
            return Err(AudioPathError::Scheme(input.to_string()));
        };

        let mut segments = Vec::new();
        if !rest.is_empty() {
            for segment in rest.split('/') {
                if segment.trim().is_empty() || segment.chars().any(char::is_control) {
                    return Err(AudioPathError::Segment(input.to_string()));
                }
                segments.push(segment.to_string());
            }
        }

        if kind == PathKind::Event && segments.is_empty() {
            return Err(AudioPathError::Empty(input.to_string()));
        }

        Ok(Self { kind, segments })
    }

    /// The root bus path (`bus:/`).
    pub fn master_bus() -> Self {
        Self {
            kind: PathKind::Bus,
            segments: Vec::new(),
        }
    }

    /// Path extended by one segment.
    ///
    /// `segment` must be non-empty and contain no `/`.
    pub fn child(&self, segment: &str) -> Self {
        debug_assert!(!segment.is_empty() && !segment.contains('/'));
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self {
            kind: self.kind,
            segments,
        }
    }

    /// Object kind.
    pub fn kind(&self) -> PathKind {
        self.kind
    }

    /// Path segments after the scheme.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, if any.
    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Whether `self` is `other` or nested beneath it (same kind required).
    pub fn is_within(&self, other: &AudioPath) -> bool {
        self.kind == other.kind && self.segments.starts_with(&other.segments)
    }
}

impl fmt::Display for AudioPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:/{}", self.kind.scheme(), self.segments.join("/"))
    }
}

impl FromStr for AudioPath {
    type Err = AudioPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AudioPath {
    type Error = AudioPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AudioPath> for String {
    fn from(path: AudioPath) -> Self {
        path.to_string()
    }
}
