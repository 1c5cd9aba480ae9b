//! Structured keys for batch generation requests.
//!
//! The batch provider only carries a flat `custom_id` string per request.
//! Inside the backend every request is addressed by a typed key; the string
//! form is produced with [`fmt::Display`] when a request is sent and parsed
//! back with [`FromStr`] when a result comes in, and nowhere else.
//!
//! Wire formats:
//! - hooks: `hook_angle<N>_hook<M>`
//! - scripts: `script_angle<N>_hook<M>_v<V>`

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of hook requests generated for every angle.
pub const HOOKS_PER_ANGLE: u32 = 21;

/// Number of script requests generated for every succeeded hook.
pub const SCRIPTS_PER_HOOK: u32 = 2;

const HOOK_PREFIX: &str = "hook_";
const SCRIPT_PREFIX: &str = "script_";

/// Error raised when a wire identifier cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed request identifier '{id}': {reason}")]
pub struct KeyError {
    pub id: String,
    pub reason: String,
}

impl KeyError {
    fn new(id: &str, reason: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Stylistic variant of a generated script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScriptVariant {
    /// Version 1: direct-response ad copy
    DirectResponse,
    /// Version 2: story-driven narrative
    StoryDriven,
}

impl ScriptVariant {
    /// All variants in version order.
    pub const ALL: [ScriptVariant; SCRIPTS_PER_HOOK as usize] =
        [ScriptVariant::DirectResponse, ScriptVariant::StoryDriven];

    /// Version number used in the wire identifier.
    pub fn version(&self) -> u32 {
        match self {
            ScriptVariant::DirectResponse => 1,
            ScriptVariant::StoryDriven => 2,
        }
    }

    pub fn from_version(version: u32) -> Option<Self> {
        match version {
            1 => Some(ScriptVariant::DirectResponse),
            2 => Some(ScriptVariant::StoryDriven),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptVariant::DirectResponse => "direct_response",
            ScriptVariant::StoryDriven => "story_driven",
        }
    }
}

impl fmt::Display for ScriptVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Position of a hook: 1-based angle position and 1-based hook ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct HookKey {
    pub angle: u32,
    pub hook: u32,
}

impl HookKey {
    pub fn new(angle: u32, hook: u32) -> Self {
        Self { angle, hook }
    }

    /// Script key for one variant of this hook.
    pub fn script(&self, variant: ScriptVariant) -> ScriptKey {
        ScriptKey {
            hook: *self,
            variant,
        }
    }
}

impl fmt::Display for HookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}angle{}_hook{}", HOOK_PREFIX, self.angle, self.hook)
    }
}

impl FromStr for HookKey {
    type Err = KeyError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let rest = id
            .strip_prefix(HOOK_PREFIX)
            .ok_or_else(|| KeyError::new(id, "missing 'hook_' prefix"))?;

        let segments: Vec<&str> = rest.split('_').collect();
        if segments.len() != 2 {
            return Err(KeyError::new(
                id,
                format!("expected 2 segments after prefix, found {}", segments.len()),
            ));
        }

        Ok(Self {
            angle: parse_segment(id, segments[0], "angle")?,
            hook: parse_segment(id, segments[1], "hook")?,
        })
    }
}

/// Position of a script: the parent hook plus the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct ScriptKey {
    pub hook: HookKey,
    pub variant: ScriptVariant,
}

impl ScriptKey {
    pub fn angle(&self) -> u32 {
        self.hook.angle
    }

    pub fn version(&self) -> u32 {
        self.variant.version()
    }
}

impl fmt::Display for ScriptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}angle{}_hook{}_v{}",
            SCRIPT_PREFIX,
            self.hook.angle,
            self.hook.hook,
            self.variant.version()
        )
    }
}

impl FromStr for ScriptKey {
    type Err = KeyError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let rest = id
            .strip_prefix(SCRIPT_PREFIX)
            .ok_or_else(|| KeyError::new(id, "missing 'script_' prefix"))?;

        let segments: Vec<&str> = rest.split('_').collect();
        if segments.len() != 3 {
            return Err(KeyError::new(
                id,
                format!("expected 3 segments after prefix, found {}", segments.len()),
            ));
        }

        let angle = parse_segment(id, segments[0], "angle")?;
        let hook = parse_segment(id, segments[1], "hook")?;
        let version = parse_segment(id, segments[2], "v")?;
        let variant = ScriptVariant::from_version(version)
            .ok_or_else(|| KeyError::new(id, format!("unknown script version {}", version)))?;

        Ok(Self {
            hook: HookKey { angle, hook },
            variant,
        })
    }
}

/// Key of any request the backend submits to the batch provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestKey {
    Hook(HookKey),
    Script(ScriptKey),
}

impl RequestKey {
    /// Classify a wire identifier by its prefix.
    ///
    /// Returns `None` when the prefix is neither `hook_` nor `script_`.
    /// A recognised prefix with a malformed remainder is an error.
    pub fn classify(id: &str) -> Option<Result<Self, KeyError>> {
        if id.starts_with(HOOK_PREFIX) {
            Some(id.parse().map(RequestKey::Hook))
        } else if id.starts_with(SCRIPT_PREFIX) {
            Some(id.parse().map(RequestKey::Script))
        } else {
            None
        }
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKey::Hook(key) => key.fmt(f),
            RequestKey::Script(key) => key.fmt(f),
        }
    }
}

impl From<HookKey> for RequestKey {
    fn from(key: HookKey) -> Self {
        RequestKey::Hook(key)
    }
}

impl From<ScriptKey> for RequestKey {
    fn from(key: ScriptKey) -> Self {
        RequestKey::Script(key)
    }
}

/// Strip a constant prefix from one segment and parse the 1-based number.
///
/// Only the canonical decimal form is accepted, so every key has exactly one
/// wire identifier.
fn parse_segment(id: &str, segment: &str, prefix: &str) -> Result<u32, KeyError> {
    let digits = segment
        .strip_prefix(prefix)
        .ok_or_else(|| KeyError::new(id, format!("segment '{}' lacks '{}' prefix", segment, prefix)))?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(KeyError::new(id, format!("segment '{}' is not numeric", segment)));
    }
    if digits.starts_with('0') && digits.len() > 1 {
        return Err(KeyError::new(id, format!("segment '{}' has a leading zero", segment)));
    }

    let value: u32 = digits
        .parse()
        .map_err(|_| KeyError::new(id, format!("segment '{}' is not numeric", segment)))?;

    if value == 0 {
        return Err(KeyError::new(id, format!("segment '{}' must be 1-based", segment)));
    }

    Ok(value)
}
