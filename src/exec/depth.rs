//! Recursion guard for agent-calls-agent chains.
//!
//! The current depth travels between processes in the `BRIDGE_DEPTH`
//! environment variable. Inside one process it is an explicit value: read once
//! from the environment, checked, and the incremented value is handed to the
//! child.

use crate::error::BridgeError;

/// Environment variable carrying the nesting depth to child agents.
pub const DEPTH_ENV: &str = "BRIDGE_DEPTH";

/// Ceiling on nested bridge hops.
pub const MAX_DEPTH: u32 = 2;

/// Nesting depth of the current call chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Depth(u32);

impl Depth {
    pub const ROOT: Depth = Depth(0);

    pub fn new(depth: u32) -> Self {
        Self(depth)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Depth inherited from the parent process environment.
    pub fn ambient() -> Self {
        Self::parse(std::env::var(DEPTH_ENV).ok().as_deref())
    }

    /// Parse a depth value; absent or unparseable values mean depth 0.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse::<u32>().ok())
            .map(Self)
            .unwrap_or(Self::ROOT)
    }

    /// Check the depth against `max` and return the depth a child runs at.
    pub fn enter(self, max: u32) -> Result<Depth, BridgeError> {
        if self.0 >= max {
            return Err(BridgeError::RecursionLimit { depth: self.0, max });
        }
        Ok(Depth(self.0 + 1))
    }

    /// Value injected into the child's environment.
    pub fn to_env_value(self) -> String {
        self.0.to_string()
    }
}
