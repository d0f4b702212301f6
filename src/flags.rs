//! Feature flags resolved once per session.
//!
//! Flags are a capability handed to the components that need them rather
//! than global state. A session either gets an explicit on/off value or is
//! bucketed into a percentage rollout from a stable hash of its identifier.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Flags the core knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureFlag {
    /// Hierarchical Gantt layout of implementation tasks.
    Gantt,
}

impl FeatureFlag {
    pub fn key(self) -> &'static str {
        match self {
            FeatureFlag::Gantt => "gantt",
        }
    }
}

/// Answers whether a flag is on for the current session.
pub trait FeatureFlagProvider {
    fn is_enabled(&self, flag: FeatureFlag) -> bool;
}

/// Explicit flag values.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticFlags {
    pub gantt: bool,
}

impl StaticFlags {
    pub fn all_on() -> Self {
        StaticFlags { gantt: true }
    }
}

impl FeatureFlagProvider for StaticFlags {
    fn is_enabled(&self, flag: FeatureFlag) -> bool {
        match flag {
            FeatureFlag::Gantt => self.gantt,
        }
    }
}

/// How a flag is configured: forced on, forced off, or rolled out to a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagSetting {
    Switch(Switch),
    Rollout(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Switch {
    On,
    Off,
}

impl Default for FlagSetting {
    fn default() -> Self {
        FlagSetting::Switch(Switch::On)
    }
}

/// Stable bucket in `0..100` for a session and flag.
pub fn bucket(session: &str, flag: FeatureFlag) -> u8 {
    let mut hasher = Sha256::new();
    hasher.update(flag.key().as_bytes());
    hasher.update(b":");
    hasher.update(session.as_bytes());
    let digest = hasher.finalize();
    let n = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    (n % 100) as u8
}

/// Flags resolved for one session at construction time.
#[derive(Debug, Clone, Copy)]
pub struct SessionFlags {
    gantt: bool,
}

impl SessionFlags {
    pub fn resolve(session: &str, gantt: FlagSetting) -> Self {
        let enabled = match gantt {
            FlagSetting::Switch(Switch::On) => true,
            FlagSetting::Switch(Switch::Off) => false,
            FlagSetting::Rollout(pct) => bucket(session, FeatureFlag::Gantt) < pct.min(100),
        };
        debug!(session, flag = FeatureFlag::Gantt.key(), enabled, "resolved feature flag");
        SessionFlags { gantt: enabled }
    }
}

impl FeatureFlagProvider for SessionFlags {
    fn is_enabled(&self, flag: FeatureFlag) -> bool {
        match flag {
            FeatureFlag::Gantt => self.gantt,
        }
    }
}
