use crate::domain_model::*;
use std::time::Duration;

/// Whether the attempt guard is active at all. Development setups usually
/// run with it disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingPolicy {
    Enabled,
    Disabled,
}

impl std::str::FromStr for BlockingPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enabled" => Ok(BlockingPolicy::Enabled),
            "disabled" => Ok(BlockingPolicy::Disabled),
            other => Err(anyhow::anyhow!("Unknown blocking policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GuardOptions {
    pub policy: BlockingPolicy,
    /// Re-fetch the block status once the countdown reaches zero.
    pub recheck_on_expiry: bool,
    pub tick: Duration,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            policy: BlockingPolicy::Enabled,
            recheck_on_expiry: true,
            tick: Duration::from_secs(1),
        }
    }
}

/// Everything a sign-in form needs to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardView {
    pub email: Option<Email>,
    pub state: GuardState,
    pub status: Option<BlockStatus>,
    pub countdown_secs: Option<u32>,
    pub warning: Option<String>,
    pub allowed: bool,
}

impl GuardView {
    pub fn countdown_text(&self) -> Option<String> {
        self.countdown_secs.map(format_time)
    }
}
