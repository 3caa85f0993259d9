//! Host platform detection.
//!
//! The hosting container advertises itself through a user-agent style string.
//! Desktop hosts have no "container ready" signal, so the bootstrap treats
//! them as ready immediately.

use std::fmt;

/// The platform hosting the application shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Android,
    Ios,
    Desktop,
}

impl Platform {
    /// Detect the platform from a host user-agent string.
    ///
    /// Unknown hosts default to [`Platform::Desktop`].
    pub fn detect(user_agent: &str) -> Self {
        if user_agent.contains("Android") {
            Platform::Android
        } else if user_agent.contains("iPad") || user_agent.contains("iPhone") {
            Platform::Ios
        } else {
            Platform::Desktop
        }
    }

    /// Whether the platform lacks a host-readiness signal and must be
    /// treated as ready from the start.
    pub fn assumes_ready(&self) -> bool {
        matches!(self, Platform::Desktop)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Android => "Android",
            Platform::Ios => "iOS",
            Platform::Desktop => "Desktop",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
