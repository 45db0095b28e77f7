//! Configuration for the membership trace resolver.

use std::time::Duration;

/// Depth used when the caller does not request one.
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// Hard ceiling on trace depth. Requests above it are clamped.
pub const ABSOLUTE_MAX_DEPTH: u32 = 20;

/// Configuration for the membership trace resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Depth used when a trace does not request one. Still clamped to
    /// [`ABSOLUTE_MAX_DEPTH`].
    pub default_max_depth: u32,
    /// Timeout for a whole trace, including every concurrent branch.
    pub timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_max_depth: DEFAULT_MAX_DEPTH,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ResolverConfig {
    /// Creates a new configuration with the specified default depth.
    pub fn with_default_max_depth(mut self, max_depth: u32) -> Self {
        self.default_max_depth = max_depth;
        self
    }

    /// Creates a new configuration with the specified timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolves the depth bound for one trace.
    ///
    /// A missing or zero request falls back to the configured default; the
    /// result never exceeds [`ABSOLUTE_MAX_DEPTH`].
    pub fn effective_max_depth(&self, requested: Option<u32>) -> u32 {
        let requested = match requested {
            Some(depth) if depth > 0 => depth,
            _ => self.default_max_depth.max(1),
        };
        requested.min(ABSOLUTE_MAX_DEPTH)
    }

    /// The trace timeout in milliseconds, saturating at `u64::MAX`.
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}
