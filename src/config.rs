//! Engine-wide tunables (spec §6).

use std::time::Duration;

use crate::tcp::tcb::DEFAULT_MSS;

/// Default per-connection buffer bound, in segments of `DEFAULT_MSS`
/// bytes each, absent a call to `set_buffer_limit`.
pub const DEFAULT_BUFFER_LIMIT_SEGMENTS: usize = 10;

/// Default Maximum Segment Lifetime; TIME-WAIT lasts `2 * msl`.
pub const DEFAULT_MSL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    buffer_limit_segments: usize,
    msl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            buffer_limit_segments: DEFAULT_BUFFER_LIMIT_SEGMENTS,
            msl: DEFAULT_MSL,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds each connection's send and receive buffers to `n`
    /// MSS-sized segments.
    pub fn set_buffer_limit(&mut self, n: usize) -> &mut Self {
        self.buffer_limit_segments = n;
        self
    }

    /// Sets the Maximum Segment Lifetime; TIME-WAIT runs for `2 * msl`.
    pub fn set_msl(&mut self, msl: Duration) -> &mut Self {
        self.msl = msl;
        self
    }

    pub fn buffer_limit_segments(&self) -> usize {
        self.buffer_limit_segments
    }

    /// The bound applied to `SendBuffer`/`ReceiveBuffer` capacity, in bytes.
    pub fn buffer_capacity_bytes(&self) -> usize {
        self.buffer_limit_segments * DEFAULT_MSS as usize
    }

    pub fn msl(&self) -> Duration {
        self.msl
    }

    pub fn time_wait_duration(&self) -> Duration {
        self.msl * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::new();
        assert_eq!(cfg.buffer_limit_segments(), 10);
        assert_eq!(cfg.msl(), Duration::from_secs(30));
        assert_eq!(cfg.time_wait_duration(), Duration::from_secs(60));
    }

    #[test]
    fn setters_are_chainable_and_take_effect() {
        let mut cfg = Config::new();
        cfg.set_buffer_limit(4).set_msl(Duration::from_secs(5));
        assert_eq!(cfg.buffer_limit_segments(), 4);
        assert_eq!(cfg.buffer_capacity_bytes(), 4 * 536);
        assert_eq!(cfg.time_wait_duration(), Duration::from_secs(10));
    }
}
