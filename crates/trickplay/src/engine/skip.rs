//! Relative seeks ("skip N seconds") and the debounce that merges them.

use std::time::Duration;

use super::schedule::Timeout;

/// Clamp a raw skip target into `[0, duration - end_guard]`.
///
/// Unknown duration (live content) only clamps at zero.
pub fn clamp_target(raw_ms: i64, duration_ms: Option<u64>, end_guard_ms: u64) -> u64 {
    let floor = raw_ms.max(0) as u64;
    match duration_ms {
        Some(end) => floor.min(end.saturating_sub(end_guard_ms)),
        None => floor,
    }
}

pub fn offset_ms(seconds: i32) -> i64 {
    i64::from(seconds) * 1000
}

#[derive(Debug, Clone)]
struct PendingSkip {
    base_ms: u64,
    offset_ms: i64,
    timeout: Timeout,
}

/// Accumulates skips pressed in quick succession into a single seek.
///
/// Every push re-arms the window; when it finally closes, `advance` hands
/// back the merged raw target once.
#[derive(Debug, Clone)]
pub struct SkipEngine {
    window: Duration,
    pending: Option<PendingSkip>,
}

impl SkipEngine {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Add `seconds` to the pending skip. `base_ms` is only used when no
    /// skip is pending yet.
    pub fn push(&mut self, seconds: i32, base_ms: u64) {
        match &mut self.pending {
            Some(p) => {
                p.offset_ms += offset_ms(seconds);
                p.timeout.restart(self.window);
            }
            None => {
                self.pending = Some(PendingSkip {
                    base_ms,
                    offset_ms: offset_ms(seconds),
                    timeout: Timeout::new(self.window),
                });
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_offset_ms(&self) -> i64 {
        self.pending.as_ref().map_or(0, |p| p.offset_ms)
    }

    /// Unclamped target the pending skip would commit to.
    pub fn preview(&self) -> Option<i64> {
        self.pending
            .as_ref()
            .map(|p| p.base_ms as i64 + p.offset_ms)
    }

    /// Returns the merged raw target when the window closes.
    pub fn advance(&mut self, dt: Duration) -> Option<i64> {
        let expired = self.pending.as_mut()?.timeout.advance(dt);
        if !expired {
            return None;
        }
        let target = self.preview();
        self.pending = None;
        target
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_target_in_content() {
        assert_eq!(clamp_target(-5_000, Some(60_000), 0), 0);
        assert_eq!(clamp_target(90_000, Some(60_000), 0), 60_000);
        assert_eq!(clamp_target(90_000, Some(60_000), 2_000), 58_000);
        assert_eq!(clamp_target(30_000, Some(60_000), 2_000), 30_000);
        assert_eq!(clamp_target(90_000, None, 2_000), 90_000);
    }

    #[test]
    fn rapid_skips_merge_into_one_target() {
        let mut skip = SkipEngine::new(Duration::from_millis(1000));
        skip.push(30, 100_000);
        assert_eq!(skip.advance(Duration::from_millis(500)), None);
        skip.push(30, 999_999);
        assert_eq!(skip.advance(Duration::from_millis(900)), None);
        skip.push(-10, 0);
        assert_eq!(skip.pending_offset_ms(), 50_000);
        assert_eq!(skip.advance(Duration::from_millis(1000)), Some(150_000));
        assert!(!skip.is_pending());
        assert_eq!(skip.advance(Duration::from_millis(1000)), None);
    }

    #[test]
    fn cancel_drops_pending_skip() {
        let mut skip = SkipEngine::new(Duration::from_millis(1000));
        skip.push(30, 0);
        skip.cancel();
        assert_eq!(skip.advance(Duration::from_secs(5)), None);
    }
}
