use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

const MAX_FAILURES: u32 = 5;
const WINDOW: Duration = Duration::from_secs(15 * 60);

/// Per-user limiter on wrong reset tokens.
pub struct ResetAttemptLimiter {
    /// user_id -> (failed_count, window_start)
    entries: DashMap<Uuid, (u32, Instant)>,
}

impl Default for ResetAttemptLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResetAttemptLimiter {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Check if another token comparison is allowed. 5 failures per 15 minutes.
    /// Does NOT increment the counter — call `record_failure()` on a mismatch.
    pub fn check(&self, user_id: Uuid) -> Result<(), u64> {
        let now = Instant::now();

        let Some(entry) = self.entries.get(&user_id) else {
            return Ok(());
        };

        let (count, start) = entry.value();

        if now.duration_since(*start) > WINDOW {
            return Ok(());
        }

        if *count >= MAX_FAILURES {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(WINDOW.as_secs().saturating_sub(elapsed));
        }

        Ok(())
    }

    pub fn record_failure(&self, user_id: Uuid) {
        let now = Instant::now();

        let mut entry = self.entries.entry(user_id).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > WINDOW {
            *count = 1;
            *start = now;
        } else {
            *count += 1;
        }
    }

    /// Forget a user once their reset went through.
    pub fn clear(&self, user_id: Uuid) {
        self.entries.remove(&user_id);
    }

    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.entries.retain(|_, (_, start)| now.duration_since(*start) < max_age);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_five_failures() {
        let limiter = ResetAttemptLimiter::new();
        let user = Uuid::now_v7();

        for _ in 0..MAX_FAILURES {
            assert!(limiter.check(user).is_ok());
            limiter.record_failure(user);
        }

        let retry_after = limiter.check(user).unwrap_err();
        assert!(retry_after <= WINDOW.as_secs());
        assert!(limiter.check(Uuid::now_v7()).is_ok());
    }

    #[test]
    fn clear_resets_the_count() {
        let limiter = ResetAttemptLimiter::new();
        let user = Uuid::now_v7();
        for _ in 0..MAX_FAILURES {
            limiter.record_failure(user);
        }
        limiter.clear(user);
        assert!(limiter.check(user).is_ok());
    }

    #[test]
    fn cleanup_drops_old_entries() {
        let limiter = ResetAttemptLimiter::new();
        limiter.record_failure(Uuid::now_v7());
        limiter.cleanup(Duration::ZERO);
        assert!(limiter.entries.is_empty());
    }
}
