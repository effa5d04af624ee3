//! Outbound reply pacing.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Enforces a minimum gap between consecutive sends so a multi-part reply
/// arrives with a readable rhythm instead of as one burst.
///
/// The pacer carries the timestamp of the previous send, so the gap also
/// applies across reply batches: a turn finishing right after the previous
/// one still waits out the remainder.
#[derive(Debug)]
pub struct ReplyPacer {
    gap: Duration,
    last_send: Mutex<Option<Instant>>,
}

impl ReplyPacer {
    pub fn new(gap: Duration) -> Self {
        Self {
            gap,
            last_send: Mutex::new(None),
        }
    }

    /// Wait until the gap since the previous send has elapsed, then claim
    /// the send slot. The first call returns immediately.
    pub async fn pace(&self) {
        let mut last = self.last_send.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.gap {
                sleep(self.gap - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_send_is_immediate() {
        let pacer = ReplyPacer::new(Duration::from_millis(200));
        let start = Instant::now();
        pacer.pace().await;
        assert!(start.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_consecutive_sends_are_spaced() {
        let pacer = ReplyPacer::new(Duration::from_millis(40));
        let start = Instant::now();
        pacer.pace().await;
        pacer.pace().await;
        pacer.pace().await;
        // Two full gaps after the immediate first send.
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_zero_gap_never_waits() {
        let pacer = ReplyPacer::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            pacer.pace().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
