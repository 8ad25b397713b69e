//! Restartable single-shot silence timer

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Callback invoked when the quiet interval elapses
pub type SilenceCallback = Arc<dyn Fn() + Send + Sync>;

/// Fires a callback after a quiet interval unless reset
///
/// At most one firing is pending at a time. Must be armed from within a
/// Tokio runtime.
pub struct SilenceTimer {
    duration: Duration,
    on_fire: Option<SilenceCallback>,
    pending: Option<JoinHandle<()>>,
    generation: Arc<AtomicU64>,
}

impl SilenceTimer {
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            on_fire: None,
            pending: None,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Arm with a new duration and callback, replacing any pending firing
    pub fn arm(&mut self, duration: Duration, on_fire: SilenceCallback) {
        self.duration = duration;
        self.on_fire = Some(on_fire);
        self.reset();
    }

    /// Cancel any pending firing and re-arm with the same duration
    ///
    /// Does nothing if the timer was never armed.
    pub fn reset(&mut self) {
        self.cancel();

        let Some(on_fire) = self.on_fire.clone() else {
            return;
        };

        let generation = Arc::clone(&self.generation);
        let armed_at = generation.load(Ordering::SeqCst);
        let duration = self.duration;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            // A reset between wake-up and here supersedes this firing
            if generation.load(Ordering::SeqCst) == armed_at {
                tracing::trace!(ms = duration.as_millis(), "silence window elapsed");
                on_fire();
            }
        }));
    }

    /// Cancel any pending firing
    pub fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether a firing is still scheduled
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Configured quiet interval
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }
}

impl Drop for SilenceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, SilenceCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let cb_count = Arc::clone(&count);
        let cb: SilenceCallback = Arc::new(move || {
            cb_count.fetch_add(1, Ordering::SeqCst);
        });
        (count, cb)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_quiet_interval() {
        let (count, cb) = counter();
        let mut timer = SilenceTimer::new(Duration::from_millis(2000));
        timer.arm(Duration::from_millis(2000), cb);
        assert!(timer.is_pending());

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_postpones_firing() {
        let (count, cb) = counter();
        let mut timer = SilenceTimer::new(Duration::from_millis(2000));
        timer.arm(Duration::from_millis(2000), cb);

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            timer.reset();
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let (count, cb) = counter();
        let mut timer = SilenceTimer::new(Duration::from_millis(500));
        timer.arm(Duration::from_millis(500), cb);
        timer.cancel();
        assert!(!timer.is_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_before_arm_is_noop() {
        let mut timer = SilenceTimer::new(Duration::from_millis(500));
        timer.reset();
        assert!(!timer.is_pending());
    }
}
