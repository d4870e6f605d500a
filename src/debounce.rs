//! Input debouncing for free-text filter fields.
//!
//! A [`Debouncer`] holds back a rapidly-changing value until it has been
//! stable for a configured interval. The session keeps one per text field so
//! typing in the author box never resets the title's pending deadline.
//!
//! Time comes from [`tokio::time::Instant`], so tests can pause and advance
//! the clock instead of sleeping.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use gutenscroll_core::debounce::Debouncer;
//!
//! # async fn example() {
//! let mut title = Debouncer::new(String::new(), Duration::from_millis(500));
//! title.observe("Di".to_string());
//! title.observe("Dickens".to_string());
//! assert_eq!(title.settled().await.as_deref(), Some("Dickens"));
//! # }
//! ```

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// Default quiet period before a typed value is applied.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

/// Delays propagation of a value until it stops changing.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    interval: Duration,
    stable: T,
    pending: Option<Pending<T>>,
}

impl<T: Clone + PartialEq> Debouncer<T> {
    /// Creates a debouncer whose first value, `initial`, is stable at once.
    #[must_use]
    pub fn new(initial: T, interval: Duration) -> Self {
        Self {
            interval,
            stable: initial,
            pending: None,
        }
    }

    /// Configured quiet period.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Feeds a new raw value and returns the latest stable one.
    ///
    /// Each value cancels any pending deadline and starts a fresh one; a value
    /// equal to the stable one simply cancels what was pending.
    pub fn observe(&mut self, value: T) -> &T {
        if value == self.stable {
            if self.pending.take().is_some() {
                trace!("debounce cancelled, value returned to stable");
            }
        } else {
            let deadline = Instant::now() + self.interval;
            self.pending = Some(Pending { value, deadline });
        }
        &self.stable
    }

    /// Replaces both the stable and the raw value without waiting.
    ///
    /// Used when the value arrives from somewhere other than typing, such as
    /// the address bar or a "clear filters" action.
    pub fn reset(&mut self, value: T) {
        self.pending = None;
        self.stable = value;
    }

    /// Latest stable value.
    #[must_use]
    pub fn stable(&self) -> &T {
        &self.stable
    }

    /// Most recent raw value, pending or not.
    #[must_use]
    pub fn latest(&self) -> &T {
        self.pending
            .as_ref()
            .map_or(&self.stable, |pending| &pending.value)
    }

    /// When the pending value becomes stable, if one is pending.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    /// Returns whether a value is waiting for its deadline.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Promotes the pending value once its deadline has passed.
    ///
    /// Returns the newly stable value, or `None` if nothing was due.
    pub fn poll(&mut self) -> Option<T> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|pending| Instant::now() >= pending.deadline);
        if !due {
            return None;
        }
        let pending = self.pending.take()?;
        self.stable = pending.value.clone();
        Some(pending.value)
    }

    /// Waits for the pending deadline, then promotes the value.
    ///
    /// Returns immediately with `None` when nothing is pending.
    pub async fn settled(&mut self) -> Option<T> {
        let deadline = self.deadline()?;
        tokio::time::sleep_until(deadline).await;
        self.poll()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_value_is_stable_immediately() {
        tokio::time::pause();
        let mut debouncer = Debouncer::new(1, Duration::from_millis(500));
        assert_eq!(debouncer.stable(), &1);
        assert_eq!(debouncer.observe(1), &1);
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(), None);
    }

    #[tokio::test]
    async fn test_reset_skips_the_wait() {
        tokio::time::pause();
        let mut debouncer = Debouncer::new(0, Duration::from_millis(500));
        debouncer.observe(3);
        debouncer.reset(9);
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.stable(), &9);
        assert_eq!(debouncer.latest(), &9);
    }

    #[tokio::test]
    async fn test_value_emitted_after_quiet_interval() {
        tokio::time::pause();
        let mut debouncer = Debouncer::new(String::new(), Duration::from_millis(500));

        assert_eq!(debouncer.observe("dick".to_string()), "");
        tokio::time::advance(Duration::from_millis(499)).await;
        assert_eq!(debouncer.poll(), None);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(debouncer.poll().as_deref(), Some("dick"));
        assert_eq!(debouncer.stable(), "dick");
        assert_eq!(debouncer.poll(), None, "emitted only once");
    }

    #[tokio::test]
    async fn test_new_input_restarts_timer() {
        tokio::time::pause();
        let mut debouncer = Debouncer::new(0, Duration::from_millis(500));

        debouncer.observe(1);
        tokio::time::advance(Duration::from_millis(400)).await;
        debouncer.observe(2);
        tokio::time::advance(Duration::from_millis(400)).await;
        assert_eq!(debouncer.poll(), None, "second input restarted the timer");
        assert_eq!(debouncer.latest(), &2);

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(debouncer.poll(), Some(2));
    }

    #[tokio::test]
    async fn test_returning_to_stable_value_cancels_pending() {
        tokio::time::pause();
        let mut debouncer = Debouncer::new("a", Duration::from_millis(100));
        debouncer.observe("ab");
        debouncer.observe("a");
        assert!(!debouncer.is_pending());
        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(debouncer.poll(), None);
    }

    #[tokio::test]
    async fn test_settled_waits_for_deadline() {
        tokio::time::pause();
        let mut debouncer = Debouncer::new(0, Duration::from_secs(1));
        let start = Instant::now();
        debouncer.observe(7);
        assert_eq!(debouncer.settled().await, Some(7));
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(debouncer.settled().await, None);
    }

    #[test]
    fn test_settled_without_pending_input_returns_at_once() {
        let mut debouncer = Debouncer::new("idle", DEFAULT_DEBOUNCE);
        assert_eq!(tokio_test::block_on(debouncer.settled()), None);
    }

    #[tokio::test]
    async fn test_independent_instances_do_not_share_timers() {
        tokio::time::pause();
        let mut title = Debouncer::new(String::new(), Duration::from_millis(500));
        let mut author = Debouncer::new(String::new(), Duration::from_millis(500));

        title.observe("Emma".to_string());
        tokio::time::advance(Duration::from_millis(300)).await;
        author.observe("Austen".to_string());
        tokio::time::advance(Duration::from_millis(200)).await;

        assert_eq!(title.poll().as_deref(), Some("Emma"));
        assert_eq!(author.poll(), None);
        tokio::time::advance(Duration::from_millis(300)).await;
        assert_eq!(author.poll().as_deref(), Some("Austen"));
    }
}
