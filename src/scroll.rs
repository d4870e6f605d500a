//! Near-bottom detection for infinite scrolling.

use tracing::trace;

/// Distance from the bottom, in pixels, at which more content is requested.
pub const DEFAULT_SCROLL_THRESHOLD: f64 = 100.0;

/// Scroll position of the list viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    /// Scrolled distance from the top.
    pub offset: f64,
    /// Visible height.
    pub viewport: f64,
    /// Total height of the list content.
    pub content_height: f64,
}

impl ScrollMetrics {
    /// Distance between the bottom of the viewport and the end of the content.
    #[must_use]
    pub fn distance_to_bottom(&self) -> f64 {
        self.content_height - (self.offset + self.viewport)
    }
}

/// Fires once each time the viewport comes within the threshold of the end.
///
/// After firing it stays quiet until the content grows past the height it
/// fired at, so a burst of scroll events near the bottom requests one page.
#[derive(Debug, Clone)]
pub struct ScrollTrigger {
    threshold: f64,
    last: Option<ScrollMetrics>,
    fired_at_height: Option<f64>,
}

impl Default for ScrollTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLL_THRESHOLD)
    }
}

impl ScrollTrigger {
    /// Creates a trigger with the given threshold in pixels.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last: None,
            fired_at_height: None,
        }
    }

    /// Configured threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether the trigger may fire on the next qualifying event.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.fired_at_height.is_none()
    }

    /// Feeds a scroll event; returns `true` when more content should load.
    pub fn observe(&mut self, metrics: ScrollMetrics) -> bool {
        if self
            .fired_at_height
            .is_some_and(|height| metrics.content_height > height)
        {
            trace!(height = metrics.content_height, "content grew, scroll trigger re-armed");
            self.fired_at_height = None;
        }

        let near_bottom = metrics.distance_to_bottom() < self.threshold;
        let moving_down = match self.last {
            None => true,
            Some(last) => {
                last.distance_to_bottom() >= self.threshold || metrics.offset > last.offset
            }
        };
        self.last = Some(metrics);

        if near_bottom && moving_down && self.is_armed() {
            trace!(
                offset = metrics.offset,
                content_height = metrics.content_height,
                "scroll trigger fired"
            );
            self.fired_at_height = Some(metrics.content_height);
            return true;
        }
        false
    }

    /// Re-arms the trigger but keeps the last position.
    ///
    /// Used when the requested content never arrived. The next fire still
    /// needs a move down or a fresh entry into the zone.
    pub fn rearm(&mut self) {
        if self.fired_at_height.take().is_some() {
            trace!("scroll trigger re-armed without growth");
        }
    }

    /// Re-arms the trigger and forgets the last position.
    pub fn reset(&mut self) {
        self.last = None;
        self.fired_at_height = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(offset: f64, content_height: f64) -> ScrollMetrics {
        ScrollMetrics {
            offset,
            viewport: 600.0,
            content_height,
        }
    }

    #[test]
    fn test_fires_when_entering_zone() {
        let mut trigger = ScrollTrigger::default();
        assert!(!trigger.observe(at(0.0, 2000.0)));
        assert!(!trigger.observe(at(1000.0, 2000.0)));
        assert!(trigger.observe(at(1350.0, 2000.0)));
    }

    #[test]
    fn test_fires_once_per_crossing() {
        let mut trigger = ScrollTrigger::default();
        assert!(trigger.observe(at(1350.0, 2000.0)));
        assert!(!trigger.observe(at(1380.0, 2000.0)));
        assert!(!trigger.observe(at(1400.0, 2000.0)));
        assert!(!trigger.is_armed());
    }

    #[test]
    fn test_rearms_after_content_grows() {
        let mut trigger = ScrollTrigger::default();
        assert!(trigger.observe(at(1350.0, 2000.0)));
        // New page appended; still far from the new bottom.
        assert!(!trigger.observe(at(1360.0, 4000.0)));
        assert!(trigger.is_armed());
        assert!(trigger.observe(at(3350.0, 4000.0)));
    }

    #[test]
    fn test_scrolling_up_inside_zone_does_not_fire() {
        let mut trigger = ScrollTrigger::default();
        assert!(trigger.observe(at(1390.0, 2000.0)));
        // Re-armed by growth, but the user moved up while inside the zone.
        assert!(!trigger.observe(at(1380.0, 2050.0)));
        assert!(trigger.is_armed());
        assert!(trigger.observe(at(1385.0, 2050.0)));
    }

    #[test]
    fn test_short_content_fires_on_first_observation() {
        let mut trigger = ScrollTrigger::default();
        assert!(trigger.observe(at(0.0, 500.0)));
    }

    #[test]
    fn test_rearm_needs_fresh_movement() {
        let mut trigger = ScrollTrigger::default();
        assert!(trigger.observe(at(1350.0, 2000.0)));
        trigger.rearm();
        assert!(trigger.is_armed());
        assert!(!trigger.observe(at(1350.0, 2000.0)), "same position does not refire");
        assert!(!trigger.observe(at(800.0, 2000.0)));
        assert!(trigger.observe(at(1390.0, 2000.0)));
    }

    #[test]
    fn test_reset_rearms() {
        let mut trigger = ScrollTrigger::default();
        assert!(trigger.observe(at(1350.0, 2000.0)));
        trigger.reset();
        assert!(trigger.observe(at(1350.0, 2000.0)));
    }
}
