//! Half-open trim windows.

/// Range of presentation times `[start_us, end_us)` to keep.
///
/// `end_us == None` means the window runs to the end of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeWindow {
    /// First timestamp to keep. Values `<= 0` keep everything from the start.
    pub start_us: i64,
    /// First timestamp to drop.
    pub end_us: Option<i64>,
}

impl TimeWindow {
    /// Create a window.
    pub fn new(start_us: i64, end_us: Option<i64>) -> Self {
        Self { start_us, end_us }
    }

    /// The whole source.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Clamp both ends to `[0, duration_us]`. A non-positive duration
    /// means unknown and leaves the window unchanged.
    #[must_use]
    pub fn clamped(self, duration_us: i64) -> Self {
        if duration_us <= 0 {
            return self;
        }
        Self {
            start_us: self.start_us.clamp(0, duration_us),
            end_us: self.end_us.map(|end| end.clamp(0, duration_us)),
        }
    }

    /// Position to seek to before reading.
    pub fn seek_target(&self) -> i64 {
        self.start_us.max(0)
    }

    /// Whether a sample at `timestamp_us` precedes the window.
    pub fn is_before_start(&self, timestamp_us: i64) -> bool {
        self.start_us > 0 && timestamp_us < self.start_us
    }

    /// Whether a sample at `timestamp_us` is at or past the end.
    pub fn has_ended(&self, timestamp_us: i64) -> bool {
        self.end_us.is_some_and(|end| timestamp_us >= end)
    }

    /// Whether the window selects nothing.
    pub fn is_empty(&self) -> bool {
        self.end_us.is_some_and(|end| self.start_us >= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_open() {
        let window = TimeWindow::new(100, Some(200));
        assert!(window.is_before_start(99));
        assert!(!window.is_before_start(100));
        assert!(!window.has_ended(199));
        assert!(window.has_ended(200));
    }

    #[test]
    fn test_unbounded() {
        let window = TimeWindow::unbounded();
        assert!(!window.has_ended(i64::MAX));
        assert!(!window.is_before_start(0));
        assert!(!window.is_empty());
        assert_eq!(window.seek_target(), 0);
    }

    #[test]
    fn test_clamped() {
        let window = TimeWindow::new(-50, Some(5_000)).clamped(1_000);
        assert_eq!(window, TimeWindow::new(0, Some(1_000)));

        let past = TimeWindow::new(2_000, None).clamped(1_000);
        assert_eq!(past.start_us, 1_000);
        assert_eq!(past.end_us, None);

        let unknown = TimeWindow::new(2_000, Some(3_000)).clamped(0);
        assert_eq!(unknown, TimeWindow::new(2_000, Some(3_000)));
    }

    #[test]
    fn test_empty() {
        assert!(TimeWindow::new(500, Some(500)).is_empty());
        assert!(TimeWindow::new(600, Some(500)).is_empty());
        assert!(!TimeWindow::new(400, Some(500)).is_empty());
        assert!(TimeWindow::new(1_000, Some(4_000)).clamped(800).is_empty());
    }
}
