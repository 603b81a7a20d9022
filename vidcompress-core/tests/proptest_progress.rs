//! Property-based tests for progress values and the reporter contract.

use proptest::prelude::*;
use vidcompress_core::{
    CompressionProgress, Outcome, ProgressEvent, ProgressRecorder, ProgressReporter,
};

proptest! {
    /// Percentage is zero whenever the total is zero.
    #[test]
    fn percentage_zero_total(processed in any::<i64>()) {
        prop_assert_eq!(CompressionProgress::new(processed, 0).percentage(), 0);
    }

    /// Percentage stays within 0..=100 for processed values inside the total.
    #[test]
    fn percentage_bounded(total in 1i64..=i64::MAX / 2, fraction in 0.0f64..=1.0) {
        let processed = (total as f64 * fraction) as i64;
        let percentage = CompressionProgress::new(processed.min(total), total).percentage();
        prop_assert!((0..=100).contains(&percentage));
    }

    /// Reported values never decrease and the stream ends with {total, total}.
    #[test]
    fn reporter_monotonic(
        total in 0i64..10_000_000,
        updates in prop::collection::vec(-1_000i64..20_000_000, 0..64),
    ) {
        let recorder = ProgressRecorder::new();
        let mut reporter = ProgressReporter::new(Box::new(recorder.clone()), total);
        for update in &updates {
            reporter.report(*update);
        }
        reporter.complete(Outcome::Completed);

        let progress = recorder.progress();
        for pair in progress.windows(2) {
            prop_assert!(pair[0].processed_duration_us <= pair[1].processed_duration_us);
        }
        let last = progress.last().copied().unwrap();
        prop_assert_eq!(last, CompressionProgress::new(total, total));
        if total > 0 {
            prop_assert_eq!(last.percentage(), 100);
        }
        prop_assert_eq!(recorder.terminal_count(), 1);
        prop_assert_eq!(
            recorder.events().last().cloned(),
            Some(ProgressEvent::Completed(Outcome::Completed))
        );
    }
}
