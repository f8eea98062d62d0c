//! Success/failure cues for player-facing front ends.

use std::io::Write;

/// Side-channel cue fired by a front end when a session step succeeds or fails.
pub trait Notifier: Send + Sync {
    fn success(&self);
    fn failure(&self);
}

/// Does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn success(&self) {}
    fn failure(&self) {}
}

/// Rings the terminal bell: once on success, twice on failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct BellNotifier;

impl BellNotifier {
    fn ring(times: usize) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all("\x07".repeat(times).as_bytes());
        let _ = out.flush();
    }
}

impl Notifier for BellNotifier {
    fn success(&self) {
        Self::ring(1);
    }

    fn failure(&self) {
        Self::ring(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        ok: AtomicUsize,
        failed: AtomicUsize,
    }

    impl Notifier for Counting {
        fn success(&self) {
            self.ok.fetch_add(1, Ordering::SeqCst);
        }
        fn failure(&self) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn notifiers_are_usable_as_trait_objects() {
        let counting = Counting::default();
        let notifiers: [&dyn Notifier; 2] = [&SilentNotifier, &counting];
        for n in notifiers {
            n.success();
            n.failure();
        }
        assert_eq!(counting.ok.load(Ordering::SeqCst), 1);
        assert_eq!(counting.failed.load(Ordering::SeqCst), 1);
    }
}
