use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

/// Point-in-time snapshot of a seeding run's progress. Informational only;
/// callers must never gate correctness on a percentage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedProgress {
    pub percent: u8,
    pub message: String,
}

/// Shared progress state for one in-flight run.
///
/// `fetch_max` keeps the percentage monotonically non-decreasing even if
/// reports arrive out of order.
#[derive(Debug, Default)]
pub struct ProgressHandle {
    percent: AtomicU8,
    message: Mutex<String>,
}

impl ProgressHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, percent: u8, message: impl Into<String>) {
        self.percent.fetch_max(percent.min(100), Ordering::SeqCst);
        let mut current = self.message.lock().expect("progress message lock poisoned");
        *current = message.into();
    }

    pub fn snapshot(&self) -> SeedProgress {
        SeedProgress {
            percent: self.percent.load(Ordering::SeqCst),
            message: self
                .message
                .lock()
                .expect("progress message lock poisoned")
                .clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_never_decreases() {
        let handle = ProgressHandle::new();
        handle.report(40, "fetching");
        handle.report(10, "late report");
        let snap = handle.snapshot();
        assert_eq!(snap.percent, 40);
        assert_eq!(snap.message, "late report");
    }

    #[test]
    fn percent_is_capped_at_one_hundred() {
        let handle = ProgressHandle::new();
        handle.report(250, "done");
        assert_eq!(handle.snapshot().percent, 100);
    }
}
