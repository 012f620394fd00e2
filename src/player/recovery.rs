use std::sync::{Arc, Weak};

use tracing::{info, warn};

use crate::error::ExtractorError;

/// Whether the player may hold an extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryState {
    /// Normal operation
    #[default]
    Active,
    /// An extractor reported an error; nothing is created until a retry
    Suspended,
}

/// Two-state error machine driving extractor recreation
///
/// There is no backoff and no retry limit: leaving `Suspended` is entirely up to the
/// caller invoking its [`RetryHandle`].
#[derive(Debug, Default)]
pub struct ErrorRecovery {
    state: RecoveryState,
    last_error: Option<ExtractorError>,
    failures: u32,
    retries: u32,
    retry_epoch: u64,
}

impl ErrorRecovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    pub fn is_suspended(&self) -> bool {
        self.state == RecoveryState::Suspended
    }

    /// Error that caused the most recent suspension
    pub fn last_error(&self) -> Option<&ExtractorError> {
        self.last_error.as_ref()
    }

    pub fn failure_count(&self) -> u32 {
        self.failures
    }

    pub fn retry_count(&self) -> u32 {
        self.retries
    }

    /// `Active -> Suspended`; returns whether the state changed
    pub fn suspend(&mut self, error: ExtractorError) -> bool {
        if self.is_suspended() {
            return false;
        }
        self.failures += 1;
        warn!("Playback suspended after error #{}: {}", self.failures, error);
        self.last_error = Some(error);
        self.state = RecoveryState::Suspended;
        true
    }

    /// Number of retry requests seen so far, including ones made while `Active`
    pub fn retry_epoch(&self) -> u64 {
        self.retry_epoch
    }

    /// Record a retry request and leave `Suspended` if currently suspended
    ///
    /// A request that arrives before the matching suspension is still counted, so the
    /// caller can compare epochs and resume right after suspending.
    pub fn request_retry(&mut self) -> bool {
        self.retry_epoch += 1;
        self.resume()
    }

    /// `Suspended -> Active`; returns whether the state changed
    pub fn resume(&mut self) -> bool {
        if !self.is_suspended() {
            return false;
        }
        self.retries += 1;
        info!("Retrying playback (attempt {})", self.retries);
        self.state = RecoveryState::Active;
        true
    }
}

/// Something that can leave the suspended state on request
pub trait RecoveryTarget: Send + Sync {
    fn reset_error(&self);
}

/// Caller-invokable retry action handed out with every error
///
/// Cheap to clone, callable from any thread, any number of times, immediately or much
/// later. Once the player it belongs to has been torn down, [`retry`](Self::retry) does
/// nothing and returns `false`.
#[derive(Clone)]
pub struct RetryHandle {
    target: Weak<dyn RecoveryTarget>,
}

impl RetryHandle {
    pub fn new(target: Weak<dyn RecoveryTarget>) -> Self {
        Self { target }
    }

    pub fn retry(&self) -> bool {
        match self.target.upgrade() {
            Some(target) => {
                target.reset_error();
                true
            }
            None => false,
        }
    }

    /// Whether the owning player still exists
    pub fn is_attached(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl std::fmt::Debug for RetryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryHandle")
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl<T: RecoveryTarget + 'static> From<&Arc<T>> for RetryHandle {
    fn from(target: &Arc<T>) -> Self {
        let target: Arc<dyn RecoveryTarget> = target.clone();
        Self::new(Arc::downgrade(&target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_state_transitions() {
        let mut recovery = ErrorRecovery::new();
        assert_eq!(recovery.state(), RecoveryState::Active);
        assert!(!recovery.resume());

        assert!(recovery.suspend(ExtractorError::Disposed));
        assert!(!recovery.suspend(ExtractorError::Disposed));
        assert!(recovery.is_suspended());
        assert_eq!(recovery.last_error(), Some(&ExtractorError::Disposed));

        assert!(recovery.resume());
        assert_eq!(recovery.state(), RecoveryState::Active);
        assert_eq!(recovery.failure_count(), 1);
        assert_eq!(recovery.retry_count(), 1);
    }

    #[test]
    fn test_retry_requests_counted_while_active() {
        let mut recovery = ErrorRecovery::new();
        let before = recovery.retry_epoch();

        assert!(!recovery.request_retry());
        assert_eq!(recovery.retry_epoch(), before + 1);
        assert_eq!(recovery.state(), RecoveryState::Active);

        recovery.suspend(ExtractorError::Disposed);
        assert!(recovery.request_retry());
        assert_eq!(recovery.retry_epoch(), before + 2);
        assert_eq!(recovery.retry_count(), 1);
    }

    struct Counter(AtomicUsize);

    impl RecoveryTarget for Counter {
        fn reset_error(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_retry_handle_detaches_with_target() {
        let target = Arc::new(Counter(AtomicUsize::new(0)));
        let handle = RetryHandle::from(&target);

        assert!(handle.retry());
        assert!(handle.clone().retry());
        assert_eq!(target.0.load(Ordering::SeqCst), 2);

        drop(target);
        assert!(!handle.is_attached());
        assert!(!handle.retry());
    }
}
