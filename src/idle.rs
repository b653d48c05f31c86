//! Idle time reporting.
//!
//! Reads the time elapsed since the last keyboard or pointer event from the
//! platform's power-management registry. On macOS this is the `HIDIdleTime`
//! property of the `IOHIDSystem` service. Other platforms report
//! [`IdleError::Unavailable`].
//!
//! A [`IdleTimeHandle`] owns the registry resources. Acquire it once, query it
//! as often as needed, then release it:
//!
//! ```no_run
//! use idlemgt::idle::IdleTimeHandle;
//!
//! let handle = IdleTimeHandle::acquire()?;
//! let seconds = handle.query_idle_seconds()?;
//! handle.release();
//! # Ok::<(), idlemgt::IdleError>(())
//! ```

#[cfg(target_os = "macos")]
mod iokit;
#[cfg(not(target_os = "macos"))]
mod unsupported;

#[cfg(test)]
pub(crate) mod test_support;

use std::cell::Cell;
use std::marker::PhantomData;
use std::time::Duration;

use tracing::debug;
use tracing::trace;

use crate::error::IdleError;

#[cfg(target_os = "macos")]
pub use iokit::IoKitRegistry as NativeRegistry;
#[cfg(not(target_os = "macos"))]
pub use unsupported::UnsupportedRegistry as NativeRegistry;

const NANOS_PER_SECOND: u64 = 1_000_000_000;
const NANOS_PER_MILLI: u64 = 1_000_000;

/// Convert a raw nanosecond reading to whole seconds, truncating.
pub fn nanos_to_seconds(nanos: u64) -> u64 {
    nanos / NANOS_PER_SECOND
}

/// Convert a raw nanosecond reading to whole milliseconds, truncating.
pub fn nanos_to_millis(nanos: u64) -> u64 {
    nanos / NANOS_PER_MILLI
}

/// OS resources behind an [`IdleTimeHandle`].
pub trait IdleRegistry {
    /// Read the raw idle time in nanoseconds.
    fn read_idle_nanos(&self) -> Result<u64, IdleError>;

    /// Release the underlying resources.
    ///
    /// [`IdleTimeHandle`] calls this exactly once.
    fn close(&mut self);
}

/// Owned handle to the idle-time registry entry.
///
/// One owner at a time. The handle is `Send` but not `Sync`: it can move to
/// another thread, but cannot be shared between threads. Threads that need
/// idle time each acquire their own handle.
///
/// ```compile_fail
/// fn assert_sync<T: Sync>() {}
/// assert_sync::<idlemgt::IdleTimeHandle>();
/// ```
#[derive(Debug)]
pub struct IdleTimeHandle<R: IdleRegistry = NativeRegistry> {
    /// Always `Some` while the handle is reachable. `release` and `Drop`
    /// take it so the registry closes exactly once.
    registry: Option<R>,

    _not_sync: PhantomData<Cell<()>>,
}

impl IdleTimeHandle<NativeRegistry> {
    /// Locate the platform idle-time registry entry.
    pub fn acquire() -> Result<Self, IdleError> {
        let registry = NativeRegistry::open()?;
        debug!("Acquired idle time handle");
        Ok(Self::from_registry(registry))
    }
}

impl<R: IdleRegistry> IdleTimeHandle<R> {
    /// Wrap an already opened registry.
    pub fn from_registry(registry: R) -> Self {
        Self {
            registry: Some(registry),
            _not_sync: PhantomData,
        }
    }

    /// Raw idle time in nanoseconds.
    ///
    /// `release` consumes the handle, so the registry is always present here.
    /// The `Read` error only covers a query made from inside `Drop`.
    pub fn query_idle_nanos(&self) -> Result<u64, IdleError> {
        let Some(ref registry) = self.registry else {
            return Err(IdleError::Read("idle time handle already released".to_string()));
        };
        let nanos = registry.read_idle_nanos()?;
        trace!("Raw idle time: {} ns", nanos);
        Ok(nanos)
    }

    /// Time since the last input event.
    pub fn query_idle(&self) -> Result<Duration, IdleError> {
        self.query_idle_nanos().map(Duration::from_nanos)
    }

    /// Whole seconds since the last input event.
    pub fn query_idle_seconds(&self) -> Result<u64, IdleError> {
        self.query_idle_nanos().map(nanos_to_seconds)
    }

    /// Whole milliseconds since the last input event.
    pub fn query_idle_millis(&self) -> Result<u64, IdleError> {
        self.query_idle_nanos().map(nanos_to_millis)
    }

    /// Run `f` with this handle, then release it whatever `f` returns.
    pub fn scoped<T>(self, f: impl FnOnce(&Self) -> Result<T, IdleError>) -> Result<T, IdleError> {
        let result = f(&self);
        self.release();
        result
    }

    /// Release the OS resources.
    pub fn release(mut self) {
        self.close_registry();
    }

    fn close_registry(&mut self) {
        if let Some(mut registry) = self.registry.take() {
            registry.close();
            debug!("Released idle time handle");
        }
    }
}

impl<R: IdleRegistry> Drop for IdleTimeHandle<R> {
    fn drop(&mut self) {
        self.close_registry();
    }
}

/// Acquire a native handle, run `f`, and release the handle on every path.
pub fn with_handle<T>(
    f: impl FnOnce(&IdleTimeHandle) -> Result<T, IdleError>,
) -> Result<T, IdleError> {
    IdleTimeHandle::acquire()?.scoped(f)
}

#[cfg(test)]
mod tests {
    use super::test_support::ScriptedRegistry;
    use super::*;

    #[test]
    fn test_nanos_to_seconds() {
        assert_eq!(nanos_to_seconds(5_000_000_000), 5);
        assert_eq!(nanos_to_seconds(5_999_999_999), 5);
        assert_eq!(nanos_to_seconds(999_999_999), 0);
        assert_eq!(nanos_to_seconds(0), 0);
    }

    #[test]
    fn test_nanos_to_millis() {
        assert_eq!(nanos_to_millis(5_000_000_000), 5_000);
        assert_eq!(nanos_to_millis(1_999_999), 1);
    }

    #[test]
    fn test_handle_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<IdleTimeHandle<ScriptedRegistry>>();
        assert_send::<IdleTimeHandle>();
    }

    #[test]
    fn test_acquire_then_release_without_query() {
        let registry = ScriptedRegistry::default();
        let handle = IdleTimeHandle::from_registry(registry.clone());
        handle.release();
        assert_eq!(registry.close_count(), 1);
    }

    #[test]
    fn test_drop_releases_once() {
        let registry = ScriptedRegistry::default();
        {
            let handle = IdleTimeHandle::from_registry(registry.clone());
            registry.set_idle(Duration::from_secs(3));
            assert_eq!(handle.query_idle_seconds().unwrap(), 3);
        }
        assert_eq!(registry.close_count(), 1);
    }

    #[test]
    fn test_queries_non_decreasing_until_input() {
        let registry = ScriptedRegistry::default();
        let handle = IdleTimeHandle::from_registry(registry.clone());

        let mut previous = handle.query_idle_millis().unwrap();
        for _ in 0..5 {
            registry.advance(Duration::from_millis(250));
            let current = handle.query_idle_millis().unwrap();
            assert!(current >= previous);
            previous = current;
        }
        assert_eq!(previous, 1_250);

        registry.input();
        assert_eq!(handle.query_idle_seconds().unwrap(), 0);
        assert!(handle.query_idle().unwrap() < Duration::from_millis(10));
    }

    #[test]
    fn test_read_error_propagates() {
        let registry = ScriptedRegistry::default();
        registry.fail_reads(true);
        let handle = IdleTimeHandle::from_registry(registry.clone());

        let err = handle.query_idle_seconds().unwrap_err();
        assert!(!err.is_unavailable());
        assert!(matches!(err, IdleError::Read(_)));
    }

    #[test]
    fn test_scoped_releases_on_error() {
        let registry = ScriptedRegistry::default();
        registry.fail_reads(true);

        let result = IdleTimeHandle::from_registry(registry.clone())
            .scoped(IdleTimeHandle::query_idle_seconds);

        assert!(result.is_err());
        assert_eq!(registry.close_count(), 1);
    }

    #[test]
    fn test_scoped_returns_value() {
        let registry = ScriptedRegistry::default();
        registry.set_idle(Duration::from_secs(42));

        let seconds = IdleTimeHandle::from_registry(registry.clone())
            .scoped(|handle| {
                let first = handle.query_idle_seconds()?;
                let second = handle.query_idle_seconds()?;
                Ok(first.max(second))
            })
            .unwrap();

        assert_eq!(seconds, 42);
        assert_eq!(registry.close_count(), 1);
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_acquire_unavailable_on_unsupported_platform() {
        let err = IdleTimeHandle::acquire().unwrap_err();
        assert!(err.is_unavailable());

        let err = with_handle(|handle| handle.query_idle_seconds()).unwrap_err();
        assert!(err.is_unavailable());
    }
}
