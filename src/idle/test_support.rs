//! Scripted registry standing in for the OS in tests.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::IdleRegistry;
use crate::error::IdleError;

/// Registry whose idle clock is driven by the test.
///
/// Clones share state, so a test keeps one clone as the controller and hands
/// another to the handle under test.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedRegistry {
    idle_nanos: Arc<AtomicU64>,
    closes: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl ScriptedRegistry {
    /// Let time pass without input.
    pub(crate) fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.idle_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Simulate a keyboard or pointer event.
    pub(crate) fn input(&self) {
        self.idle_nanos.store(0, Ordering::SeqCst);
    }

    pub(crate) fn set_idle(&self, idle: Duration) {
        let nanos = u64::try_from(idle.as_nanos()).unwrap_or(u64::MAX);
        self.idle_nanos.store(nanos, Ordering::SeqCst);
    }

    pub(crate) fn fail_reads(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl IdleRegistry for ScriptedRegistry {
    fn read_idle_nanos(&self) -> Result<u64, IdleError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(IdleError::Read("scripted read failure".to_string()));
        }
        Ok(self.idle_nanos.load(Ordering::SeqCst))
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
