//! idlemgt - user idle-time reporting for desktop time tracking.
//!
//! Reads how long the keyboard and pointer have been untouched and turns that
//! into idle/active transitions, so a time tracker can suspend itself while
//! the user is away.

pub mod config;
pub mod error;
pub mod idle;
pub mod monitor;
pub mod tracker;

pub use error::IdleError;
pub use idle::IdleRegistry;
pub use idle::IdleTimeHandle;
pub use monitor::IdleMonitor;
pub use tracker::IdleState;
pub use tracker::IdleTracker;
pub use tracker::IdleTransition;
