//! Interval scheduler for visibility flips.
//! The first tick is aligned to a clean wall-clock boundary; later ticks
//! follow absolute deadlines so pass duration never accumulates as drift.

pub mod error;
pub mod schedule;
pub mod service;

pub use {
    error::{Error, Result},
    schedule::{Alignment, first_tick_ms},
    service::{ClockFn, FlipFn, FlipScheduler, SchedulerState, SchedulerStatus},
};
