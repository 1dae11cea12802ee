//! Background Tasks Module
//!
//! # Tasks
//! - Snapshot flush: writes pending changes in interval persistence mode

mod flush;

pub use flush::spawn_flush_task;
