//! Background Tasks Module
//!
//! Contains the periodic sweeps that bound in-process map growth.

mod sweep;

pub use sweep::{spawn_limiter_sweep_task, spawn_query_sweep_task};
