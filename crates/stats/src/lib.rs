//! Statistical inference for experiment results — two-proportion
//! significance testing, uplift computation, and winner determination.
//!
//! Everything here is pure and stateless: safe to call from any number
//! of concurrent readers, no locking, no I/O.

pub mod significance;
pub mod uplift;

pub use significance::{analyze, SignificanceResult};
pub use uplift::{evaluate, has_enough_data, uplift_pct, WinnerVerdict};
