//! Experiment assignment engine — sticky visitor assignment, bandit
//! and weighted-random selection policies over a live reward model,
//! and a deterministic client-side fallback assigner.
//!
//! The hot path (`ExperimentHub::assign`) performs no I/O beyond the
//! sticky lookup/commit and is safe for unbounded concurrent callers.

pub mod fallback;
pub mod hub;
pub mod policy;
pub mod rewards;
pub mod sticky;

pub use fallback::{fallback_assign, FALLBACK_HASH_VERSION};
pub use hub::ExperimentHub;
pub use rewards::RewardModel;
pub use sticky::StickyStore;
