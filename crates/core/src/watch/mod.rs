//! The longitudinal watch/review subsystem: a durable
//! store of tracked repositories, an exclusive advisory lock over it, a
//! one-shot change detector, a session builder that materializes reviewable
//! diffs, and a review launcher that hands sessions to an external reviewer
//! subprocess.

pub mod change_detector;
pub mod lock;
pub mod review;
pub mod session;
pub mod store;
