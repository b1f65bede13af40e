//! Pipeline stages for a single conversion call.
//!
//! ## Data Flow
//!
//! ```text
//! workspace::acquire ──▶ invoke ──▶ workspace::release
//!  (session-XXXXXX)     (pandoc)    (rm -r, also on drop)
//! ```
//!
//! 1. [`workspace`]: create the per-call scratch directory and remove it on
//!    every exit path
//! 2. [`invoke`]: stage the input, run pandoc with `kill_on_drop`, read
//!    the produced artifact back
//!
//! Validation and the mapping from stage failures to outcomes live in
//! [`crate::convert`].

pub mod invoke;
pub mod workspace;
