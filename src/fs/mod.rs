//! Filesystem helpers for kiln.
//!
//! Locally persisted artifacts and scaffolded files go through atomic
//! writes so an interrupted run never leaves a half-written file behind.

mod atomic;

pub use atomic::{atomic_write, atomic_write_file};
