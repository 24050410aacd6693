//! CLI module for the `cdr` binary
//!
//! Each command lives in its own module with an `Args` struct and a `run`
//! function. Commands return the process exit code so that lint findings
//! and suspended sessions are visible to scripts.

pub mod config;
pub mod error;
pub mod output;

pub mod insert;
pub mod lint;
pub mod resolve;
pub mod rules;
pub mod session;

/// Command failed.
pub const EXIT_ERROR: u8 = 1;

/// Document has structural violations.
pub const EXIT_VIOLATIONS: u8 = 2;

/// Session stopped on a pending decision.
pub const EXIT_AWAITING_DECISION: u8 = 3;

/// Session was cancelled (abort or expiry).
pub const EXIT_CANCELLED: u8 = 4;
