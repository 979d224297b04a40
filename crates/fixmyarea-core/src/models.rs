//! Domain models for FixMyArea.
//!
//! These are the core types shared across all crates.

pub mod complaint;
pub mod dog;
pub mod location;
pub mod otp;
pub mod user;
