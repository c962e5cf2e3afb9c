#![forbid(unsafe_code)]
//! Hashing, filesystem utilities, and process helpers for quay.

pub mod error;
pub mod fs;
pub mod hash;
pub mod process;
