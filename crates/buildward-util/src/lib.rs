#![forbid(unsafe_code)]
//! Filesystem, hashing, naming, and archive helpers for buildward.

pub mod archive;
pub mod error;
pub mod fs;
pub mod hash;
pub mod name;
