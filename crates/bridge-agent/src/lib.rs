//! Command-line driver of the print bridge.

pub mod job_file;
pub mod session;
