//! TWINELOG-RS: rotating file logging for the Twine node shell
//!
//! A concurrent, size-rotated, retention-bounded log sink fed by
//! `tracing`, plus the configuration and bootstrap plumbing around it.

pub mod common;
pub mod config;
pub mod filelog;
pub mod logger;
