//! Shared pieces of the `retention` and `organise-reports` binaries.

pub mod cmd;
pub mod logging;
pub mod output;
