//! pagekeep-core library.
//!
//! Classification, tiered retention, and pruning of PageSpeed Insights
//! artifacts, plus the organiser that gives raw responses their canonical
//! names.
//!
//! # Conventions
//!
//! - **Errors**: library functions return [`error::Result`]; per-file problems
//!   are values ([`prune::FileOutcome`], [`organise::OrganiseOutcome`]), not errors.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`).

pub mod archive;
pub mod artifact;
pub mod config;
pub mod dedup;
pub mod error;
pub mod organise;
pub mod policy;
pub mod prune;
pub mod retention;
pub mod scan;

pub use artifact::{Artifact, Strategy, classify};
pub use error::{ErrorCode, PagekeepError};
pub use policy::{BucketScope, RetentionPlan, RetentionPolicy};
pub use prune::{Disposal, PruneOptions};
