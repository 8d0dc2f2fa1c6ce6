//! # Engine Module
//!
//! Execution and data-correspondence layer of the pipeline: it drives the external FEBio solver
//! over batches of input files, decides from each run's log how the run ended, and turns the
//! solver's volumetric output frames into per-surface-vertex displacements.
//!
//! ## Overview
//!
//! - **Configuration** ([`config`]) - Solver lookup settings and the parallelism plan
//! - **Solver Lookup** ([`locator`]) - Resolves the FEBio executable from the environment or a search path
//! - **Batch Execution** ([`runner`]) - Runs one solver process per job on a bounded worker pool
//! - **Termination Classification** ([`termination`]) - Maps the tail of a log file to an outcome
//! - **Correspondence** ([`correspondence`]) - Matches surface vertices to volumetric vertices by exact position
//! - **Displacement Assembly** ([`displacement`]) - Gathers surface displacements frame by frame
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events for front ends
//! - **Error Handling** ([`error`]) - Engine-level error type
//!
//! Failures of individual solver runs are outcomes rather than errors; only conditions that make
//! a whole batch or conversion meaningless surface as [`error::EngineError`].

pub mod config;
pub mod correspondence;
pub mod displacement;
pub mod error;
pub mod locator;
pub mod progress;
pub mod runner;
pub mod termination;
