//! Lactate Zones - Deterministic engine for lactate thresholds and training zones
//!
//! The engine transforms a step-test table into thresholds and zones through a
//! pure pipeline: normalization → curve fitting → threshold detection →
//! fixed-lactate interpolation → efficiency scoring → zone derivation.
//!
//! ## Modules
//!
//! - **Engine**: `normalizer`, `curve`, `thresholds`, `fixed_points`,
//!   `efficiency`, `zones`, orchestrated by `pipeline`
//! - **Boundaries**: `schema` for input tables, `encoder` for JSON reports,
//!   `ffi` for C callers

pub mod config;
pub mod curve;
pub mod efficiency;
pub mod encoder;
pub mod error;
pub mod fixed_points;
pub mod normalizer;
pub mod pipeline;
pub mod precision;
pub mod schema;
pub mod search;
pub mod thresholds;
pub mod types;
pub mod zones;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use error::ComputeError;
pub use pipeline::{calculate, calculate_document, calculate_with_config, ThresholdEngine};
pub use types::{ProtocolMode, ResultBundle, ValidatedPoint};

// Schema exports
pub use schema::{RawStep, SessionDetails, StepTableAdapter, StepTest, SCHEMA_VERSION};

/// Engine version embedded in every report
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "lactate-zones";
