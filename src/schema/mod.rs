//! lactate.step_test.v1 input schema
//!
//! This module defines the step table handed to the engine by the input
//! collaborator, along with parsers for the supported encodings.

mod adapter;
mod step_table;

pub use adapter::*;
pub use step_table::*;
