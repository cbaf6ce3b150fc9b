// SPDX-License-Identifier: MIT

//! Graph ordering, validation and execution
//!
//! This module provides the flow runner that walks nodes either in
//! topological order or along a single condition-driven path.

pub mod executor;
pub mod order;
mod validate;

pub use executor::{FlowRunner, DEFAULT_STEP_DELAY, NO_START_NODE_ID, SKIPPED_MESSAGE};
pub use order::{order, ExecutionOrder};
pub use validate::{validate, ValidationReport};
