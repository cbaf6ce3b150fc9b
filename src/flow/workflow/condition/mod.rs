// SPDX-License-Identifier: MIT

//! Branch resolution for dynamic runs
//!
//! A node with categories picks its next edge by testing each
//! `{parameter, value}` condition against its input parameters:
//! - `{"parameter": "level", "value": "high"}` matches input `{"level": "high"}`
//! - values are compared as text, so `500` matches `"500"`
//! - the first matching condition wins

mod evaluator;

pub use evaluator::{resolve, Resolution, Unresolved};
