// SPDX-License-Identifier: MIT

//! Node state for flow runs
//!
//! The runner emits transitions; `NodeStateTable` is the caller-side store
//! that reduces them into a per-node status view.

mod store;

pub use store::{NodeState, NodeStateTable};
