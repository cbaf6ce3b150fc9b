// SPDX-License-Identifier: MIT

pub mod condition;
pub mod graph;
pub mod history;
pub mod loader;
pub mod state;
pub mod types;
