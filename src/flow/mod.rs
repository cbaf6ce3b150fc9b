// SPDX-License-Identifier: MIT

//! Flow application: workflow model, runner, simulated operations and the
//! HTTP surface.

pub mod config;
pub mod invokers;
pub mod server;
pub mod workflow;
