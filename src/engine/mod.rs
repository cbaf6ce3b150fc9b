// SPDX-License-Identifier: MIT

//! Engine kit - the types and traits a flow run is built from
//!
//! - `node` - caller-owned topology (`Node`, `Edge`, `NodeKind`)
//! - `run` - status transitions, results and summaries
//! - `invoker` - the per-node operation seam
//! - `observer` - where transitions and summaries are delivered

pub mod error;
pub mod invoker;
pub mod node;
pub mod observer;
pub mod run;

pub use error::{ConditionError, FlowError, InvokeError};
pub use invoker::NodeInvoker;
pub use node::{CategoryCondition, Edge, InputParameters, Node, NodeData, NodeKind, SourceHandle};
pub use observer::{ChannelObserver, FnObserver, NoopObserver, RunObserver};
pub use run::{
    ConditionCheck, ConditionTrace, NodeStatus, NodeUpdate, RunEvent, RunMode, RunResult,
    RunSummary,
};
