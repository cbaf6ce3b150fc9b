// SPDX-License-Identifier: MIT

//! Observers receive every lifecycle transition of a run and its summary.
//!
//! Callbacks are synchronous and called in order. `on_complete` is called
//! exactly once per run, after the last `on_node_update`.

use tokio::sync::mpsc;

use super::run::{NodeUpdate, RunEvent, RunSummary};

pub trait RunObserver: Send {
    fn on_node_update(&mut self, update: &NodeUpdate);

    fn on_complete(&mut self, _summary: &RunSummary) {}
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {
    fn on_node_update(&mut self, _update: &NodeUpdate) {}
}

/// Collects events in memory
impl RunObserver for Vec<RunEvent> {
    fn on_node_update(&mut self, update: &NodeUpdate) {
        self.push(RunEvent::NodeUpdate(update.clone()));
    }

    fn on_complete(&mut self, summary: &RunSummary) {
        self.push(RunEvent::Completed(summary.clone()));
    }
}

/// Forwards events over a channel, e.g. to a streaming response
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self { tx }
    }
}

impl RunObserver for ChannelObserver {
    fn on_node_update(&mut self, update: &NodeUpdate) {
        // Receiver gone means nobody is listening any more; the run still finishes.
        let _ = self.tx.send(RunEvent::NodeUpdate(update.clone()));
    }

    fn on_complete(&mut self, summary: &RunSummary) {
        let _ = self.tx.send(RunEvent::Completed(summary.clone()));
    }
}

/// Adapts a pair of closures
pub struct FnObserver<U, C> {
    on_update: U,
    on_complete: C,
}

impl<U, C> FnObserver<U, C>
where
    U: FnMut(&NodeUpdate) + Send,
    C: FnMut(&RunSummary) + Send,
{
    pub fn new(on_update: U, on_complete: C) -> Self {
        Self {
            on_update,
            on_complete,
        }
    }
}

impl<U, C> RunObserver for FnObserver<U, C>
where
    U: FnMut(&NodeUpdate) + Send,
    C: FnMut(&RunSummary) + Send,
{
    fn on_node_update(&mut self, update: &NodeUpdate) {
        (self.on_update)(update)
    }

    fn on_complete(&mut self, summary: &RunSummary) {
        (self.on_complete)(summary)
    }
}
