// SPDX-License-Identifier: MIT

mod simulated;

pub use simulated::SimulatedInvoker;
