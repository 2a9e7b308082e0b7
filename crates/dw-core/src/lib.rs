//! dw-core: Cross-thread event queue and main-loop dispatcher
//!
//! Native toolkit callbacks arrive on arbitrary threads. dw-core queues them
//! by priority and runs the application's handlers on a single UI thread.
//! Toolkits plug in through the [`Toolkit`] trait; a display-less backend
//! ships behind the `headless` feature.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod main_loop;
pub mod producer;
pub mod queue;
pub mod registry;
pub mod toolkit;
pub mod types;
pub mod wake;

#[cfg(feature = "headless")]
pub mod headless;

pub use config::EngineConfig;
pub use dispatch::DISPATCH_UNHANDLED;
pub use engine::Engine;
pub use error::DwError;
pub use main_loop::{DEFAULT_DRAIN_POLICY, DrainPolicy, LoopState};
pub use producer::{Producer, QUEUED};
pub use queue::Priority;
pub use registry::{DisconnectFn, Handler, TimerFn};
pub use toolkit::*;
pub use types::*;
