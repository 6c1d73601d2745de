//! Chat session orchestration.
//!
//! `StartSessionHandler` routes a first message to a domain handler;
//! `ContinueSessionHandler` drives subsequent turns, including the
//! pending-draft confirm/cancel lifecycle. Both have streaming variants
//! built on the frame engine in [`stream`].

mod continue_session;
mod deadline;
mod registry;
mod start_session;
pub mod stream;

pub use continue_session::{
    ContinueSessionCommand, ContinueSessionError, ContinueSessionHandler, ContinueSessionResult,
    EmailInfo, StreamingContinue,
};
pub use deadline::run_with_deadline;
pub use registry::{HandlerRegistry, RegisteredHandler};
pub use start_session::{
    StartSessionCommand, StartSessionError, StartSessionHandler, StartSessionResult,
};
pub use stream::{FrameReceiver, StreamFrame, StreamMetrics};
