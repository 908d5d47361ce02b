//! The running side of the error-handling and unwinding subsystem: the
//! handler stack, the state-snapshot unwinder, and the constructors that sit
//! on top of them. `rt-core` describes what an error *is*; this crate
//! describes what happens when one is raised.

pub mod constructors;
pub mod exit;
pub mod frame;
pub mod handler;
pub mod runtime_state;
pub mod snapshot;
pub mod unwind;

pub use constructors::{error_from, make_error, make_script_error, ConstructError, ErrorSource};
pub use exit::{
    exit_status_for, exit_status_for_error, ExitValue, SECURITY_QUIT_STATUS, UNCAUGHT_HALT_STATUS,
};
pub use frame::{Frame, FrameKind};
pub use handler::{pop_handler, push_handler, Handler};
pub use runtime_state::{with_runtime, with_runtime_mut, MoldGuard, Runtime};
pub use snapshot::Snapshot;
pub use unwind::{fail, fail_with_error, fail_with_message, FailReason, RuntimeError};
