//! Session state, the dispatcher, and the task tying them to the transport

pub mod dispatcher;
pub mod manager;
pub mod state;

pub use dispatcher::Dispatcher;
pub use manager::{SessionHandle, SessionManager, SessionSnapshot};
pub use state::SessionState;
