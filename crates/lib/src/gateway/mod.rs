//! Gateway: local HTTP API over chat sessions.
//!
//! Lets a dashboard (or any HTTP client) create sessions, send and regenerate messages,
//! reset conversations and pick a client scope. Generation itself is delegated to the
//! hosted backend through [`crate::llm`].

mod protocol;
mod server;

pub use protocol::{
    CreateSessionParams, RegenerateParams, ResetParams, ScopeParams, SendParams, SessionView,
    TurnResponse,
};
pub use server::{router, run_gateway, ApiError, GatewayState};
