//! Diagnostic probes for session handling, bearer-token attachment, and
//! feature-flag reachability against the agents backend.

pub mod checks;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod runner;
pub mod session;
pub mod token;
pub mod transport;

pub use error::ProbeError;
pub use orchestrator::{Orchestrator, Report, Verdict};
pub use runner::{Outcome, run_request};
pub use session::{PasswordGrantProvider, Session, SessionProvider, StaticSessionProvider, probe_session};
pub use token::{TokenPayload, decode_token_payload};
pub use transport::{HttpTransport, ReqwestTransport};
