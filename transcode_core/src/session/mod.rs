//! Client-side transcode session
//!
//! - `connection`: socket lifecycle and raw send/receive
//! - `codec`: file → data URL, binary frame → download handle
//! - `request`: upload request assembly and submission
//! - `dispatcher`: inbound frame classification
//! - `state`: the session state machine
//! - `driver`: the event loop that ties them together

pub mod codec;
pub mod connection;
pub mod dispatcher;
pub mod driver;
pub mod request;
pub mod state;

pub use codec::DownloadHandle;
pub use connection::ConnectionManager;
pub use dispatcher::{DispatchOutcome, ServerMessage, StatusMessage};
pub use driver::Session;
pub use request::{SelectedFile, UploadRequest};
pub use state::{ConnectionPhase, SessionSnapshot, SessionState, UploadPhase};
