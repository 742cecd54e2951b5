//! Host surfaces.
//!
//! - `host`: string-in/string-out contract for embedding
//! - `server`: HTTP server
//! - `types`: HTTP request and response bodies
//! - `logs`: log broadcasting shared by every host

pub mod host;
pub mod logs;
pub mod server;
pub mod types;

pub use host::{run_spec_json, run_spec_json_with, validate_spec_json, HostResponse, HostStatus};
pub use logs::*;
pub use server::{router, start_server, AppState};
pub use types::*;
