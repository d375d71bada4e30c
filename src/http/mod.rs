//! HTTP protocol layer module
//!
//! Response builders and request-body plumbing shared by every handler,
//! decoupled from the store and replication logic.

pub mod request;
pub mod response;

pub use request::{query_flag, read_json_body};
pub use response::{
    build_405_response, build_health_response, build_not_found_response, error_response,
    json_response,
};
