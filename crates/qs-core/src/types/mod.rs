//! Core data types: connection status, realtime quotes, wire protocol, and
//! symbol helpers.

pub mod protocol;
pub mod quote;
pub mod status;
pub mod symbol;

pub use protocol::*;
pub use quote::*;
pub use status::*;
pub use symbol::*;
