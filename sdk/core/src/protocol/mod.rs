//! Wire protocol: envelopes, method names and error codes

pub mod envelope;
pub mod methods;

pub use envelope::{Envelope, Message, ProtocolError, RequestId, RpcError};
