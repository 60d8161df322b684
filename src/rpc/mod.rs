//! JSON-RPC methods exposed by the notification subsystem

pub mod errors;
pub mod zmq;

pub use errors::{RpcError, RpcErrorCode, RpcResult};
pub use self::zmq::ZmqRpc;
