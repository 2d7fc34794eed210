//! Request/response correlation
//!
//! The wire protocol has no request id, so a response can only be matched
//! to a request by position. The queue therefore keeps exactly one request
//! in flight and holds the rest in strict FIFO order.

pub mod request;

pub use request::{QueueError, RequestQueue, QUEUE_CAPACITY};
