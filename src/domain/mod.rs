// Domain layer: entities, outcome shapes and the ports use cases depend on.

pub mod application;
pub mod errors;
pub mod payment;
pub mod ports;
pub mod result;
pub mod session;

pub use errors::{Cancelled, ClientError, FlowError};
pub use result::{ApiReply, OperationResult};
