// The clients defined here are reqwest wrappers for the backend and the payment processor.

pub mod applications;
pub mod auth;
pub mod payments;
pub mod processor;

pub use applications::ApplicationClient;
pub use auth::AuthClient;
pub use payments::{PaymentClient, QueueClient};
pub use processor::ProcessorClient;
