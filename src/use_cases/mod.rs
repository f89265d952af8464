// Use cases layer: client workflows built on the domain ports.

pub mod applications;
pub mod auth;
pub mod normalize;
pub mod payment_flow;
pub mod polling;
pub mod recovery;
pub mod task;

#[cfg(test)]
pub(crate) mod test_support;

pub use polling::{PollHandle, PollOutcome, PollProgress, PollSettings, StatusPoller};
pub use task::{CancelHandle, CancelSignal, cancel_pair};
