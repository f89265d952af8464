// Interface adapters: wire protocol, HTTP plumbing and the auth state store.

pub mod clients;
pub mod http;
pub mod protocol;
pub mod state;
