pub mod bus;
pub mod config;
pub mod error;
pub mod extract;
pub mod inbound;
pub mod llm;
pub mod platform;
pub mod reply;
pub mod router;
pub mod scope;
