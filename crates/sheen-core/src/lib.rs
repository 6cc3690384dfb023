pub mod assemble;
pub mod catalog;
pub mod config;
pub mod conversation;
pub mod debounce;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod llm;
pub mod model;
pub mod selection;
pub mod session;
pub mod store;
