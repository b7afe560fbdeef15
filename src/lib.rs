pub mod chain;
pub mod config;
pub mod error;
pub mod http;
pub mod llm;
pub mod loader;
pub mod run;
