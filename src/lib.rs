pub mod config;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod process;
pub mod server;
