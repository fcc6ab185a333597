pub mod chat;
pub mod cli;
pub mod server;
pub mod upload;
