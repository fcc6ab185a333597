mod action;
mod error;
mod event;
mod gateway;
mod identity;
mod message;
mod notification;
mod slash_commands;
mod upload;

pub use action::*;
pub use error::*;
pub use event::*;
pub use gateway::*;
pub use identity::*;
pub use message::*;
pub use notification::*;
pub use slash_commands::*;
pub use upload::*;
