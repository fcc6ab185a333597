mod conversation;
mod dispatcher;
mod identity_resolver;
mod upload_validator;

pub use conversation::*;
pub use dispatcher::*;
pub use identity_resolver::*;
pub use upload_validator::*;
