//! Session domain: identifiers, redacted token secrets, and the persisted session model.

pub mod id;
pub mod session;
pub mod token;

pub use id::*;
pub use session::*;
pub use token::*;
