//! Public extension contracts for embedding the client in an application shell.
//!
//! The crate has no view layer; the one place it needs the host application is when the user
//! must be sent back to the login screen. Hosts implement [`Navigator`] to react to that.

pub mod navigator;

pub use navigator::*;
