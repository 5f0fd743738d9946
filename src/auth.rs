//! Bearer token model, redacted secrets, and the token lifecycle manager.

pub mod manager;
pub mod secret;
pub mod token;

pub use manager::*;
pub use secret::*;
pub use token::*;
