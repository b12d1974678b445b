//! Request handlers.

pub mod games;
pub mod health;
pub mod videos;

pub use games::*;
pub use health::*;
pub use videos::*;
