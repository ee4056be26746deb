//! Request handlers for gateway endpoints

pub mod view;

// Re-export commonly used handlers
pub use view::*;
