//! Render Graph System
//!
//! Passes declare what they read and write; the graph orders them, creates
//! transient resources for exactly the passes that use them, and lowers the
//! draws each pass emits onto a backend.

pub mod builder;
pub mod draw;
pub mod executor;
pub mod graph;
pub mod pass;
pub mod resource;

pub use builder::*;
pub use draw::*;
pub use executor::*;
pub use graph::*;
pub use pass::*;
pub use resource::*;
