//! Backend abstraction layer
//!
//! Provides the command-stream trait the render graph lowers onto, plus the
//! descriptor and state types shared with it.

pub mod traits;
pub mod types;

pub use traits::*;
pub use types::*;
