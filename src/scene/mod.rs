//! Scene placement: object transform and view

mod transform;
mod view;

pub use transform::*;
pub use view::*;
