//! The polygon file format (PLY) for splat containers.

pub mod header;
pub mod layout;
pub mod text;

pub use header::*;
pub use layout::*;
pub use text::TextPoint;
