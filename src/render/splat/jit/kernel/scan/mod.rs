pub mod add;

pub use super::*;
