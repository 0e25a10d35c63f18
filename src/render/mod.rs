pub mod splat;
pub mod view;

pub use splat::{ColorMode, Frame, RenderOptions, SplatRenderer, Upload};
pub use view::View;
