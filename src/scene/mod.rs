pub mod exchange;
pub mod splat;

pub use exchange::SceneExchange;
pub use splat::{SceneId, SplatScene};
