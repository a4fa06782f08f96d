pub mod asset;
pub mod payload;
pub mod story;

pub use asset::*;
pub use payload::*;
pub use story::*;
