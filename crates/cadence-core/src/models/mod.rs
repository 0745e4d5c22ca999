pub mod media_item;
pub mod transcoding;

pub use media_item::*;
pub use transcoding::*;
