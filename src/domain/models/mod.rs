mod backend;
mod chat;
mod design;
mod error;
mod image;
mod plant;
mod presets;
mod storage;

pub use backend::*;
pub use chat::*;
pub use design::*;
pub use error::*;
pub use image::*;
pub use plant::*;
pub use presets::*;
pub use storage::*;
