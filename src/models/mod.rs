pub mod document;
pub mod enums;
pub mod metadata;

pub use document::*;
pub use enums::*;
pub use metadata::*;
