pub mod extractors;
pub mod mrz;
pub mod resolver;

pub use extractors::*;
pub use mrz::*;
pub use resolver::*;
