pub mod naming;
pub mod import;
pub mod extraction;
pub mod analysis;
pub mod resolve;
pub mod filing;
pub mod batch;
