pub mod core;
pub mod handler;

pub use crate::core::{Core, CoreState};
