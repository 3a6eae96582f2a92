pub mod aistudio;

pub use aistudio::{AistudioProvider, AistudioSettings};
