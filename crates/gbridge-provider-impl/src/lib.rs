pub mod client;
pub mod dispatch;
pub mod fetch;
pub mod provider;
pub mod upstream;

pub use dispatch::{DispatchPlan, DispatchProvider, TransformPlan, dispatch_request};
pub use fetch::WreqMediaFetcher;
pub use provider::{AistudioProvider, AistudioSettings};
