//! Image generation: strategies for obtaining bytes from the service and the
//! retrying transport they share.

pub mod retry;
pub mod strategy;

pub use retry::{RetryPolicy, RetryingTransport};
pub use strategy::{GeneratedImage, GenerationStrategy, PollPolicy, StrategyKind};
