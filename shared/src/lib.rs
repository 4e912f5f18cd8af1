pub mod allocator;
pub mod block_quota;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod display;
pub mod error;
pub mod guests;
pub mod rng;
pub mod session;

pub use allocator::{ForceOutcome, PendingSpin, SelectionMode, SpinAllocator, SpinResult};
pub use config::{WheelConfig, WheelVariant};
pub use error::WheelError;
pub use rng::{IndexSource, RandSource, ScriptedSource};
