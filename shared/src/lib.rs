pub mod bonus;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod easing;
pub mod error;
pub mod fetcher;
pub mod frame;
pub mod reel;
pub mod session;
pub mod shared_wheel_game;

#[cfg(test)]
mod test_support;

pub use config::{ConfigLoader, ConfigSource, WheelConfig};
pub use error::{SpinError, SpinNotice};
pub use session::{SessionState, SpinController};
pub use shared_wheel_game::*;
