//! Facade planner application.
//!
//! Scene orchestration, image loading, configuration and file output on
//! top of `facade-core` and `facade-render`.

mod config;
pub mod file_ops;
pub mod loader;
mod scene;
mod shortcuts;

pub use config::{AppConfig, ConfigError};
pub use loader::{ImageLoader, InlineLoader, LoadCompletion, LoadKey, ThreadedLoader};
pub use scene::{Scene, SceneError, SceneResult};
pub use shortcuts::{Shortcut, ShortcutRegistry};
