pub mod core;
pub mod rendering;
pub mod window;

pub use self::core::{default_config_path, AppConfig};
pub use rendering::RenderConfig;
pub use window::{ContextConfig, WindowConfig};
