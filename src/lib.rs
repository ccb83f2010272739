pub mod cli;
pub mod config;
pub mod render;

// Re-export commonly used types
pub use cli::Cli;
pub use config::{AppConfig, ContextConfig, RenderConfig, WindowConfig};
pub use render::mesh::{MeshData, TriangleMesh};
pub use render::shaders::{
    BuildPolicy, GlBackend, ShaderBackend, ShaderBuilder, ShaderError, ShaderProgram,
    ShaderSource, ShaderStage,
};
