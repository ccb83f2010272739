use crate::render::{BuildPolicy, ShaderStage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub clear_color: [f32; 4],
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub build_policy: BuildPolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            vertex_shader: PathBuf::from("shaders/triangle.vert"),
            fragment_shader: PathBuf::from("shaders/triangle.frag"),
            build_policy: BuildPolicy::FailFast,
        }
    }
}

impl RenderConfig {
    /// Shader paths whose extension names the other stage, e.g. a `.frag`
    /// file given as the vertex shader. Unknown extensions are not reported.
    pub fn stage_mismatches(&self) -> Vec<(ShaderStage, &Path)> {
        [
            (ShaderStage::Vertex, self.vertex_shader.as_path()),
            (ShaderStage::Fragment, self.fragment_shader.as_path()),
        ]
        .into_iter()
        .filter(|(stage, path)| {
            matches!(ShaderStage::from_extension(path), Some(found) if found != *stage)
        })
        .collect()
    }
}
