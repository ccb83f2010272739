use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Learning Opengl 2".to_string(),
            width: 800,
            height: 800,
            resizable: true,
        }
    }
}

/// Requested OpenGL context. Always a core profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub gl_major: u8,
    pub gl_minor: u8,
    pub vsync: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            gl_major: 3,
            gl_minor: 3,
            vsync: true,
        }
    }
}
