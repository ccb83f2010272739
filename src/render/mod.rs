pub mod mesh;
pub mod shaders;

pub use mesh::{MeshData, MeshError, TriangleMesh};
pub use shaders::{
    BuildPolicy, GlBackend, ShaderBackend, ShaderBuilder, ShaderError, ShaderProgram,
    ShaderSource, ShaderStage,
};

use gl::types::GLenum;

/// Pops the oldest pending GL error, if any.
pub fn take_gl_error() -> Option<GLenum> {
    let error = unsafe { gl::GetError() };
    (error != gl::NO_ERROR).then_some(error)
}

pub fn gl_error_name(error: GLenum) -> &'static str {
    match error {
        gl::INVALID_ENUM => "GL_INVALID_ENUM",
        gl::INVALID_VALUE => "GL_INVALID_VALUE",
        gl::INVALID_OPERATION => "GL_INVALID_OPERATION",
        gl::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        gl::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        _ => "unknown GL error",
    }
}
