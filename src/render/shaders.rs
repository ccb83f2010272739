// shaders.rs - Shader program building and the context calls it needs

use gl::types::*;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::ffi::{c_void, CString, NulError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::ptr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to open shader file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{stage} shader failed to compile: {log}")]
    Compile {
        stage: ShaderStage,
        log: String,
        code: String,
    },
    #[error("shader program failed to link: {log}")]
    Linking { log: String },
    #[error("graphics context could not create a {0}")]
    Create(String),
    #[error("shader source contains a null byte: {0}")]
    Nul(#[from] NulError),
}

/// Pipeline role a compiled unit is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn gl_enum(self) -> GLenum {
        match self {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
        }
    }

    /// Guesses the stage from the conventional `.vert` / `.frag` extensions.
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "vert" | "vs" => Some(ShaderStage::Vertex),
            "frag" | "fs" => Some(ShaderStage::Fragment),
            _ => None,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// What the builder does when a file can't be read or a stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildPolicy {
    /// Return the first failure as an error.
    #[default]
    FailFast,
    /// Log every failure, record it on the program and hand the program back anyway.
    LogAndContinue,
}

/// Raw shader text, remembering the file it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    path: Option<PathBuf>,
    text: String,
}

impl ShaderSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            path: None,
            text: text.into(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            text,
        })
    }

    /// Empty stand-in for a file that could not be read. It carries no path;
    /// the open failure already named it.
    fn unreadable() -> Self {
        Self::new(String::new())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn label(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "<no file>".to_string(),
        }
    }
}

/// The context primitives shader building is made of.
///
/// Every call must happen on the thread that owns the current context.
pub trait ShaderBackend {
    fn create_shader(&self, stage: ShaderStage) -> Result<GLuint, ShaderError>;
    fn compile_shader(&self, shader: GLuint, source: &str) -> Result<(), ShaderError>;
    fn compile_status(&self, shader: GLuint) -> bool;
    fn shader_info_log(&self, shader: GLuint) -> String;
    fn delete_shader(&self, shader: GLuint);

    fn create_program(&self) -> Result<GLuint, ShaderError>;
    fn attach_shader(&self, program: GLuint, shader: GLuint);
    fn detach_shader(&self, program: GLuint, shader: GLuint);
    fn link_program(&self, program: GLuint);
    fn link_status(&self, program: GLuint) -> bool;
    fn program_info_log(&self, program: GLuint) -> String;
    fn use_program(&self, program: GLuint);
    fn delete_program(&self, program: GLuint);
}

/// [`ShaderBackend`] over the global `gl` function pointers.
#[derive(Debug, Clone, Copy)]
pub struct GlBackend {
    _loaded: (),
}

impl GlBackend {
    /// Loads the GL entry points through `loader`. The context they belong to
    /// has to be current on this thread.
    pub fn load_with<F>(loader: F) -> Self
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);
        Self { _loaded: () }
    }
}

impl ShaderBackend for GlBackend {
    fn create_shader(&self, stage: ShaderStage) -> Result<GLuint, ShaderError> {
        let shader = unsafe { gl::CreateShader(stage.gl_enum()) };
        if shader == 0 {
            return Err(ShaderError::Create(format!("{stage} shader")));
        }
        Ok(shader)
    }

    fn compile_shader(&self, shader: GLuint, source: &str) -> Result<(), ShaderError> {
        let source = CString::new(source.as_bytes())?;
        unsafe {
            gl::ShaderSource(shader, 1, &source.as_ptr(), ptr::null());
            gl::CompileShader(shader);
        }
        Ok(())
    }

    fn compile_status(&self, shader: GLuint) -> bool {
        let mut success = 0;
        unsafe {
            gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut success);
        }
        success != 0
    }

    fn shader_info_log(&self, shader: GLuint) -> String {
        let mut len = 0;
        unsafe {
            gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len);
        }

        let mut buffer = vec![0u8; len.max(0) as usize];
        if !buffer.is_empty() {
            unsafe {
                gl::GetShaderInfoLog(
                    shader,
                    len,
                    ptr::null_mut(),
                    buffer.as_mut_ptr() as *mut GLchar,
                );
            }
        }
        log_from_buffer(buffer)
    }

    fn delete_shader(&self, shader: GLuint) {
        unsafe {
            gl::DeleteShader(shader);
        }
    }

    fn create_program(&self) -> Result<GLuint, ShaderError> {
        let program = unsafe { gl::CreateProgram() };
        if program == 0 {
            return Err(ShaderError::Create("shader program".to_string()));
        }
        Ok(program)
    }

    fn attach_shader(&self, program: GLuint, shader: GLuint) {
        unsafe {
            gl::AttachShader(program, shader);
        }
    }

    fn detach_shader(&self, program: GLuint, shader: GLuint) {
        unsafe {
            gl::DetachShader(program, shader);
        }
    }

    fn link_program(&self, program: GLuint) {
        unsafe {
            gl::LinkProgram(program);
        }
    }

    fn link_status(&self, program: GLuint) -> bool {
        let mut success = 0;
        unsafe {
            gl::GetProgramiv(program, gl::LINK_STATUS, &mut success);
        }
        success != 0
    }

    fn program_info_log(&self, program: GLuint) -> String {
        let mut len = 0;
        unsafe {
            gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len);
        }

        let mut buffer = vec![0u8; len.max(0) as usize];
        if !buffer.is_empty() {
            unsafe {
                gl::GetProgramInfoLog(
                    program,
                    len,
                    ptr::null_mut(),
                    buffer.as_mut_ptr() as *mut GLchar,
                );
            }
        }
        log_from_buffer(buffer)
    }

    fn use_program(&self, program: GLuint) {
        unsafe {
            gl::UseProgram(program);
        }
    }

    fn delete_program(&self, program: GLuint) {
        unsafe {
            gl::DeleteProgram(program);
        }
    }
}

// Info logs come back NUL-terminated, usually with a trailing newline.
fn log_from_buffer(buffer: Vec<u8>) -> String {
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    String::from_utf8_lossy(&buffer[..end]).trim_end().to_string()
}

/// A compiled stage. Detached and deleted when it goes out of scope.
pub struct ShaderUnit<'b, B: ShaderBackend> {
    backend: &'b B,
    id: GLuint,
    stage: ShaderStage,
    attached_to: Cell<Option<GLuint>>,
}

impl<'b, B: ShaderBackend> ShaderUnit<'b, B> {
    fn new(backend: &'b B, id: GLuint, stage: ShaderStage) -> Self {
        Self {
            backend,
            id,
            stage,
            attached_to: Cell::new(None),
        }
    }

    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    fn attach(&self, program: GLuint) {
        self.backend.attach_shader(program, self.id);
        self.attached_to.set(Some(program));
    }
}

impl<B: ShaderBackend> Drop for ShaderUnit<'_, B> {
    fn drop(&mut self) {
        if let Some(program) = self.attached_to.take() {
            self.backend.detach_shader(program, self.id);
        }
        self.backend.delete_shader(self.id);
        debug!("released {} shader {}", self.stage, self.id);
    }
}

/// A linked program. Deleted on drop.
pub struct ShaderProgram<B: ShaderBackend = GlBackend> {
    id: GLuint,
    backend: B,
    diagnostics: Vec<ShaderError>,
}

impl<B: ShaderBackend> ShaderProgram<B> {
    pub fn id(&self) -> GLuint {
        self.id
    }

    /// False when any load, compile or link step failed while building it.
    /// Only a `LogAndContinue` build hands out unusable programs.
    pub fn is_usable(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[ShaderError] {
        &self.diagnostics
    }

    pub fn set_used(&self) {
        self.backend.use_program(self.id);
    }
}

impl<B: ShaderBackend> fmt::Debug for ShaderProgram<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("id", &self.id)
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

impl<B: ShaderBackend> Drop for ShaderProgram<B> {
    fn drop(&mut self) {
        self.backend.delete_program(self.id);
        debug!("deleted shader program {}", self.id);
    }
}

/// Turns a fragment and a vertex source into one linked [`ShaderProgram`].
pub struct ShaderBuilder<B: ShaderBackend + Clone = GlBackend> {
    backend: B,
    policy: BuildPolicy,
}

impl<B: ShaderBackend + Clone> ShaderBuilder<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            policy: BuildPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BuildPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> BuildPolicy {
        self.policy
    }

    /// Reads a shader file, logging once if it can't be opened.
    pub fn load_source(&self, path: impl AsRef<Path>) -> Result<ShaderSource, ShaderError> {
        let path = path.as_ref();
        match ShaderSource::from_file(path) {
            Ok(source) => {
                debug!("read {} bytes of shader source from {}", source.text().len(), path.display());
                Ok(source)
            }
            Err(err) => {
                error!("{err}");
                Err(err)
            }
        }
    }

    /// Compiles one stage. A failed unit is released before the error is returned.
    pub fn compile(
        &self,
        source: &ShaderSource,
        stage: ShaderStage,
    ) -> Result<ShaderUnit<'_, B>, ShaderError> {
        let (unit, failure) = self.compile_unit(source, stage)?;
        match failure {
            Some(err) => Err(err),
            None => Ok(unit),
        }
    }

    /// Loads, compiles and links the fragment stage then the vertex stage.
    pub fn build_program(
        &self,
        fragment_path: impl AsRef<Path>,
        vertex_path: impl AsRef<Path>,
    ) -> Result<ShaderProgram<B>, ShaderError> {
        let mut diagnostics = Vec::new();
        let fragment =
            self.stage_from_file(fragment_path.as_ref(), ShaderStage::Fragment, &mut diagnostics)?;
        let vertex =
            self.stage_from_file(vertex_path.as_ref(), ShaderStage::Vertex, &mut diagnostics)?;
        self.link(fragment, vertex, diagnostics)
    }

    /// Same as [`build_program`](Self::build_program) for sources already in memory.
    pub fn build_from_sources(
        &self,
        fragment: &ShaderSource,
        vertex: &ShaderSource,
    ) -> Result<ShaderProgram<B>, ShaderError> {
        let mut diagnostics = Vec::new();
        let fragment = self.stage(fragment, ShaderStage::Fragment, &mut diagnostics)?;
        let vertex = self.stage(vertex, ShaderStage::Vertex, &mut diagnostics)?;
        self.link(fragment, vertex, diagnostics)
    }

    fn stage_from_file(
        &self,
        path: &Path,
        stage: ShaderStage,
        diagnostics: &mut Vec<ShaderError>,
    ) -> Result<ShaderUnit<'_, B>, ShaderError> {
        let source = match self.load_source(path) {
            Ok(source) => source,
            Err(err) => {
                self.record(err, diagnostics)?;
                ShaderSource::unreadable()
            }
        };
        self.stage(&source, stage, diagnostics)
    }

    fn stage(
        &self,
        source: &ShaderSource,
        stage: ShaderStage,
        diagnostics: &mut Vec<ShaderError>,
    ) -> Result<ShaderUnit<'_, B>, ShaderError> {
        let (unit, failure) = self.compile_unit(source, stage)?;
        if let Some(err) = failure {
            self.record(err, diagnostics)?;
        }
        Ok(unit)
    }

    fn compile_unit(
        &self,
        source: &ShaderSource,
        stage: ShaderStage,
    ) -> Result<(ShaderUnit<'_, B>, Option<ShaderError>), ShaderError> {
        let id = self.backend.create_shader(stage)?;
        let unit = ShaderUnit::new(&self.backend, id, stage);
        self.backend.compile_shader(id, source.text())?;

        if self.backend.compile_status(id) {
            debug!("compiled {stage} shader {id} from {}", source.label());
            return Ok((unit, None));
        }

        let log = self.backend.shader_info_log(id);
        error!(
            "failed to compile {stage} shader {}:\n{}\n{log}",
            source.label(),
            source.text()
        );
        let err = ShaderError::Compile {
            stage,
            log,
            code: source.text().to_string(),
        };
        Ok((unit, Some(err)))
    }

    fn link(
        &self,
        fragment: ShaderUnit<'_, B>,
        vertex: ShaderUnit<'_, B>,
        mut diagnostics: Vec<ShaderError>,
    ) -> Result<ShaderProgram<B>, ShaderError> {
        let id = self.backend.create_program()?;
        let mut program = ShaderProgram {
            id,
            backend: self.backend.clone(),
            diagnostics: Vec::new(),
        };

        fragment.attach(id);
        vertex.attach(id);
        self.backend.link_program(id);

        // Units go whatever the link status; the program keeps the linked binary.
        drop(fragment);
        drop(vertex);

        if !self.backend.link_status(id) {
            let log = self.backend.program_info_log(id);
            error!("failed to link shader program {id}:\n{log}");
            self.record(ShaderError::Linking { log }, &mut diagnostics)?;
        }

        program.diagnostics = diagnostics;
        if program.is_usable() {
            info!("linked shader program {id}");
        } else {
            warn!(
                "continuing with unusable shader program {id} ({} failures)",
                program.diagnostics.len()
            );
        }
        Ok(program)
    }

    fn record(
        &self,
        err: ShaderError,
        diagnostics: &mut Vec<ShaderError>,
    ) -> Result<(), ShaderError> {
        match self.policy {
            BuildPolicy::FailFast => Err(err),
            BuildPolicy::LogAndContinue => {
                diagnostics.push(err);
                Ok(())
            }
        }
    }
}
