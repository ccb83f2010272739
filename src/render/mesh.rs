use gl::types::*;
use glam::Vec3;
use log::debug;
use std::mem;
use std::ptr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeshError {
    #[error("mesh has no vertices")]
    Empty,
    #[error("index count {0} is not a multiple of three")]
    IncompleteTriangle(usize),
    #[error("index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Positions and triangle indices, ready to be uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// The single triangle drawn by the app.
    pub fn triangle() -> Self {
        Self::new(
            vec![
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.0, 0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
            ],
            vec![0, 1, 2],
        )
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        if self.vertices.is_empty() {
            return Err(MeshError::Empty);
        }
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::IncompleteTriangle(self.indices.len()));
        }
        if let Some(&index) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.vertices.len())
        {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count: self.vertices.len(),
            });
        }
        Ok(())
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn stride() -> GLsizei {
        mem::size_of::<Vec3>() as GLsizei
    }
}

/// GPU side of a [`MeshData`]: one VAO with its vertex and element buffers.
pub struct TriangleMesh {
    vao: GLuint,
    vbo: GLuint,
    ebo: GLuint,
    index_count: GLsizei,
}

impl TriangleMesh {
    pub fn upload(data: &MeshData) -> Result<Self, MeshError> {
        data.validate()?;

        let vertices = data.vertex_bytes();
        let indices = data.index_bytes();
        let mut vao = 0;
        let mut vbo = 0;
        let mut ebo = 0;

        unsafe {
            gl::GenVertexArrays(1, &mut vao);
            gl::BindVertexArray(vao);

            gl::GenBuffers(1, &mut vbo);
            gl::BindBuffer(gl::ARRAY_BUFFER, vbo);
            gl::BufferData(
                gl::ARRAY_BUFFER,
                vertices.len() as GLsizeiptr,
                vertices.as_ptr() as *const _,
                gl::STATIC_DRAW,
            );

            gl::GenBuffers(1, &mut ebo);
            gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, ebo);
            gl::BufferData(
                gl::ELEMENT_ARRAY_BUFFER,
                indices.len() as GLsizeiptr,
                indices.as_ptr() as *const _,
                gl::STATIC_DRAW,
            );

            // Position attribute
            gl::EnableVertexAttribArray(0);
            gl::VertexAttribPointer(0, 3, gl::FLOAT, gl::FALSE, MeshData::stride(), ptr::null());

            // The element binding is VAO state, so the VAO goes first.
            gl::BindVertexArray(0);
            gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, 0);
            gl::BindBuffer(gl::ARRAY_BUFFER, 0);
        }

        debug!(
            "uploaded mesh: {} vertices, {} indices (vao {vao})",
            data.vertices.len(),
            data.indices.len()
        );

        Ok(Self {
            vao,
            vbo,
            ebo,
            index_count: data.indices.len() as GLsizei,
        })
    }

    pub fn draw(&self) {
        unsafe {
            gl::BindVertexArray(self.vao);
            gl::DrawElements(gl::TRIANGLES, self.index_count, gl::UNSIGNED_INT, ptr::null());
            gl::BindVertexArray(0);
        }
    }

    pub fn index_count(&self) -> GLsizei {
        self.index_count
    }
}

impl Drop for TriangleMesh {
    fn drop(&mut self) {
        unsafe {
            gl::BindBuffer(gl::ARRAY_BUFFER, 0);
            gl::BindVertexArray(0);
            gl::DeleteBuffers(1, &self.ebo);
            gl::DeleteBuffers(1, &self.vbo);
            gl::DeleteVertexArrays(1, &self.vao);
        }
    }
}
