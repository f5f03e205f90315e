//! Draw ranges and primitive types shared by the renderer.

/// Primitive topology used for drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveType {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    TriangleFan,
    PatchList,
}

/// Range of vertices and instances for a non-indexed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawRange {
    /// Number of vertices to draw.
    pub vertex_count: u32,
    /// Number of instances to draw.
    pub instance_count: u32,
    /// First vertex to draw.
    pub first_vertex: u32,
    /// First instance to draw.
    pub first_instance: u32,
}

impl DrawRange {
    /// Draw a single instance of `vertex_count` vertices.
    pub fn new(vertex_count: u32) -> Self {
        Self {
            vertex_count,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        }
    }

    /// Set the instance range.
    pub fn with_instances(mut self, first_instance: u32, instance_count: u32) -> Self {
        self.first_instance = first_instance;
        self.instance_count = instance_count;
        self
    }
}

/// Range of indices and instances for an indexed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawIndexedRange {
    /// Number of indices to draw.
    pub index_count: u32,
    /// Number of instances to draw.
    pub instance_count: u32,
    /// First index to draw.
    pub first_index: u32,
    /// Offset added to each index.
    pub vertex_offset: i32,
    /// First instance to draw.
    pub first_instance: u32,
}

impl DrawIndexedRange {
    /// Draw a single instance of `index_count` indices.
    pub fn new(index_count: u32) -> Self {
        Self {
            index_count,
            instance_count: 1,
            first_index: 0,
            vertex_offset: 0,
            first_instance: 0,
        }
    }
}
