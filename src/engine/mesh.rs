// Procedural mesh types shared by the renderer and the obstacle geometry.
//
// PolyMesh is the authoring format: n-gon faces, CCW from outside. Scenery
// obstacles fan-triangulate it for ray tests; the renderer flattens it into a
// RenderMesh with per-face normals.

use glam::Vec3;

// ============================================================================
// GPU VERTEX
// ============================================================================

/// GPU-ready vertex with position and normal.
///   @location(0) position: vec3<f32>
///   @location(1) normal:   vec3<f32>
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal:   [f32; 3],
}

impl GpuVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

// ============================================================================
// POLY MESH
// ============================================================================

/// Polygon mesh with n-gon faces (CCW winding viewed from outside).
/// Not GPU-ready; use `triangulate_flat` to get a `RenderMesh`.
#[derive(Debug, Clone, Default)]
pub struct PolyMesh {
    pub positions: Vec<Vec3>,
    pub faces:     Vec<Vec<usize>>,
}

impl PolyMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, pos: Vec3) -> usize {
        let idx = self.positions.len();
        self.positions.push(pos);
        idx
    }

    /// Add a face by vertex indices (CCW order).
    pub fn add_face(&mut self, indices: Vec<usize>) {
        debug_assert!(indices.len() >= 3, "Face must have at least 3 vertices");
        self.faces.push(indices);
    }

    /// Fan-triangulate every face from its first vertex.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.faces.iter().flat_map(move |face| {
            (1..face.len().saturating_sub(1)).map(move |i| {
                [
                    self.positions[face[0]],
                    self.positions[face[i]],
                    self.positions[face[i + 1]],
                ]
            })
        })
    }
}

/// Axis-aligned cube of side 1 centred on the origin.
pub fn unit_cube() -> PolyMesh {
    let h = 0.5;
    let mut mesh = PolyMesh::new();
    for &(x, y, z) in &[
        (-h, -h, -h), ( h, -h, -h), ( h,  h, -h), (-h,  h, -h),
        (-h, -h,  h), ( h, -h,  h), ( h,  h,  h), (-h,  h,  h),
    ] {
        mesh.add_vertex(Vec3::new(x, y, z));
    }
    mesh.add_face(vec![4, 5, 6, 7]); // +Z
    mesh.add_face(vec![1, 0, 3, 2]); // -Z
    mesh.add_face(vec![5, 1, 2, 6]); // +X
    mesh.add_face(vec![0, 4, 7, 3]); // -X
    mesh.add_face(vec![7, 6, 2, 3]); // +Y
    mesh.add_face(vec![0, 1, 5, 4]); // -Y
    mesh
}

// ============================================================================
// RENDER MESH
// ============================================================================

/// GPU-ready triangulated mesh.
/// Upload vertex_bytes() to a VERTEX buffer, index_bytes() to an INDEX buffer.
pub struct RenderMesh {
    pub vertices: Vec<GpuVertex>,
    pub indices:  Vec<u32>,
}

impl RenderMesh {
    /// Cast vertex slice to raw bytes for wgpu buffer upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Cast index slice to raw bytes for wgpu buffer upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn index_count(&self) -> usize  { self.indices.len() }
}

// ============================================================================
// TRIANGULATION + FLAT NORMALS
// ============================================================================

/// Convert a PolyMesh to a RenderMesh with one normal per face.
///
/// Every face gets its own copy of its corner vertices so hard edges stay
/// hard (boxes would look like blobs with shared smooth normals). The face
/// normal is the sum of its fan triangles' cross products, which is already
/// area-weighted for non-planar n-gons.
pub fn triangulate_flat(poly: &PolyMesh) -> RenderMesh {
    let mut vertices: Vec<GpuVertex> = Vec::new();
    let mut indices:  Vec<u32>       = Vec::new();

    for face in &poly.faces {
        let n = face.len();
        if n < 3 {
            continue;
        }

        let mut normal = Vec3::ZERO;
        for i in 1..(n - 1) {
            let a = poly.positions[face[0]];
            let b = poly.positions[face[i]];
            let c = poly.positions[face[i + 1]];
            normal += (b - a).cross(c - a);
        }
        let normal = normal.normalize_or_zero().to_array();

        let base = vertices.len() as u32;
        vertices.extend(face.iter().map(|&idx| GpuVertex {
            position: poly.positions[idx].to_array(),
            normal,
        }));
        for i in 1..(n as u32 - 1) {
            indices.extend_from_slice(&[base, base + i, base + i + 1]);
        }
    }

    RenderMesh { vertices, indices }
}
