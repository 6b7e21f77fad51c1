//! The extruded letter "F": 16 quads split into 32 triangles, six vertices
//! per face, in separate position and normal streams.

use log::debug;
use once_cell::sync::Lazy;

use crate::error::GpuError;
use crate::gpu::{BufferHandle, BufferTarget, BufferUpload, UsageHint};
use crate::math::{self, Vector3};

/// Faces of the letter, each a quad drawn as two triangles.
pub const FACE_COUNT: usize = 16;
pub const VERTEX_COUNT: usize = FACE_COUNT * 6;
pub const TRIANGLE_COUNT: usize = VERTEX_COUNT / 3;

/// Immutable vertex data for the letter, centered on the origin with the
/// letter upright and its front facing +Z.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    positions: Vec<f32>,
    normals: Vec<f32>,
}

static MESH: Lazy<Mesh> = Lazy::new(Mesh::letter_f);

/// The letter mesh, built on first use and shared afterwards.
pub fn mesh() -> &'static Mesh {
    &MESH
}

impl Mesh {
    fn letter_f() -> Self {
        // Authored with the origin at the top-left front corner and Y down.
        let recenter = math::multiply(
            &math::x_rotation(std::f32::consts::PI),
            &math::translation(-50.0, -75.0, -15.0),
        );
        let positions = RAW_POSITIONS
            .chunks_exact(3)
            .flat_map(|p| {
                let authored = Vector3::new(p[0], p[1], p[2]);
                math::transform_point(&recenter, authored).to_array()
            })
            .collect();
        debug!("built letter mesh with {VERTEX_COUNT} vertices");
        Self {
            positions,
            normals: NORMALS.to_vec(),
        }
    }

    /// Flat `x, y, z` triples.
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Unit normals, one per vertex, parallel to [`positions`](Self::positions).
    pub fn normals(&self) -> &[f32] {
        &self.normals
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn position(&self, vertex: usize) -> Vector3 {
        let p = &self.positions[vertex * 3..vertex * 3 + 3];
        Vector3::new(p[0], p[1], p[2])
    }

    pub fn normal(&self, vertex: usize) -> Vector3 {
        let n = &self.normals[vertex * 3..vertex * 3 + 3];
        Vector3::new(n[0], n[1], n[2])
    }

    /// Creates a buffer holding the positions; leaves it bound to
    /// [`BufferTarget::Array`].
    pub fn upload_positions(&self, gpu: &mut impl BufferUpload) -> Result<BufferHandle, GpuError> {
        upload(gpu, &self.positions)
    }

    /// Creates a buffer holding the normals; leaves it bound to
    /// [`BufferTarget::Array`].
    pub fn upload_normals(&self, gpu: &mut impl BufferUpload) -> Result<BufferHandle, GpuError> {
        upload(gpu, &self.normals)
    }
}

fn upload(gpu: &mut impl BufferUpload, data: &[f32]) -> Result<BufferHandle, GpuError> {
    let buffer = gpu.create_buffer()?;
    let filled = gpu
        .bind_buffer(BufferTarget::Array, Some(buffer))
        .and_then(|()| gpu.buffer_data(BufferTarget::Array, data, UsageHint::StaticDraw));
    if let Err(err) = filled {
        gpu.delete_buffer(buffer);
        return Err(err);
    }
    Ok(buffer)
}

#[rustfmt::skip]
const RAW_POSITIONS: [f32; VERTEX_COUNT * 3] = [
    // left column front
    0.0, 0.0, 0.0, 0.0, 150.0, 0.0, 30.0, 0.0, 0.0,
    0.0, 150.0, 0.0, 30.0, 150.0, 0.0, 30.0, 0.0, 0.0,
    // top rung front
    30.0, 0.0, 0.0, 30.0, 30.0, 0.0, 100.0, 0.0, 0.0,
    30.0, 30.0, 0.0, 100.0, 30.0, 0.0, 100.0, 0.0, 0.0,
    // middle rung front
    30.0, 60.0, 0.0, 30.0, 90.0, 0.0, 67.0, 60.0, 0.0,
    30.0, 90.0, 0.0, 67.0, 90.0, 0.0, 67.0, 60.0, 0.0,
    // left column back
    0.0, 0.0, 30.0, 30.0, 0.0, 30.0, 0.0, 150.0, 30.0,
    0.0, 150.0, 30.0, 30.0, 0.0, 30.0, 30.0, 150.0, 30.0,
    // top rung back
    30.0, 0.0, 30.0, 100.0, 0.0, 30.0, 30.0, 30.0, 30.0,
    30.0, 30.0, 30.0, 100.0, 0.0, 30.0, 100.0, 30.0, 30.0,
    // middle rung back
    30.0, 60.0, 30.0, 67.0, 60.0, 30.0, 30.0, 90.0, 30.0,
    30.0, 90.0, 30.0, 67.0, 60.0, 30.0, 67.0, 90.0, 30.0,
    // top
    0.0, 0.0, 0.0, 100.0, 0.0, 0.0, 100.0, 0.0, 30.0,
    0.0, 0.0, 0.0, 100.0, 0.0, 30.0, 0.0, 0.0, 30.0,
    // top rung right
    100.0, 0.0, 0.0, 100.0, 30.0, 0.0, 100.0, 30.0, 30.0,
    100.0, 0.0, 0.0, 100.0, 30.0, 30.0, 100.0, 0.0, 30.0,
    // under top rung
    30.0, 30.0, 0.0, 30.0, 30.0, 30.0, 100.0, 30.0, 30.0,
    30.0, 30.0, 0.0, 100.0, 30.0, 30.0, 100.0, 30.0, 0.0,
    // between top rung and middle
    30.0, 30.0, 0.0, 30.0, 60.0, 30.0, 30.0, 30.0, 30.0,
    30.0, 30.0, 0.0, 30.0, 60.0, 0.0, 30.0, 60.0, 30.0,
    // top of middle rung
    30.0, 60.0, 0.0, 67.0, 60.0, 30.0, 30.0, 60.0, 30.0,
    30.0, 60.0, 0.0, 67.0, 60.0, 0.0, 67.0, 60.0, 30.0,
    // right of middle rung
    67.0, 60.0, 0.0, 67.0, 90.0, 30.0, 67.0, 60.0, 30.0,
    67.0, 60.0, 0.0, 67.0, 90.0, 0.0, 67.0, 90.0, 30.0,
    // bottom of middle rung
    30.0, 90.0, 0.0, 30.0, 90.0, 30.0, 67.0, 90.0, 30.0,
    30.0, 90.0, 0.0, 67.0, 90.0, 30.0, 67.0, 90.0, 0.0,
    // right of bottom
    30.0, 90.0, 0.0, 30.0, 150.0, 30.0, 30.0, 90.0, 30.0,
    30.0, 90.0, 0.0, 30.0, 150.0, 0.0, 30.0, 150.0, 30.0,
    // bottom
    0.0, 150.0, 0.0, 0.0, 150.0, 30.0, 30.0, 150.0, 30.0,
    0.0, 150.0, 0.0, 30.0, 150.0, 30.0, 30.0, 150.0, 0.0,
    // left side
    0.0, 0.0, 0.0, 0.0, 0.0, 30.0, 0.0, 150.0, 30.0,
    0.0, 0.0, 0.0, 0.0, 150.0, 30.0, 0.0, 150.0, 0.0,
];

#[rustfmt::skip]
const NORMALS: [f32; VERTEX_COUNT * 3] = [
    // left column front
    0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0,
    0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0,
    // top rung front
    0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0,
    0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0,
    // middle rung front
    0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0,
    0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0,
    // left column back
    0.0, 0.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, -1.0,
    0.0, 0.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, -1.0,
    // top rung back
    0.0, 0.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, -1.0,
    0.0, 0.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, -1.0,
    // middle rung back
    0.0, 0.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, -1.0,
    0.0, 0.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, -1.0,
    // top
    0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0,
    0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0,
    // top rung right
    1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0,
    1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0,
    // under top rung
    0.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, -1.0, 0.0,
    0.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, -1.0, 0.0,
    // between top rung and middle
    1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0,
    1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0,
    // top of middle rung
    0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0,
    0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0,
    // right of middle rung
    1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0,
    1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0,
    // bottom of middle rung
    0.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, -1.0, 0.0,
    0.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, -1.0, 0.0,
    // right of bottom
    1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0,
    1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0,
    // bottom
    0.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, -1.0, 0.0,
    0.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, -1.0, 0.0,
    // left side
    -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0,
    -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::recording::FaultPoint;
    use crate::gpu::{GpuCommand, RecordingGpu};

    #[test]
    fn arrays_are_parallel_and_complete() {
        let mesh = mesh();
        assert_eq!(mesh.positions().len(), 288);
        assert_eq!(mesh.normals().len(), mesh.positions().len());
        assert_eq!(mesh.vertex_count(), 96);
        assert_eq!(TRIANGLE_COUNT, 32);
    }

    #[test]
    fn vertex_accessors_read_matching_triples() {
        let mesh = mesh();
        let last = mesh.vertex_count() - 1;
        assert_eq!(mesh.position(last).to_array(), mesh.positions()[last * 3..]);
        assert_eq!(mesh.normal(last).to_array(), mesh.normals()[last * 3..]);
    }

    #[test]
    fn normals_are_unit_axis_vectors() {
        let mesh = mesh();
        for vertex in 0..mesh.vertex_count() {
            let n = mesh.normal(vertex);
            assert!((n.length() - 1.0).abs() < 1e-6, "vertex {vertex}: {n:?}");
        }
    }

    #[test]
    fn letter_is_centered_and_upright() {
        let mesh = mesh();
        let mut min = Vector3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Vector3::new(f32::MIN, f32::MIN, f32::MIN);
        for vertex in 0..mesh.vertex_count() {
            let p = mesh.position(vertex);
            min = Vector3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Vector3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        assert!((min.x + 50.0).abs() < 1e-4 && (max.x - 50.0).abs() < 1e-4);
        assert!((min.y + 75.0).abs() < 1e-4 && (max.y - 75.0).abs() < 1e-4);
        assert!((min.z + 15.0).abs() < 1e-4 && (max.z - 15.0).abs() < 1e-4);

        // The first vertex is the top-left front corner of the left column.
        let corner = mesh.position(0);
        assert!((corner.x + 50.0).abs() < 1e-4);
        assert!((corner.y - 75.0).abs() < 1e-4);
        assert!((corner.z - 15.0).abs() < 1e-4);
    }

    #[test]
    fn triangles_wind_counter_clockwise_around_their_normals() {
        let mesh = mesh();
        for triangle in 0..TRIANGLE_COUNT {
            let [a, b, c] = [0, 1, 2].map(|i| mesh.position(triangle * 3 + i));
            let face = (b - a).cross(c - a);
            let normal = mesh.normal(triangle * 3);
            assert!(face.dot(normal) > 0.0, "triangle {triangle} faces inward");
        }
    }

    #[test]
    fn mesh_is_built_once() {
        assert!(std::ptr::eq(mesh(), mesh()));
    }

    #[test]
    fn failed_upload_deletes_the_buffer() {
        let mut gpu = RecordingGpu::default();
        gpu.fail_next(FaultPoint::BufferData);
        assert!(mesh().upload_normals(&mut gpu).is_err());
        assert_eq!(gpu.live_buffers(), 0);
    }

    #[test]
    fn upload_uses_static_buffers() {
        let mut gpu = RecordingGpu::default();
        let positions = mesh().upload_positions(&mut gpu).unwrap();
        let normals = mesh().upload_normals(&mut gpu).unwrap();
        assert_ne!(positions, normals);
        assert_eq!(gpu.buffer_contents(positions), Some(mesh().positions()));
        assert_eq!(gpu.buffer_contents(normals), Some(mesh().normals()));
        assert!(gpu.commands().contains(&GpuCommand::BufferData {
            target: BufferTarget::Array,
            len: 288,
            usage: UsageHint::StaticDraw,
        }));
    }
}
