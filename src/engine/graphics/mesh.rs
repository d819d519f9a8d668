//! CPU-side mesh data and loaded models.
//!
//! `CpuMesh` is staging data handed to a [`MeshUploader`](super::MeshUploader); the uploader
//! returns a `MeshHandle` that a [`ModelMesh`] keeps for the rest of the session.

use glam::Mat4;
use vulkano::buffer::BufferContents;
use vulkano::pipeline::graphics::vertex_input::Vertex;

use crate::engine::graphics::primitives::MeshHandle;

/// Vertex format consumed by the flat mesh pipeline.
#[derive(BufferContents, Vertex, Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct CpuVertex {
    #[format(R32G32B32_SFLOAT)]
    pub pos: [f32; 3],
    #[format(R32G32B32_SFLOAT)]
    pub normal: [f32; 3],
}

/// CPU-side mesh data.
///
/// Contract:
/// - `vertices` + `indices_u32` fully define a triangle list.
#[derive(Debug, Clone, Default)]
pub struct CpuMesh {
    pub vertices: Vec<CpuVertex>,
    pub indices_u32: Vec<u32>,
}

impl CpuMesh {
    pub fn new(vertices: Vec<CpuVertex>, indices_u32: Vec<u32>) -> Self {
        Self {
            vertices,
            indices_u32,
        }
    }

    pub fn index_count(&self) -> u32 {
        self.indices_u32.len() as u32
    }
}

/// One node of a model's skeleton.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bone {
    pub parent: Option<usize>,
    /// Transform relative to `parent`.
    pub local: Mat4,
}

/// A drawable part of a model, attached to one bone.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMesh {
    pub name: String,
    pub mesh: MeshHandle,
    pub parent_bone: usize,
}

/// Loaded 3D model: uploaded sub-meshes plus their bind-pose hierarchy.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    bones: Vec<Bone>,
    meshes: Vec<ModelMesh>,
    absolute_transforms: Vec<Mat4>,
}

impl Model {
    pub fn new(name: impl Into<String>, bones: Vec<Bone>, meshes: Vec<ModelMesh>) -> Self {
        let absolute_transforms = absolute_bone_transforms(&bones);
        Self {
            name: name.into(),
            bones,
            meshes,
            absolute_transforms,
        }
    }

    /// A model with a single identity bone and one mesh per handle.
    pub fn single_bone(name: impl Into<String>, meshes: impl IntoIterator<Item = MeshHandle>) -> Self {
        let name = name.into();
        let meshes = meshes
            .into_iter()
            .enumerate()
            .map(|(i, mesh)| ModelMesh {
                name: format!("{name}#{i}"),
                mesh,
                parent_bone: 0,
            })
            .collect();
        Self::new(
            name,
            vec![Bone {
                parent: None,
                local: Mat4::IDENTITY,
            }],
            meshes,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn meshes(&self) -> &[ModelMesh] {
        &self.meshes
    }

    /// Bind-pose transform of the bone a mesh hangs from.
    ///
    /// Out-of-range bones resolve to identity.
    pub fn bone_transform(&self, bone: usize) -> Mat4 {
        self.absolute_transforms
            .get(bone)
            .copied()
            .unwrap_or(Mat4::IDENTITY)
    }
}

/// Resolves each bone's local transform against its ancestors.
///
/// Parents may appear after their children in `bones`.
fn absolute_bone_transforms(bones: &[Bone]) -> Vec<Mat4> {
    let mut resolved: Vec<Option<Mat4>> = vec![None; bones.len()];

    for start in 0..bones.len() {
        // Walk up until we reach a resolved ancestor (or the root), then unwind.
        let mut chain = Vec::new();
        let mut cur = Some(start);
        while let Some(i) = cur {
            if i >= bones.len() || resolved[i].is_some() || chain.contains(&i) {
                break;
            }
            chain.push(i);
            cur = bones[i].parent;
        }

        let mut acc = cur
            .and_then(|i| resolved.get(i).copied().flatten())
            .unwrap_or(Mat4::IDENTITY);
        for &i in chain.iter().rev() {
            acc *= bones[i].local;
            resolved[i] = Some(acc);
        }
    }

    resolved
        .into_iter()
        .map(|m| m.unwrap_or(Mat4::IDENTITY))
        .collect()
}
