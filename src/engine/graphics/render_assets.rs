use std::path::PathBuf;

use glam::Mat4;

use crate::engine::graphics::MeshUploader;
use crate::engine::graphics::mesh::{Bone, CpuMesh, CpuVertex, Model, ModelMesh};
use crate::engine::video::Video;
use crate::engine::{AssetKind, EngineError, EngineResult};

/// Resolves logical asset names (e.g. `Models/arena`) into loaded assets.
///
/// A missing asset is an error; callers treat it as fatal.
pub trait AssetLoader {
    fn load_model(&mut self, uploader: &mut dyn MeshUploader, name: &str) -> EngineResult<Model>;

    fn load_video(&mut self, name: &str) -> EngineResult<Video>;
}

/// Filesystem content root.
///
/// Layout:
/// - models: `<root>/<name>.glb` or `<root>/<name>.gltf`
/// - videos: `<root>/<name>/` holding frame images (see [`Video::open`])
#[derive(Debug, Clone)]
pub struct ContentManager {
    root: PathBuf,
}

impl ContentManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve_model(&self, name: &str) -> Option<PathBuf> {
        ["glb", "gltf"]
            .iter()
            .map(|ext| self.root.join(format!("{name}.{ext}")))
            .find(|p| p.is_file())
    }
}

impl AssetLoader for ContentManager {
    fn load_model(&mut self, uploader: &mut dyn MeshUploader, name: &str) -> EngineResult<Model> {
        let path = self.resolve_model(name).ok_or_else(|| EngineError::AssetNotFound {
            kind: AssetKind::Model,
            name: name.to_string(),
            root: self.root.clone(),
        })?;

        let (document, buffers, _images) =
            gltf::import(&path).map_err(|source| EngineError::ModelImport {
                name: name.to_string(),
                source,
            })?;

        let mut bones: Vec<Bone> = document
            .nodes()
            .map(|node| Bone {
                parent: None,
                local: Mat4::from_cols_array_2d(&node.transform().matrix()),
            })
            .collect();
        for node in document.nodes() {
            for child in node.children() {
                bones[child.index()].parent = Some(node.index());
            }
        }

        let mut meshes = Vec::new();
        for node in document.nodes() {
            let Some(mesh) = node.mesh() else {
                continue;
            };
            let mesh_name = mesh.name().unwrap_or(name);
            for (i, primitive) in mesh.primitives().enumerate() {
                let cpu_mesh = extract_primitive(name, &primitive, &buffers)?;
                let handle = uploader.upload_mesh(&cpu_mesh)?;
                meshes.push(ModelMesh {
                    name: format!("{mesh_name}#{i}"),
                    mesh: handle,
                    parent_bone: node.index(),
                });
            }
        }

        log::debug!(
            "loaded model '{name}' from {}: {} bones, {} meshes",
            path.display(),
            bones.len(),
            meshes.len()
        );

        Ok(Model::new(name, bones, meshes))
    }

    fn load_video(&mut self, name: &str) -> EngineResult<Video> {
        let video = Video::open(name, &self.root.join(name))?;
        log::debug!(
            "loaded video '{name}': {} frames @ {} fps",
            video.frame_count(),
            video.frames_per_second()
        );
        Ok(video)
    }
}

/// Pulls positions, normals and indices out of one glTF primitive.
///
/// Missing normals default to +Y; missing indices to a plain triangle list.
fn extract_primitive(
    model: &str,
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> EngineResult<CpuMesh> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| EngineError::MissingPositions(model.to_string()))?
        .collect();

    let normals: Vec<[f32; 3]> = reader
        .read_normals()
        .map(|n| n.collect())
        .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);

    let indices: Vec<u32> = reader
        .read_indices()
        .map(|i| i.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());

    let vertices = positions
        .iter()
        .zip(normals.iter().chain(std::iter::repeat(&[0.0, 1.0, 0.0])))
        .map(|(&pos, &normal)| CpuVertex { pos, normal })
        .collect();

    Ok(CpuMesh::new(vertices, indices))
}
