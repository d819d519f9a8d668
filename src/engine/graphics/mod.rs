pub mod mesh;
pub mod pipeline_descriptor_set_layouts;
pub mod primitives;
pub mod render_assets;
pub mod render_state;
pub mod renderer;
pub mod scene_renderer;
pub mod vulkano_renderer;

#[cfg(test)]
pub(crate) mod test_support;


pub use mesh::{Bone, CpuMesh, CpuVertex, Model, ModelMesh};
pub use primitives::{
    Color, DirectionalLight, MeshEffect, MeshHandle, ScreenRect, TextureHandle, Viewport,
};
pub use render_assets::{AssetLoader, ContentManager};
pub use render_state::{BlendState, DepthStencilState, RenderState, SamplerState, SpriteScope};
pub use renderer::{MeshUploader, RenderDevice, TextureUploader};
pub use scene_renderer::{FrameTime, SceneRenderer};
pub use vulkano_renderer::VulkanoRenderer;
