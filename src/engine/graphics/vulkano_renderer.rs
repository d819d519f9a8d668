use std::sync::Arc;

use glam::{Mat4, Vec3};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::engine::graphics::mesh::CpuMesh;
use crate::engine::graphics::primitives::{
    Color, MeshEffect, MeshHandle, ScreenRect, TextureHandle, Viewport,
};
use crate::engine::graphics::render_state::{
    BlendState, DepthStencilState, RenderState, SPRITE_SAMPLER_SLOT, SamplerState,
};
use crate::engine::graphics::{MeshUploader, RenderDevice, TextureUploader};
use crate::engine::{EngineError, EngineResult};

use vulkano_backend::{
    DrawCommand, MeshPushConstants, PipelineKey, PipelineKind, SpritePushConstants,
};

mod vulkano_backend {
    use std::collections::HashMap;
    use std::mem::size_of;
    use std::sync::Arc;

    use crate::engine::graphics::mesh::{CpuMesh, CpuVertex};
    use crate::engine::graphics::pipeline_descriptor_set_layouts::PipelineDescriptorSetLayouts;
    use crate::engine::graphics::primitives::{Color, MeshHandle, TextureHandle};
    use crate::engine::graphics::render_state::{BlendState, DepthStencilState, SamplerState};
    use vulkano::buffer::{Buffer, BufferContents, BufferCreateInfo, BufferUsage, Subbuffer};
    use vulkano::command_buffer::{
        AutoCommandBufferBuilder, CommandBufferUsage, CopyBufferInfo, CopyBufferToImageInfo,
        PrimaryAutoCommandBuffer, PrimaryCommandBufferAbstract, RenderPassBeginInfo,
        SubpassBeginInfo, SubpassEndInfo, allocator::StandardCommandBufferAllocator,
    };
    use vulkano::descriptor_set::allocator::StandardDescriptorSetAllocator;
    use vulkano::descriptor_set::{DescriptorSet, WriteDescriptorSet};
    use vulkano::device::DeviceOwned;
    use vulkano::format::{ClearValue, Format};
    use vulkano::image::sampler::{Filter, Sampler, SamplerAddressMode, SamplerCreateInfo};
    use vulkano::image::view::ImageView;
    use vulkano::image::{Image, ImageCreateInfo, ImageType, ImageUsage};
    use vulkano::memory::allocator::{
        AllocationCreateInfo, MemoryTypeFilter, StandardMemoryAllocator,
    };
    use vulkano::pipeline::graphics::GraphicsPipelineCreateInfo;
    use vulkano::pipeline::graphics::color_blend::{
        AttachmentBlend, BlendFactor, BlendOp, ColorBlendAttachmentState, ColorBlendState,
        ColorComponents,
    };
    use vulkano::pipeline::graphics::depth_stencil::{
        DepthState, DepthStencilState as VkDepthStencilState,
    };
    use vulkano::pipeline::graphics::input_assembly::InputAssemblyState;
    use vulkano::pipeline::graphics::multisample::MultisampleState;
    use vulkano::pipeline::graphics::rasterization::RasterizationState;
    use vulkano::pipeline::graphics::subpass::PipelineSubpassType;
    use vulkano::pipeline::graphics::vertex_input::{
        VertexInputAttributeDescription, VertexInputBindingDescription, VertexInputRate,
        VertexInputState,
    };
    use vulkano::pipeline::graphics::viewport::{Scissor, Viewport, ViewportState};
    use vulkano::pipeline::layout::{PipelineLayout, PipelineLayoutCreateInfo};
    use vulkano::pipeline::{
        DynamicState, GraphicsPipeline, Pipeline, PipelineBindPoint, PipelineShaderStageCreateInfo,
    };
    use vulkano::render_pass::{Framebuffer, FramebufferCreateInfo, RenderPass, Subpass};
    use vulkano::shader::ShaderModule;
    use vulkano::swapchain::{self, Surface, Swapchain, SwapchainCreateInfo, SwapchainPresentInfo};
    use vulkano::sync::{self, GpuFuture};
    use vulkano::{DeviceSize, Validated, VulkanError};
    use vulkano_util::context::{VulkanoConfig, VulkanoContext};
    use winit::window::Window;

    type BackendResult<T> = Result<T, Box<dyn std::error::Error>>;

    const DEPTH_FORMAT: Format = Format::D16_UNORM;

    mod flat_mesh_vs {
        vulkano_shaders::shader! {
            ty: "vertex",
            path: "assets/shaders/flat-mesh.vert",
        }
    }

    mod flat_mesh_fs {
        vulkano_shaders::shader! {
            ty: "fragment",
            path: "assets/shaders/flat-mesh.frag",
        }
    }

    mod sprite_vs {
        vulkano_shaders::shader! {
            ty: "vertex",
            path: "assets/shaders/sprite.vert",
        }
    }

    mod sprite_fs {
        vulkano_shaders::shader! {
            ty: "fragment",
            path: "assets/shaders/sprite.frag",
        }
    }

    #[derive(BufferContents, Clone, Copy, Debug, Default)]
    #[repr(C)]
    pub struct MeshPushConstants {
        pub mvp: [[f32; 4]; 4],
        pub diffuse: [f32; 4],
        // xyz in object space; zero disables shading.
        pub light_dir: [f32; 4],
        pub light_color: [f32; 4],
    }

    #[derive(BufferContents, Clone, Copy, Debug, Default)]
    #[repr(C)]
    pub struct SpritePushConstants {
        // Clip-space left, top, right, bottom.
        pub rect: [f32; 4],
        pub tint: [f32; 4],
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum PipelineKind {
        Mesh,
        Sprite,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineKey {
        pub kind: PipelineKind,
        pub blend: BlendState,
        pub depth_stencil: DepthStencilState,
    }

    impl PipelineKey {
        fn all() -> impl Iterator<Item = PipelineKey> {
            [PipelineKind::Mesh, PipelineKind::Sprite]
                .into_iter()
                .flat_map(|kind| {
                    [BlendState::Opaque, BlendState::AlphaBlend]
                        .into_iter()
                        .flat_map(move |blend| {
                            [DepthStencilState::Default, DepthStencilState::None]
                                .into_iter()
                                .map(move |depth_stencil| PipelineKey {
                                    kind,
                                    blend,
                                    depth_stencil,
                                })
                        })
                })
        }
    }

    /// One recorded draw, replayed into a command buffer at present time.
    #[derive(Debug, Clone, Copy)]
    pub enum DrawCommand {
        Mesh {
            mesh: MeshHandle,
            pipeline: PipelineKey,
            push: MeshPushConstants,
        },
        Sprite {
            texture: TextureHandle,
            pipeline: PipelineKey,
            sampler: SamplerState,
            push: SpritePushConstants,
        },
    }

    pub struct VulkanoGpuMesh {
        pub vertices: Subbuffer<[CpuVertex]>,
        pub indices: Subbuffer<[u32]>,
        pub index_count: u32,
    }

    pub struct VulkanoGpuTexture {
        pub view: Arc<ImageView>,
    }

    pub struct VulkanoState {
        pub context: VulkanoContext,
        pub window: Arc<Window>,
        pub swapchain: Arc<Swapchain>,
        pub render_pass: Arc<RenderPass>,
        pub framebuffers: Vec<Arc<Framebuffer>>,

        pub command_buffer_allocator: Arc<StandardCommandBufferAllocator>,
        pub descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
        pub set_layouts: PipelineDescriptorSetLayouts,

        pub meshes: HashMap<MeshHandle, VulkanoGpuMesh>,
        pub textures: HashMap<TextureHandle, VulkanoGpuTexture>,
        pub samplers: HashMap<SamplerState, Arc<Sampler>>,
        pub pipelines: HashMap<PipelineKey, Arc<GraphicsPipeline>>,

        pub window_resized: bool,
        pub recreate_swapchain: bool,
        pub previous_frame_end: Option<Box<dyn GpuFuture>>,
    }

    impl VulkanoState {
        pub fn new(window: Arc<Window>) -> BackendResult<Self> {
            let context = VulkanoContext::new(VulkanoConfig::default());
            let device = context.device().clone();

            let surface = Surface::from_window(device.instance().clone(), window.clone())?;

            let surface_capabilities = device
                .physical_device()
                .surface_capabilities(&surface, Default::default())?;
            let image_format = device
                .physical_device()
                .surface_formats(&surface, Default::default())?
                .first()
                .ok_or("no supported surface formats")?
                .0;

            let mut min_image_count = 2u32.max(surface_capabilities.min_image_count);
            if let Some(max_image_count) = surface_capabilities.max_image_count {
                min_image_count = min_image_count.min(max_image_count);
            }

            let (swapchain, images) = Swapchain::new(
                device.clone(),
                surface,
                SwapchainCreateInfo {
                    min_image_count,
                    image_format,
                    image_extent: window.inner_size().into(),
                    image_usage: ImageUsage::COLOR_ATTACHMENT,
                    composite_alpha: surface_capabilities
                        .supported_composite_alpha
                        .into_iter()
                        .next()
                        .ok_or("no supported composite alpha")?,
                    ..Default::default()
                },
            )?;

            let render_pass = vulkano::single_pass_renderpass!(
                device.clone(),
                attachments: {
                    color: {
                        format: swapchain.image_format(),
                        samples: 1,
                        load_op: Clear,
                        store_op: Store,
                    },
                    depth: {
                        format: DEPTH_FORMAT,
                        samples: 1,
                        load_op: Clear,
                        store_op: DontCare,
                    },
                },
                pass: {
                    color: [color],
                    depth_stencil: {depth},
                }
            )?;

            let framebuffers = Self::create_framebuffers(
                context.memory_allocator(),
                &render_pass,
                images,
            )?;

            let set_layouts = PipelineDescriptorSetLayouts::new(device.clone())?;

            let flat_vs = flat_mesh_vs::load(device.clone())?;
            let flat_fs = flat_mesh_fs::load(device.clone())?;
            let sprite_vs = sprite_vs::load(device.clone())?;
            let sprite_fs = sprite_fs::load(device.clone())?;

            let mesh_layout = PipelineLayout::new(
                device.clone(),
                PipelineLayoutCreateInfo {
                    push_constant_ranges: PipelineDescriptorSetLayouts::push_constants(
                        size_of::<MeshPushConstants>() as u32,
                    ),
                    ..Default::default()
                },
            )?;
            let sprite_layout = PipelineLayout::new(
                device.clone(),
                PipelineLayoutCreateInfo {
                    set_layouts: vec![set_layouts.sprite.clone()],
                    push_constant_ranges: PipelineDescriptorSetLayouts::push_constants(
                        size_of::<SpritePushConstants>() as u32,
                    ),
                    ..Default::default()
                },
            )?;

            let subpass = Subpass::from(render_pass.clone(), 0).ok_or("missing subpass 0")?;
            let mut pipelines = HashMap::new();
            for key in PipelineKey::all() {
                let (vs, fs, layout) = match key.kind {
                    PipelineKind::Mesh => (&flat_vs, &flat_fs, &mesh_layout),
                    PipelineKind::Sprite => (&sprite_vs, &sprite_fs, &sprite_layout),
                };
                let pipeline =
                    Self::create_pipeline(key, vs, fs, layout.clone(), subpass.clone())?;
                pipelines.insert(key, pipeline);
            }

            let command_buffer_allocator = Arc::new(StandardCommandBufferAllocator::new(
                device.clone(),
                Default::default(),
            ));

            let descriptor_set_allocator = Arc::new(StandardDescriptorSetAllocator::new(
                device.clone(),
                Default::default(),
            ));

            let mut samplers = HashMap::new();
            for state in [
                SamplerState::LinearWrap,
                SamplerState::LinearClamp,
                SamplerState::PointClamp,
            ] {
                samplers.insert(state, Sampler::new(device.clone(), sampler_info(state))?);
            }

            Ok(Self {
                context,
                window,
                swapchain,
                render_pass,
                framebuffers,

                command_buffer_allocator,
                descriptor_set_allocator,
                set_layouts,

                meshes: HashMap::new(),
                textures: HashMap::new(),
                samplers,
                pipelines,

                window_resized: false,
                recreate_swapchain: false,
                previous_frame_end: Some(sync::now(device).boxed()),
            })
        }

        fn create_pipeline(
            key: PipelineKey,
            vs: &Arc<ShaderModule>,
            fs: &Arc<ShaderModule>,
            layout: Arc<PipelineLayout>,
            subpass: Subpass,
        ) -> BackendResult<Arc<GraphicsPipeline>> {
            let device = layout.device().clone();
            let stages = vec![
                PipelineShaderStageCreateInfo::new(
                    vs.entry_point("main").ok_or("missing vertex entry point")?,
                ),
                PipelineShaderStageCreateInfo::new(
                    fs.entry_point("main").ok_or("missing fragment entry point")?,
                ),
            ];

            // Sprites generate their quad from `gl_VertexIndex`.
            let vertex_input_state = match key.kind {
                PipelineKind::Mesh => VertexInputState::new()
                    .binding(
                        0,
                        VertexInputBindingDescription {
                            stride: size_of::<CpuVertex>() as u32,
                            input_rate: VertexInputRate::Vertex,
                            ..Default::default()
                        },
                    )
                    .attribute(
                        0,
                        VertexInputAttributeDescription {
                            binding: 0,
                            format: Format::R32G32B32_SFLOAT,
                            offset: 0,
                            ..Default::default()
                        },
                    )
                    .attribute(
                        1,
                        VertexInputAttributeDescription {
                            binding: 0,
                            format: Format::R32G32B32_SFLOAT,
                            offset: 12,
                            ..Default::default()
                        },
                    ),
                PipelineKind::Sprite => VertexInputState::new(),
            };

            let depth = match key.depth_stencil {
                DepthStencilState::Default => Some(DepthState::simple()),
                DepthStencilState::None => None,
            };

            let blend = match key.blend {
                BlendState::Opaque => None,
                // Straight alpha: out.rgb = src.rgb * src.a + dst.rgb * (1 - src.a)
                BlendState::AlphaBlend => Some(AttachmentBlend {
                    src_color_blend_factor: BlendFactor::SrcAlpha,
                    dst_color_blend_factor: BlendFactor::OneMinusSrcAlpha,
                    color_blend_op: BlendOp::Add,
                    src_alpha_blend_factor: BlendFactor::One,
                    dst_alpha_blend_factor: BlendFactor::OneMinusSrcAlpha,
                    alpha_blend_op: BlendOp::Add,
                }),
            };

            let mut pipeline_ci = GraphicsPipelineCreateInfo::layout(layout);
            pipeline_ci.stages = stages.into();
            pipeline_ci.vertex_input_state = Some(vertex_input_state);
            pipeline_ci.input_assembly_state = Some(InputAssemblyState::default());
            pipeline_ci.viewport_state = Some(ViewportState::default());
            pipeline_ci.rasterization_state = Some(RasterizationState::default());
            pipeline_ci.multisample_state = Some(MultisampleState::default());
            pipeline_ci.depth_stencil_state = Some(VkDepthStencilState {
                depth,
                ..Default::default()
            });
            pipeline_ci.color_blend_state = Some(ColorBlendState::with_attachment_states(
                1,
                ColorBlendAttachmentState {
                    blend,
                    color_write_enable: true,
                    color_write_mask: ColorComponents::all(),
                },
            ));
            pipeline_ci.dynamic_state = [DynamicState::Viewport, DynamicState::Scissor]
                .into_iter()
                .collect();
            pipeline_ci.subpass = Some(PipelineSubpassType::BeginRenderPass(subpass));

            Ok(GraphicsPipeline::new(device, None, pipeline_ci)?)
        }

        /// One framebuffer per swapchain image, sharing a single depth buffer.
        fn create_framebuffers(
            memory_allocator: &Arc<StandardMemoryAllocator>,
            render_pass: &Arc<RenderPass>,
            images: Vec<Arc<Image>>,
        ) -> BackendResult<Vec<Arc<Framebuffer>>> {
            let extent = images.first().ok_or("swapchain has no images")?.extent();
            let depth = Image::new(
                memory_allocator.clone(),
                ImageCreateInfo {
                    image_type: ImageType::Dim2d,
                    format: DEPTH_FORMAT,
                    extent,
                    usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::TRANSIENT_ATTACHMENT,
                    ..Default::default()
                },
                AllocationCreateInfo::default(),
            )?;
            let depth_view = ImageView::new_default(depth)?;

            images
                .into_iter()
                .map(|image| -> BackendResult<Arc<Framebuffer>> {
                    let view = ImageView::new_default(image)?;
                    Ok(Framebuffer::new(
                        render_pass.clone(),
                        FramebufferCreateInfo {
                            attachments: vec![view, depth_view.clone()],
                            ..Default::default()
                        },
                    )?)
                })
                .collect()
        }

        pub fn extent(&self) -> [u32; 2] {
            self.swapchain.image_extent()
        }

        fn recreate_swapchain_if_needed(&mut self) -> BackendResult<()> {
            if !(self.window_resized || self.recreate_swapchain) {
                return Ok(());
            }

            self.recreate_swapchain = false;
            let new_dimensions = self.window.inner_size();
            if new_dimensions.width == 0 || new_dimensions.height == 0 {
                // Avoid recreating with a zero-sized swapchain while minimized.
                return Ok(());
            }

            let (new_swapchain, new_images) = match self.swapchain.recreate(SwapchainCreateInfo {
                image_extent: new_dimensions.into(),
                ..self.swapchain.create_info()
            }) {
                Ok(r) => r,
                Err(e) => {
                    self.recreate_swapchain = true;
                    log::warn!("failed to recreate swapchain: {}", Validated::unwrap(e));
                    return Ok(());
                }
            };

            self.swapchain = new_swapchain;
            self.framebuffers = Self::create_framebuffers(
                self.context.memory_allocator(),
                &self.render_pass,
                new_images,
            )?;
            log::debug!(
                "swapchain recreated at {}x{}",
                new_dimensions.width,
                new_dimensions.height
            );

            self.window_resized = false;
            Ok(())
        }

        /// Replays `commands` into one render pass and presents it.
        pub fn render_frame(
            &mut self,
            clear_color: Color,
            commands: &[DrawCommand],
        ) -> BackendResult<()> {
            self.recreate_swapchain_if_needed()?;

            let size = self.window.inner_size();
            if size.width == 0 || size.height == 0 {
                return Ok(());
            }

            let device = self.context.device().clone();
            let queue = self.context.graphics_queue().clone();

            if let Some(previous_frame_end) = self.previous_frame_end.as_mut() {
                previous_frame_end.cleanup_finished();
            }

            let (image_i, suboptimal, acquire_future) =
                match swapchain::acquire_next_image(self.swapchain.clone(), None)
                    .map_err(Validated::unwrap)
                {
                    Ok(r) => r,
                    Err(VulkanError::OutOfDate) => {
                        self.recreate_swapchain = true;
                        return Ok(());
                    }
                    Err(e) => return Err(Box::new(e)),
                };

            if suboptimal {
                self.recreate_swapchain = true;
            }

            let framebuffer = self.framebuffers[image_i as usize].clone();
            let mut render_pass_begin = RenderPassBeginInfo::framebuffer(framebuffer);
            render_pass_begin.clear_values = vec![
                Some(ClearValue::from(clear_color.rgba)),
                Some(ClearValue::Depth(1.0)),
            ];

            let extent = self.swapchain.image_extent();
            let viewport = Viewport {
                offset: [0.0, 0.0],
                extent: [extent[0] as f32, extent[1] as f32],
                depth_range: 0.0..=1.0,
                ..Default::default()
            };

            let mut cbb = AutoCommandBufferBuilder::primary(
                self.command_buffer_allocator.clone(),
                queue.queue_family_index(),
                CommandBufferUsage::OneTimeSubmit,
            )?;

            cbb.begin_render_pass(render_pass_begin, SubpassBeginInfo::default())?;
            cbb.set_viewport(0, vec![viewport].into())?;
            cbb.set_scissor(
                0,
                vec![Scissor {
                    offset: [0, 0],
                    extent,
                    ..Default::default()
                }]
                .into(),
            )?;

            self.record_commands(&mut cbb, commands)?;

            cbb.end_render_pass(SubpassEndInfo::default())?;

            let cb = cbb.build()?;

            let start_future: Box<dyn GpuFuture> = self
                .previous_frame_end
                .take()
                .unwrap_or_else(|| sync::now(device.clone()).boxed());

            let execution = start_future
                .join(acquire_future)
                .then_execute(queue.clone(), cb)?
                .then_swapchain_present(
                    queue.clone(),
                    SwapchainPresentInfo::swapchain_image_index(self.swapchain.clone(), image_i),
                )
                .then_signal_fence_and_flush();

            match execution.map_err(Validated::unwrap) {
                Ok(future) => {
                    self.previous_frame_end = Some(future.boxed());
                }
                Err(VulkanError::OutOfDate) => {
                    self.recreate_swapchain = true;
                    self.previous_frame_end = Some(sync::now(device).boxed());
                }
                Err(e) => {
                    log::warn!("failed to flush frame: {e}");
                    self.previous_frame_end = Some(sync::now(device).boxed());
                }
            }

            Ok(())
        }

        fn record_commands(
            &self,
            cbb: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
            commands: &[DrawCommand],
        ) -> BackendResult<()> {
            let mut bound: Option<PipelineKey> = None;

            for command in commands {
                let key = match command {
                    DrawCommand::Mesh { pipeline, .. } | DrawCommand::Sprite { pipeline, .. } => {
                        *pipeline
                    }
                };
                let pipeline = self
                    .pipelines
                    .get(&key)
                    .ok_or("no pipeline for render state")?;
                if bound != Some(key) {
                    cbb.bind_pipeline_graphics(pipeline.clone())?;
                    bound = Some(key);
                }

                match command {
                    DrawCommand::Mesh { mesh, push, .. } => {
                        let Some(mesh) = self.meshes.get(mesh) else {
                            continue;
                        };
                        cbb.push_constants(pipeline.layout().clone(), 0, *push)?;
                        cbb.bind_vertex_buffers(0, mesh.vertices.clone())?;
                        cbb.bind_index_buffer(mesh.indices.clone())?;
                        unsafe {
                            cbb.draw_indexed(mesh.index_count, 1, 0, 0, 0)?;
                        }
                    }
                    DrawCommand::Sprite {
                        texture,
                        sampler,
                        push,
                        ..
                    } => {
                        // Released or never uploaded: nothing to sample.
                        let Some(tex) = self.textures.get(texture) else {
                            continue;
                        };
                        let sampler = self
                            .samplers
                            .get(sampler)
                            .ok_or("no sampler for sampler state")?;
                        let set = DescriptorSet::new(
                            self.descriptor_set_allocator.clone(),
                            self.set_layouts.sprite.clone(),
                            [WriteDescriptorSet::image_view_sampler(
                                0,
                                tex.view.clone(),
                                sampler.clone(),
                            )],
                            [],
                        )?;
                        cbb.bind_descriptor_sets(
                            PipelineBindPoint::Graphics,
                            pipeline.layout().clone(),
                            0,
                            set,
                        )?;
                        cbb.push_constants(pipeline.layout().clone(), 0, *push)?;
                        unsafe {
                            cbb.draw(6, 1, 0, 0)?;
                        }
                    }
                }
            }

            Ok(())
        }

        pub fn upload_texture_rgba8(
            &mut self,
            handle: TextureHandle,
            rgba: &[u8],
            width: u32,
            height: u32,
        ) -> BackendResult<()> {
            if width == 0 || height == 0 {
                return Err("texture has zero size".into());
            }

            let expected_len = width as usize * height as usize * 4;
            if rgba.len() != expected_len {
                return Err(format!(
                    "texture rgba length mismatch: got={}, expected={}",
                    rgba.len(),
                    expected_len
                )
                .into());
            }

            let memory_allocator = self.context.memory_allocator().clone();
            let queue = self.context.graphics_queue().clone();

            let staging = Buffer::from_iter(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::TRANSFER_SRC,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_HOST
                        | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                    ..Default::default()
                },
                rgba.iter().copied(),
            )?;

            let image = Image::new(
                memory_allocator,
                ImageCreateInfo {
                    image_type: ImageType::Dim2d,
                    format: Format::R8G8B8A8_UNORM,
                    extent: [width, height, 1],
                    usage: ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
                    ..Default::default()
                },
            )?;

            let mut cbb = AutoCommandBufferBuilder::primary(
                self.command_buffer_allocator.clone(),
                queue.queue_family_index(),
                CommandBufferUsage::OneTimeSubmit,
            )?;

            cbb.copy_buffer_to_image(CopyBufferToImageInfo::buffer_image(staging, image.clone()))?;

            let cb = cbb.build()?;

            cb.execute(queue.clone())?
                .then_signal_fence_and_flush()?
                .wait(None)?;

            let view = ImageView::new_default(image)?;
            self.textures.insert(handle, VulkanoGpuTexture { view });
            Ok(())
        }

        pub fn upload_mesh(&mut self, handle: MeshHandle, mesh: &CpuMesh) -> BackendResult<()> {
            if mesh.vertices.is_empty() {
                return Err("mesh has no vertices".into());
            }
            if mesh.indices_u32.is_empty() {
                return Err("mesh has no indices".into());
            }

            let memory_allocator = self.context.memory_allocator().clone();
            let queue = self.context.graphics_queue().clone();

            // Host-visible staging buffers.
            let vertices_src = Buffer::from_iter(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::TRANSFER_SRC,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_HOST
                        | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                    ..Default::default()
                },
                mesh.vertices.iter().copied(),
            )?;

            let indices_src = Buffer::from_iter(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::TRANSFER_SRC,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_HOST
                        | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                    ..Default::default()
                },
                mesh.indices_u32.iter().copied(),
            )?;

            // Device-local destination buffers.
            let vertices_dst = Buffer::new_slice::<CpuVertex>(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::VERTEX_BUFFER | BufferUsage::TRANSFER_DST,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
                    ..Default::default()
                },
                mesh.vertices.len() as DeviceSize,
            )?;

            let indices_dst = Buffer::new_slice::<u32>(
                memory_allocator,
                BufferCreateInfo {
                    usage: BufferUsage::INDEX_BUFFER | BufferUsage::TRANSFER_DST,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
                    ..Default::default()
                },
                mesh.indices_u32.len() as DeviceSize,
            )?;

            let mut cbb = AutoCommandBufferBuilder::primary(
                self.command_buffer_allocator.clone(),
                queue.queue_family_index(),
                CommandBufferUsage::OneTimeSubmit,
            )?;

            cbb.copy_buffer(CopyBufferInfo::buffers(vertices_src, vertices_dst.clone()))?;
            cbb.copy_buffer(CopyBufferInfo::buffers(indices_src, indices_dst.clone()))?;

            let cb = cbb.build()?;

            cb.execute(queue.clone())?
                .then_signal_fence_and_flush()?
                .wait(None)?;

            self.meshes.insert(
                handle,
                VulkanoGpuMesh {
                    vertices: vertices_dst,
                    indices: indices_dst,
                    index_count: mesh.index_count(),
                },
            );

            Ok(())
        }
    }

    fn sampler_info(state: SamplerState) -> SamplerCreateInfo {
        match state {
            SamplerState::LinearWrap => SamplerCreateInfo::simple_repeat_linear(),
            SamplerState::LinearClamp => SamplerCreateInfo {
                mag_filter: Filter::Linear,
                min_filter: Filter::Linear,
                address_mode: [SamplerAddressMode::ClampToEdge; 3],
                ..Default::default()
            },
            SamplerState::PointClamp => SamplerCreateInfo {
                mag_filter: Filter::Nearest,
                min_filter: Filter::Nearest,
                address_mode: [SamplerAddressMode::ClampToEdge; 3],
                ..Default::default()
            },
        }
    }
}

/// Vulkan clip space has +Y pointing down.
const VULKAN_CLIP: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0, //
    0.0, -1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
]);

/// Vulkano-backed [`RenderDevice`].
///
/// Draw calls are recorded in order and replayed into a single render pass by `present`.
pub struct VulkanoRenderer {
    vulkano: vulkano_backend::VulkanoState,
    state: RenderState,
    extent: [u32; 2],
    preferred: Option<[u32; 2]>,
    clear_color: Color,
    commands: Vec<DrawCommand>,
    next_mesh_handle: u32,
    next_texture_handle: u32,
}

impl VulkanoRenderer {
    pub fn new(window: Arc<Window>) -> EngineResult<Self> {
        let vulkano = vulkano_backend::VulkanoState::new(window).map_err(EngineError::graphics)?;
        let extent = vulkano.extent();
        log::info!(
            "Vulkano swapchain/render-pass initialized at {}x{}",
            extent[0],
            extent[1]
        );
        Ok(Self {
            vulkano,
            state: RenderState::default(),
            extent,
            preferred: None,
            clear_color: Color::rgba(0.0, 0.0, 0.0, 1.0),
            commands: Vec::new(),
            next_mesh_handle: 0,
            next_texture_handle: 0,
        })
    }

    /// Call on `WindowEvent::Resized`.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.extent = [size.width, size.height];
        self.vulkano.window_resized = true;
    }

    fn clip_rect(&self, dest: ScreenRect) -> [f32; 4] {
        let w = self.extent[0].max(1) as f32;
        let h = self.extent[1].max(1) as f32;
        let to_clip_x = |x: i32| x as f32 / w * 2.0 - 1.0;
        let to_clip_y = |y: i32| y as f32 / h * 2.0 - 1.0;
        [
            to_clip_x(dest.x),
            to_clip_y(dest.y),
            to_clip_x(dest.x + dest.width),
            to_clip_y(dest.y + dest.height),
        ]
    }
}

impl MeshUploader for VulkanoRenderer {
    fn upload_mesh(&mut self, mesh: &CpuMesh) -> EngineResult<MeshHandle> {
        let handle = MeshHandle(self.next_mesh_handle);
        self.next_mesh_handle = self.next_mesh_handle.wrapping_add(1);

        self.vulkano
            .upload_mesh(handle, mesh)
            .map_err(EngineError::graphics)?;
        Ok(handle)
    }
}

impl TextureUploader for VulkanoRenderer {
    fn upload_texture_rgba8(
        &mut self,
        rgba: &[u8],
        width: u32,
        height: u32,
    ) -> EngineResult<TextureHandle> {
        let handle = TextureHandle(self.next_texture_handle);
        self.next_texture_handle = self.next_texture_handle.wrapping_add(1);

        self.vulkano
            .upload_texture_rgba8(handle, rgba, width, height)
            .map_err(EngineError::graphics)?;
        Ok(handle)
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        // In-flight command buffers keep their own reference to the image view.
        self.vulkano.textures.remove(&handle);
    }
}

impl RenderDevice for VulkanoRenderer {
    fn set_preferred_backbuffer_size(&mut self, width: u32, height: u32) {
        self.preferred = Some([width, height]);
    }

    fn apply_changes(&mut self) -> EngineResult<()> {
        let Some([width, height]) = self.preferred.take() else {
            return Ok(());
        };
        let granted = self
            .vulkano
            .window
            .request_inner_size(PhysicalSize::new(width, height))
            .unwrap_or(PhysicalSize::new(width, height));
        self.resize(granted);
        log::debug!(
            "requested {width}x{height} backbuffer, got {}x{}",
            granted.width,
            granted.height
        );
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        Viewport {
            width: self.extent[0],
            height: self.extent[1],
        }
    }

    fn clear(&mut self, color: Color) {
        self.clear_color = color;
        self.commands.clear();
    }

    fn draw_mesh(&mut self, mesh: MeshHandle, effect: &MeshEffect) {
        let mvp = VULKAN_CLIP * effect.projection * effect.view * effect.world;
        let light_dir = if effect.light.direction == Vec3::ZERO {
            Vec3::ZERO
        } else {
            effect
                .world
                .inverse()
                .transform_vector3(effect.light.direction)
                .normalize_or_zero()
        };

        self.commands.push(DrawCommand::Mesh {
            mesh,
            pipeline: PipelineKey {
                kind: PipelineKind::Mesh,
                blend: self.state.blend,
                depth_stencil: self.state.depth_stencil,
            },
            push: MeshPushConstants {
                mvp: mvp.to_cols_array_2d(),
                diffuse: effect.diffuse_color.extend(1.0).to_array(),
                light_dir: light_dir.extend(0.0).to_array(),
                light_color: effect.light.diffuse_color.extend(1.0).to_array(),
            },
        });
    }

    fn draw_sprite(&mut self, texture: TextureHandle, dest: ScreenRect, tint: Color) {
        self.commands.push(DrawCommand::Sprite {
            texture,
            pipeline: PipelineKey {
                kind: PipelineKind::Sprite,
                blend: self.state.blend,
                depth_stencil: self.state.depth_stencil,
            },
            sampler: self.state.samplers[SPRITE_SAMPLER_SLOT],
            push: SpritePushConstants {
                rect: self.clip_rect(dest),
                tint: tint.rgba,
            },
        });
    }

    fn set_blend_state(&mut self, state: BlendState) {
        self.state.blend = state;
    }

    fn set_depth_stencil_state(&mut self, state: DepthStencilState) {
        self.state.depth_stencil = state;
    }

    fn set_sampler_state(&mut self, slot: usize, state: SamplerState) {
        self.state.set_sampler(slot, state);
    }

    fn render_state(&self) -> RenderState {
        self.state
    }

    fn present(&mut self) -> EngineResult<()> {
        let commands = std::mem::take(&mut self.commands);
        self.vulkano
            .render_frame(self.clear_color, &commands)
            .map_err(EngineError::graphics)?;
        if self.vulkano.extent() != self.extent && !self.vulkano.window_resized {
            self.extent = self.vulkano.extent();
        }
        Ok(())
    }
}
