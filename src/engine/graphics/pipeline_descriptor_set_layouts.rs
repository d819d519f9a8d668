use std::collections::BTreeMap;
use std::sync::Arc;

use vulkano::descriptor_set::layout::{
    DescriptorSetLayout, DescriptorSetLayoutBinding, DescriptorSetLayoutCreateInfo, DescriptorType,
};
use vulkano::device::Device;
use vulkano::pipeline::layout::PushConstantRange;
use vulkano::shader::ShaderStages;

pub struct PipelineDescriptorSetLayouts {
    /// Set 0 of the sprite pipeline: `binding=0` combined image sampler (the sprite texture).
    ///
    /// The mesh pipeline binds no descriptor sets; everything it needs fits in push constants.
    pub sprite: Arc<DescriptorSetLayout>,
}

impl PipelineDescriptorSetLayouts {
    pub fn new(device: Arc<Device>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut bindings = BTreeMap::new();

        let mut texture =
            DescriptorSetLayoutBinding::descriptor_type(DescriptorType::CombinedImageSampler);
        texture.descriptor_count = 1;
        texture.stages = ShaderStages::FRAGMENT;
        bindings.insert(0, texture);

        let sprite = DescriptorSetLayout::new(
            device,
            DescriptorSetLayoutCreateInfo {
                bindings,
                ..Default::default()
            },
        )?;

        Ok(Self { sprite })
    }

    /// A single push constant block of `size` bytes visible to both shader stages.
    pub fn push_constants(size: u32) -> Vec<PushConstantRange> {
        vec![PushConstantRange {
            stages: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
            offset: 0,
            size,
        }]
    }
}
