use log::debug;

use crate::{gpu, BindGroup, StorageBuffer, UniformBuffer};

/// Draws the output accumulator, averaged over the samples taken so far,
/// onto a color target.
#[derive(Debug)]
pub struct PresentPass {
    bg0: BindGroup,
    pipeline: wgpu::RenderPipeline,
}

impl PresentPass {
    pub fn new(
        device: &wgpu::Device,
        module: &wgpu::ShaderModule,
        format: wgpu::TextureFormat,
        params: &UniformBuffer<gpu::FrameParams>,
        output: &StorageBuffer,
    ) -> Self {
        debug!("Initializing pass: present");

        let bg0 = BindGroup::builder("present_bg0")
            .add(params)
            .add(&output.as_ro_bind())
            .build(device);

        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("wavetrace_present_pipeline_layout"),
                bind_group_layouts: &[bg0.layout()],
                push_constant_ranges: &[],
            });

        let pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("wavetrace_present_pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some(wavetrace_shaders::PRESENT_VERTEX),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some(wavetrace_shaders::PRESENT_FRAGMENT),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
                cache: None,
            });

        Self { bg0, pipeline }
    }

    pub fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("wavetrace_present"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, self.bg0.get(), &[]);
        pass.draw(0..6, 0..1);
    }
}
