/// Object that can be bound to a shader, e.g. a buffer
pub trait Bindable {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)>;
}

/// Layout entry shared by every buffer binding.
///
/// Read-only bindings are visible to the presentation pass as well; writable
/// storage stays compute-only.
pub(crate) fn buffer_layout(
    binding: u32,
    ty: wgpu::BufferBindingType,
) -> wgpu::BindGroupLayoutEntry {
    let visibility = match ty {
        wgpu::BufferBindingType::Storage { read_only: false } => {
            wgpu::ShaderStages::COMPUTE
        }
        _ => wgpu::ShaderStages::COMPUTE | wgpu::ShaderStages::FRAGMENT,
    };

    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
