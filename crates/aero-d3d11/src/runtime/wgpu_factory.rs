use std::borrow::Cow;

use aero_dxbc::ShaderStage;

use crate::shader::{ShaderModuleError, ShaderModuleFactory};

/// SPIR-V passthrough into `wgpu`. Validation errors are captured with an
/// error scope instead of reaching the device's uncaptured-error handler.
impl ShaderModuleFactory for wgpu::Device {
    type Module = wgpu::ShaderModule;

    fn create_module(
        &self,
        stage: ShaderStage,
        code: &[u32],
    ) -> Result<wgpu::ShaderModule, ShaderModuleError> {
        let label = match stage {
            ShaderStage::Vertex => "aero-d3d11 vs",
            ShaderStage::Pixel => "aero-d3d11 ps",
            ShaderStage::Compute => "aero-d3d11 cs",
            other => return Err(ShaderModuleError::UnsupportedStage(other)),
        };

        self.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::SpirV(Cow::Borrowed(code)),
        });
        match pollster::block_on(self.pop_error_scope()) {
            Some(err) => Err(ShaderModuleError::Backend {
                message: err.to_string(),
            }),
            None => Ok(module),
        }
    }
}
