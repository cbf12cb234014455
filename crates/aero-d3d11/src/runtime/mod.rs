pub mod shader_cache;
pub mod state_object_set;
mod wgpu_factory;
