//! Configuration of an offload run.

use crate::reference::Indexing;

/// How the accelerator is selected by [`crate::interface::ExecutionContext::acquire`]
#[derive(Debug, Clone)]
pub struct DeviceSettings {
    /// Backends the adapter may come from. With [`wgpu::Backends::empty`] no adapter is ever found.
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
    /// Ask for a software adapter instead of a hardware one
    pub force_fallback_adapter: bool,
    /// Label of the device, shows up in wgpu diagnostics
    pub label: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        DeviceSettings {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            label: "wgpu-offload".to_string(),
        }
    }
}

impl DeviceSettings {
    /// Restricts the backends from a comma separated list such as `"vulkan,metal"`
    pub fn with_backends(mut self, list: &str) -> Self {
        self.backends = wgpu::util::parse_backends_from_comma_list(list);
        self
    }
}

/// Problem and tile sizes of a run
#[derive(Debug, Clone)]
pub struct OffloadConfig {
    /// Side of the square matrices
    pub matrix_size: u32,
    /// Tile (workgroup) side of the matrix product, must divide `matrix_size`
    pub work_group_size: u32,
    /// Length of the vectors added by `vector_add`
    pub vector_len: u32,
    /// Workgroup size of `vector_add`, must divide `vector_len`
    pub vector_group_size: u32,
    pub indexing: Indexing,
    pub device: DeviceSettings,
}

impl Default for OffloadConfig {
    fn default() -> Self {
        OffloadConfig {
            matrix_size: 1024,
            work_group_size: 8,
            vector_len: 1024,
            vector_group_size: 64,
            indexing: Indexing::Legacy,
            device: DeviceSettings::default(),
        }
    }
}
