//! This module contains the code to interface with the GPU device.
//!
//! It's responsible of selecting the accelerator, owning every object created on it and
//! passing the calculation to the GPU in the correct format using the [`wgpu`] crate.
//!
//! The [`ExecutionContext`] is an arena: buffers, programs and kernels live inside it and the
//! caller only holds light handles ([`DeviceBuffer`], [`crate::program::Program`],
//! [`crate::program::Kernel`]). Releasing the context, or dropping it, releases everything
//! it created, so no device object can outlive its context.

use crate::coding::Shader;
use crate::config::DeviceSettings;
use crate::errors::{OffloadError, OffloadResult};
use crate::partition::DispatchGeometry;
use crate::program::{BoundArg, Kernel, Param};
use crate::variable::Variable;
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use wgpu::util::DeviceExt;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies an object inside the [`ExecutionContext`] that created it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    pub(crate) context: u64,
    pub(crate) slot: usize,
}

/// How a kernel may use a device buffer
///
/// The host can always write and read a buffer, the access only restricts the kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    /// True if a buffer allocated with `self` can be bound to a parameter declared with `param`
    pub fn serves(self, param: Access) -> bool {
        self == Access::ReadWrite || self == param
    }
}

/// Usages of every device buffer, whatever its [`Access`]
///
/// The access mode is enforced by [`crate::program::Kernel::bind`], not by the device.
const STORAGE_USAGES: wgpu::BufferUsages = wgpu::BufferUsages::STORAGE
    .union(wgpu::BufferUsages::COPY_DST)
    .union(wgpu::BufferUsages::COPY_SRC);

/// Handle to a device allocation owned by an [`ExecutionContext`]
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceBuffer {
    id: ObjectId,
    access: Access,
    byte_len: u64,
    name: Option<String>,
}

impl DeviceBuffer {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }

    /// Handle to no real allocation, for binding tests without a device
    #[cfg(test)]
    pub(crate) fn detached(context: u64, slot: usize, access: Access, byte_len: u64) -> Self {
        DeviceBuffer {
            id: ObjectId { context, slot },
            access,
            byte_len,
            name: None,
        }
    }
}

/// Returned by [`ExecutionContext::submit`]
///
/// The only way to wait for it is [`ExecutionContext::wait_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    sequence: u64,
    entry_point: String,
}

impl Submission {
    /// Position of the dispatch among the ones submitted to the context, starting at 1
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

/// Uniform block a scalar kernel argument is passed in
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ScalarUniform {
    value: i32,
    _padding: [i32; 3],
}

struct Gpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

struct KernelSlot {
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

/// Contains all the functions to interact with the GPU device in the machine.
///
/// It's responsible of creating the communication with the GPU, allocating and filling the buffers,
/// building the kernel programs, submitting the dispatches to its single queue and reading the
/// results back. It is meant to be driven by one thread.
pub struct ExecutionContext {
    id: u64,
    label: String,
    adapter_info: wgpu::AdapterInfo,
    limits: wgpu::Limits,
    gpu: Option<Gpu>,
    buffers: Vec<Option<wgpu::Buffer>>,
    programs: Vec<Option<wgpu::ShaderModule>>,
    kernels: Vec<Option<KernelSlot>>,
    // uniforms of scalar arguments, kept until the dispatch using them has completed
    scalars: Vec<wgpu::Buffer>,
    submissions: u64,
}

impl ExecutionContext {
    /// Selects the default adapter among the allowed backends and opens a device and its queue
    ///
    /// There is no fallback here: running on the host instead is a decision of the caller.
    ///
    /// ```no_run
    /// use wgpu_offload::config::DeviceSettings;
    /// use wgpu_offload::interface::ExecutionContext;
    ///
    /// let context = pollster::block_on(ExecutionContext::acquire(&DeviceSettings::default())).unwrap();
    /// println!("running on {}", context.adapter_info().name);
    /// ```
    ///
    /// # Errors
    /// - [`OffloadError::AcceleratorUnavailable`] if no adapter is found or the device can't be opened
    pub async fn acquire(settings: &DeviceSettings) -> OffloadResult<ExecutionContext> {
        let adapter = ExecutionContext::find_adapter(settings).await.ok_or_else(|| {
            log::warn!("request_adapter() --> no adapter found");
            OffloadError::AcceleratorUnavailable(format!(
                "no adapter found among backends {:?}",
                settings.backends
            ))
        })?;
        let adapter_info = adapter.get_info();
        log::info!(
            "Selected device is {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.backend,
            adapter_info.device_type
        );

        // the adapter's own limits, so large problems are not capped by the defaults
        let limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some(settings.label.as_str()),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits.clone(),
                },
                None,
            )
            .await
            .map_err(|err| {
                log::warn!("request_device() --> {err}");
                OffloadError::AcceleratorUnavailable(format!("request_device failed: {err}"))
            })?;
        log::debug!("request_device() --> ok");

        // every call is wrapped in an error scope, anything escaping them is only logged
        device.on_uncaptured_error(Box::new(|error: wgpu::Error| {
            log::error!("uncaptured device error: {error}");
        }));

        Ok(ExecutionContext {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            label: settings.label.clone(),
            adapter_info,
            limits,
            gpu: Some(Gpu { device, queue }),
            buffers: Vec::new(),
            programs: Vec::new(),
            kernels: Vec::new(),
            scalars: Vec::new(),
            submissions: 0,
        })
    }

    /// This function finds the adapter matching the settings
    async fn find_adapter(settings: &DeviceSettings) -> Option<wgpu::Adapter> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: settings.backends,
            ..Default::default()
        });

        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: settings.power_preference,
                compatible_surface: None, // no surface, only compute
                force_fallback_adapter: settings.force_fallback_adapter,
            })
            .await
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    pub fn limits(&self) -> &wgpu::Limits {
        &self.limits
    }

    pub fn is_released(&self) -> bool {
        self.gpu.is_none()
    }

    /// Number of device buffers currently alive in the context
    pub fn live_buffers(&self) -> usize {
        self.buffers.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn live_kernels(&self) -> usize {
        self.kernels.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.iter().filter(|slot| slot.is_some()).count()
    }

    fn gpu(&self) -> OffloadResult<&Gpu> {
        self.gpu.as_ref().ok_or(OffloadError::ContextReleased)
    }

    pub(crate) fn check_owner(&self, id: ObjectId) -> OffloadResult<()> {
        if id.context != self.id {
            return Err(OffloadError::ForeignHandle {
                owner: id.context,
                context: self.id,
            });
        }
        Ok(())
    }

    fn raw_buffer(&self, id: ObjectId) -> OffloadResult<&wgpu::Buffer> {
        self.check_owner(id)?;
        self.buffers
            .get(id.slot)
            .and_then(Option::as_ref)
            .ok_or(OffloadError::BufferReleased)
    }

    /// Allocates a device buffer of `byte_len` bytes
    ///
    /// # Errors
    /// - [`OffloadError::InvalidAllocation`] if `byte_len` is 0 or not a multiple of 4
    /// - [`OffloadError::OutOfDeviceMemory`] if the size exceeds the device limits or the device runs out of memory
    pub async fn allocate(
        &mut self,
        access: Access,
        byte_len: u64,
        name: Option<&str>,
    ) -> OffloadResult<DeviceBuffer> {
        let gpu = self.gpu()?;
        if byte_len == 0 || byte_len % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(OffloadError::InvalidAllocation(format!(
                "{byte_len} bytes is not a positive multiple of {}",
                wgpu::COPY_BUFFER_ALIGNMENT
            )));
        }
        let limit = self
            .limits
            .max_buffer_size
            .min(self.limits.max_storage_buffer_binding_size as u64);
        if byte_len > limit {
            return Err(OffloadError::OutOfDeviceMemory {
                requested: byte_len,
                detail: format!("the device binds at most {limit} bytes per buffer"),
            });
        }

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        gpu.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: name,
            size: byte_len,
            usage: STORAGE_USAGES,
            mapped_at_creation: false,
        });
        let out_of_memory = gpu.device.pop_error_scope().await;
        let invalid = gpu.device.pop_error_scope().await;
        if let Some(error) = out_of_memory.or(invalid) {
            log::error!("create_buffer({}) --> {error}", name.unwrap_or("unnamed"));
            buffer.destroy();
            return Err(OffloadError::OutOfDeviceMemory {
                requested: byte_len,
                detail: error.to_string(),
            });
        }
        log::debug!("create_buffer({}) --> ok", name.unwrap_or("unnamed"));

        self.buffers.push(Some(buffer));
        Ok(DeviceBuffer {
            id: ObjectId {
                context: self.id,
                slot: self.buffers.len() - 1,
            },
            access,
            byte_len,
            name: name.map(str::to_string),
        })
    }

    /// Copies `data` into the device buffer and blocks until the copy is complete
    pub fn write_buffer<V: Variable>(&mut self, buffer: &DeviceBuffer, data: &V) -> OffloadResult<()> {
        if data.byte_size() != buffer.byte_len {
            return Err(OffloadError::SizeMismatch {
                expected: buffer.byte_len,
                actual: data.byte_size(),
            });
        }
        let gpu = self.gpu()?;
        let raw = self.raw_buffer(buffer.id)?;

        gpu.queue.write_buffer(raw, 0, data.byte_data());
        // the write is only scheduled with the next submission
        gpu.queue.submit(std::iter::empty::<wgpu::CommandBuffer>());
        gpu.device.poll(wgpu::Maintain::Wait);
        log::debug!("write_buffer({}) --> ok", buffer.name());
        Ok(())
    }

    /// Copies the device buffer into `out`, blocking until the data is on the host
    pub async fn read_buffer<V: Variable>(
        &mut self,
        buffer: &DeviceBuffer,
        out: &mut V,
    ) -> OffloadResult<()> {
        if out.byte_size() != buffer.byte_len {
            return Err(OffloadError::SizeMismatch {
                expected: buffer.byte_len,
                actual: out.byte_size(),
            });
        }
        let gpu = self.gpu()?;
        let raw = self.raw_buffer(buffer.id)?;

        let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback staging"),
            size: buffer.byte_len,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback"),
            });
        encoder.copy_buffer_to_buffer(raw, 0, &staging, 0, buffer.byte_len);
        gpu.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            sender.send(result).ok();
        });
        gpu.device.poll(wgpu::Maintain::Wait);

        receiver
            .receive()
            .await
            .ok_or_else(|| OffloadError::BufferMapping("map callback was dropped".to_string()))?
            .map_err(|err| OffloadError::BufferMapping(err.to_string()))?;

        let copied = {
            let data = slice.get_mapped_range();
            out.read_data(&data)
        };
        staging.unmap();
        staging.destroy();
        log::debug!("read_buffer({}) --> ok", buffer.name());
        copied
    }

    /// Builds a shader module, the error scope status being the build status
    pub(crate) async fn create_program(&mut self, shader: &Shader) -> OffloadResult<ObjectId> {
        let gpu = self.gpu()?;
        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = gpu
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(self.label.as_str()),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(shader.get_content())),
            });
        if let Some(error) = gpu.device.pop_error_scope().await {
            log::error!("create_shader_module() --> build failed");
            return Err(OffloadError::CompileError {
                log: error.to_string(),
            });
        }
        log::debug!("create_shader_module() --> ok");

        self.programs.push(Some(module));
        Ok(ObjectId {
            context: self.id,
            slot: self.programs.len() - 1,
        })
    }

    /// Creates the layout and pipeline of one entry point of a program
    ///
    /// Parameter `i` is bound at `@group(0) @binding(i)`.
    pub(crate) async fn create_kernel(
        &mut self,
        program: ObjectId,
        entry_point: &str,
        params: &[Param],
    ) -> OffloadResult<ObjectId> {
        self.check_owner(program)?;
        let gpu = self.gpu()?;
        let module = self
            .programs
            .get(program.slot)
            .and_then(Option::as_ref)
            .ok_or_else(|| OffloadError::KernelCreation {
                entry_point: entry_point.to_string(),
                log: "the program has been released".to_string(),
            })?;

        let layout_entries: Vec<wgpu::BindGroupLayoutEntry> = params
            .iter()
            .enumerate()
            .map(|(binding, param)| wgpu::BindGroupLayoutEntry {
                binding: binding as u32,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: match param {
                        Param::Scalar => wgpu::BufferBindingType::Uniform,
                        Param::Buffer(access) => wgpu::BufferBindingType::Storage {
                            read_only: *access == Access::ReadOnly,
                        },
                    },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group_layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(entry_point),
                entries: &layout_entries,
            });
        let pipeline_layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(entry_point),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
        let pipeline = gpu
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module,
                entry_point,
            });
        if let Some(error) = gpu.device.pop_error_scope().await {
            log::error!("create_compute_pipeline({entry_point}) --> {error}");
            return Err(OffloadError::KernelCreation {
                entry_point: entry_point.to_string(),
                log: error.to_string(),
            });
        }
        log::debug!("create_compute_pipeline({entry_point}) --> ok");

        self.kernels.push(Some(KernelSlot {
            bind_group_layout,
            pipeline,
        }));
        Ok(ObjectId {
            context: self.id,
            slot: self.kernels.len() - 1,
        })
    }

    /// Checks the geometry against the kernel and the device limits
    fn check_geometry(&self, kernel: &Kernel, geometry: &DispatchGeometry) -> OffloadResult<()> {
        let local = geometry.local_padded();
        if let Some(declared) = kernel.workgroup_size() {
            if declared != local {
                return Err(OffloadError::DispatchRejected(format!(
                    "local size {:?} differs from the workgroup size {:?} declared by `{}`",
                    geometry.local(),
                    declared,
                    kernel.entry_point()
                )));
            }
        }

        let limits = &self.limits;
        let max_local = [
            limits.max_compute_workgroup_size_x,
            limits.max_compute_workgroup_size_y,
            limits.max_compute_workgroup_size_z,
        ];
        for (dimension, (size, max)) in local.iter().zip(max_local).enumerate() {
            if *size > max {
                return Err(OffloadError::DispatchRejected(format!(
                    "local size {size} exceeds the device limit {max} in dimension {dimension}"
                )));
            }
        }
        if geometry.invocations_per_group() > limits.max_compute_invocations_per_workgroup {
            return Err(OffloadError::DispatchRejected(format!(
                "{} invocations per workgroup exceed the device limit {}",
                geometry.invocations_per_group(),
                limits.max_compute_invocations_per_workgroup
            )));
        }
        for (dimension, count) in geometry.group_counts().iter().enumerate() {
            if *count > limits.max_compute_workgroups_per_dimension {
                return Err(OffloadError::DispatchRejected(format!(
                    "{count} workgroups in dimension {dimension} exceed the device limit {}",
                    limits.max_compute_workgroups_per_dimension
                )));
            }
        }
        Ok(())
    }

    /// Submits one dispatch of `kernel` over `geometry`
    ///
    /// Every argument must be bound. Inputs written with [`ExecutionContext::write_buffer`] are
    /// already on the device, so the dispatch sees them.
    ///
    /// # Errors
    /// - [`OffloadError::DispatchRejected`] for an unbound argument, a released buffer, a geometry the
    ///   kernel or the device can't run, or any validation error raised by the device
    pub async fn submit(
        &mut self,
        kernel: &Kernel,
        geometry: &DispatchGeometry,
    ) -> OffloadResult<Submission> {
        self.check_owner(kernel.id())?;
        self.check_geometry(kernel, geometry)?;
        let gpu = self.gpu()?;
        let slot = self
            .kernels
            .get(kernel.id().slot)
            .and_then(Option::as_ref)
            .ok_or_else(|| OffloadError::DispatchRejected("the kernel has been released".to_string()))?;

        enum Source<'b> {
            Scalar(usize),
            Device(&'b wgpu::Buffer),
        }

        let mut scalars = Vec::new();
        let mut sources = Vec::with_capacity(kernel.args().len());
        for (index, arg) in kernel.args().iter().enumerate() {
            match arg {
                None => {
                    return Err(OffloadError::DispatchRejected(format!(
                        "argument {index} of `{}` is not bound",
                        kernel.entry_point()
                    )))
                }
                Some(BoundArg::Scalar(value)) => {
                    let uniform = ScalarUniform {
                        value: *value,
                        _padding: [0; 3],
                    };
                    scalars.push(gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("scalar argument"),
                        contents: bytemuck::bytes_of(&uniform),
                        usage: wgpu::BufferUsages::UNIFORM,
                    }));
                    sources.push(Source::Scalar(scalars.len() - 1));
                }
                Some(BoundArg::Buffer(id)) => {
                    let raw = self.raw_buffer(*id).map_err(|err| {
                        OffloadError::DispatchRejected(format!("argument {index}: {err}"))
                    })?;
                    sources.push(Source::Device(raw));
                }
            }
        }

        let entries: Vec<wgpu::BindGroupEntry> = sources
            .iter()
            .enumerate()
            .map(|(binding, source)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: match source {
                    Source::Scalar(i) => scalars[*i].as_entire_binding(),
                    Source::Device(raw) => raw.as_entire_binding(),
                },
            })
            .collect();

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kernel.entry_point()),
            layout: &slot.bind_group_layout,
            entries: &entries,
        });
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(kernel.entry_point()),
            });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.entry_point()),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&slot.pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            let [x, y, z] = geometry.group_counts();
            compute_pass.dispatch_workgroups(x, y, z);
        }
        gpu.queue.submit(Some(encoder.finish()));
        if let Some(error) = gpu.device.pop_error_scope().await {
            log::error!("dispatch({}) --> {error}", kernel.entry_point());
            return Err(OffloadError::DispatchRejected(error.to_string()));
        }
        log::debug!(
            "dispatch({}, groups {:?}) --> ok",
            kernel.entry_point(),
            geometry.group_counts()
        );

        drop(entries);
        drop(sources);
        self.scalars.extend(scalars);
        self.submissions += 1;
        Ok(Submission {
            sequence: self.submissions,
            entry_point: kernel.entry_point().to_string(),
        })
    }

    /// Blocks until everything submitted to the queue has completed
    pub fn wait_all(&mut self) -> OffloadResult<()> {
        let gpu = self.gpu()?;
        gpu.device.poll(wgpu::Maintain::Wait);
        log::debug!("wait_all() --> ok");
        self.scalars.clear();
        Ok(())
    }

    pub fn release_buffer(&mut self, buffer: DeviceBuffer) -> OffloadResult<()> {
        self.check_owner(buffer.id)?;
        if let Some(raw) = self.buffers.get_mut(buffer.id.slot).and_then(Option::take) {
            raw.destroy();
        }
        log::debug!("release_buffer({}) --> ok", buffer.name());
        Ok(())
    }

    pub fn release_kernel(&mut self, kernel: Kernel) -> OffloadResult<()> {
        self.check_owner(kernel.id())?;
        if let Some(slot) = self.kernels.get_mut(kernel.id().slot) {
            slot.take();
        }
        log::debug!("release_kernel({}) --> ok", kernel.entry_point());
        Ok(())
    }

    pub(crate) fn release_program(&mut self, program: ObjectId) -> OffloadResult<()> {
        self.check_owner(program)?;
        if let Some(slot) = self.programs.get_mut(program.slot) {
            slot.take();
        }
        log::debug!("release_program() --> ok");
        Ok(())
    }

    /// Releases every object created through the context, then the queue and the device
    ///
    /// Calling it again, or after a failed run, does nothing. It is also called on drop.
    pub fn release(&mut self) {
        let Some(gpu) = self.gpu.take() else {
            return;
        };
        let mut buffers = 0;
        for raw in self.buffers.iter_mut().filter_map(Option::take) {
            raw.destroy();
            buffers += 1;
        }
        let kernels = self.kernels.iter_mut().filter_map(Option::take).count();
        let programs = self.programs.iter_mut().filter_map(Option::take).count();
        self.scalars.clear();

        gpu.device.poll(wgpu::Maintain::Wait);
        let Gpu { device, queue } = gpu;
        drop(queue);
        drop(device);
        log::debug!(
            "release() --> {buffers} buffers, {kernels} kernels, {programs} programs released"
        );
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod interface_test {
    use super::*;

    #[test]
    fn access_serves_parameters() {
        assert!(Access::ReadWrite.serves(Access::ReadOnly));
        assert!(Access::ReadWrite.serves(Access::WriteOnly));
        assert!(Access::ReadOnly.serves(Access::ReadOnly));
        assert!(!Access::ReadOnly.serves(Access::WriteOnly));
        assert!(!Access::WriteOnly.serves(Access::ReadOnly));
    }

    #[test]
    fn every_buffer_can_be_staged_and_read_back() {
        // kernels are restricted at bind time, the host always copies in and out
        assert!(STORAGE_USAGES.contains(wgpu::BufferUsages::STORAGE));
        assert!(STORAGE_USAGES.contains(wgpu::BufferUsages::COPY_DST));
        assert!(STORAGE_USAGES.contains(wgpu::BufferUsages::COPY_SRC));
        assert!(!STORAGE_USAGES.contains(wgpu::BufferUsages::MAP_READ));
    }
}
