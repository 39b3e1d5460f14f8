//! Kernel programs and the kernels created from them
//!
//! A [`Program`] is a [`Shader`] built on the device of an [`ExecutionContext`]. Each of its
//! `@compute` entry points can be turned into a [`Kernel`], whose positional parameters are
//! bound before every dispatch that changes them.

use crate::coding::{EntryPoint, Shader};
use crate::errors::{OffloadError, OffloadResult};
use crate::interface::{Access, DeviceBuffer, ExecutionContext, ObjectId};

/// Declared type of a kernel parameter
///
/// Parameter `i` is the `@group(0) @binding(i)` variable of the kernel source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// A 32-bit integer, declared as `var<uniform> name: i32`
    Scalar,
    /// A storage buffer. `ReadOnly` is declared `var<storage, read>`, the others `var<storage, read_write>`
    Buffer(Access),
}

/// Value bound to a kernel parameter
#[derive(Debug, Clone, Copy)]
pub enum KernelArg<'a> {
    Scalar(i32),
    Buffer(&'a DeviceBuffer),
}

/// What a kernel keeps of a bound argument. Buffers are referenced, not owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoundArg {
    Scalar(i32),
    Buffer(ObjectId),
}

/// A compiled kernel program
#[derive(Debug)]
pub struct Program {
    id: ObjectId,
    entry_points: Vec<EntryPoint>,
    build_log: String,
}

impl Program {
    /// Builds `shader` on the device of the context
    ///
    /// The build status reported by the device decides success. The build log is kept as
    /// diagnostic text only; `wgpu` reports no warnings, so it is empty after a successful build.
    ///
    /// # Errors
    /// - [`OffloadError::CompileError`] carrying the build log if the source doesn't build
    pub async fn compile(context: &mut ExecutionContext, shader: &Shader) -> OffloadResult<Program> {
        let id = context.create_program(shader).await?;
        let entry_points = shader.entry_points();
        log::info!(
            "Kernel program compiled, entry points {:?}",
            entry_points.iter().map(|e| e.name.as_str()).collect::<Vec<_>>()
        );
        Ok(Program {
            id,
            entry_points,
            build_log: String::new(),
        })
    }

    /// Diagnostic text of the build
    ///
    /// A failed build carries its log in [`OffloadError::CompileError`]. `wgpu` reports no build
    /// warnings, so after a successful build this is always empty.
    pub fn build_log(&self) -> &str {
        &self.build_log
    }

    pub fn entry_points(&self) -> &[EntryPoint] {
        &self.entry_points
    }

    /// Creates the kernel of `entry_point`, whose parameters are `params` in binding order
    ///
    /// # Errors
    /// - [`OffloadError::EntryPointNotFound`] if the program has no `@compute` function with that name
    /// - [`OffloadError::KernelCreation`] if the device rejects the parameters for that function
    pub async fn create_kernel(
        &self,
        context: &mut ExecutionContext,
        entry_point: &str,
        params: &[Param],
    ) -> OffloadResult<Kernel> {
        let Some(entry) = self.entry_points.iter().find(|e| e.name == entry_point) else {
            return Err(OffloadError::EntryPointNotFound {
                entry_point: entry_point.to_string(),
                available: self.entry_points.iter().map(|e| e.name.clone()).collect(),
            });
        };
        let id = context.create_kernel(self.id, entry_point, params).await?;
        Ok(Kernel {
            id,
            entry_point: entry_point.to_string(),
            params: params.to_vec(),
            args: vec![None; params.len()],
            workgroup_size: entry.workgroup_size,
        })
    }

    /// Releases the program. Kernels already created from it stay usable.
    pub fn release(self, context: &mut ExecutionContext) -> OffloadResult<()> {
        context.release_program(self.id)
    }
}

/// One entry point of a [`Program`] with its argument bindings
#[derive(Debug)]
pub struct Kernel {
    id: ObjectId,
    entry_point: String,
    params: Vec<Param>,
    args: Vec<Option<BoundArg>>,
    workgroup_size: Option<[u32; 3]>,
}

impl Kernel {
    /// Binds `arg` to parameter `index`, replacing any previous binding
    ///
    /// # Errors
    /// - [`OffloadError::InvalidArgument`] if the index is out of range, the kind of argument
    ///   differs from the parameter, or the buffer access doesn't allow the parameter's use
    /// - [`OffloadError::ForeignHandle`] if the buffer belongs to another context
    pub fn bind(&mut self, index: u32, arg: KernelArg) -> OffloadResult<()> {
        let param = *self
            .params
            .get(index as usize)
            .ok_or_else(|| OffloadError::InvalidArgument {
                index,
                reason: format!("`{}` takes {} arguments", self.entry_point, self.params.len()),
            })?;

        let bound = match (param, arg) {
            (Param::Scalar, KernelArg::Scalar(value)) => BoundArg::Scalar(value),
            (Param::Buffer(access), KernelArg::Buffer(buffer)) => {
                if buffer.id().context != self.id.context {
                    return Err(OffloadError::ForeignHandle {
                        owner: buffer.id().context,
                        context: self.id.context,
                    });
                }
                if !buffer.access().serves(access) {
                    return Err(OffloadError::InvalidArgument {
                        index,
                        reason: format!(
                            "buffer `{}` is {:?}, the parameter needs {:?}",
                            buffer.name(),
                            buffer.access(),
                            access
                        ),
                    });
                }
                BoundArg::Buffer(buffer.id())
            }
            (param, arg) => {
                return Err(OffloadError::InvalidArgument {
                    index,
                    reason: format!("{arg:?} can't be bound to a {param:?} parameter"),
                })
            }
        };
        self.args[index as usize] = Some(bound);
        log::debug!("bind({}, {index}) --> ok", self.entry_point);
        Ok(())
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// The `@workgroup_size` declared in the source, if it could be read
    pub fn workgroup_size(&self) -> Option<[u32; 3]> {
        self.workgroup_size
    }

    pub fn is_bound(&self, index: u32) -> bool {
        matches!(self.args.get(index as usize), Some(Some(_)))
    }

    pub fn is_fully_bound(&self) -> bool {
        self.args.iter().all(Option::is_some)
    }

    pub(crate) fn args(&self) -> &[Option<BoundArg>] {
        &self.args
    }
}
