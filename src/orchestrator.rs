//! This module drives a whole offload run
//!
//! It's the top layer of the crate: from the input [`HostBuffer`]s and the kernel [`Shader`] it
//! acquires an [`ExecutionContext`], builds the program, stages the inputs, binds the arguments,
//! dispatches, waits, reads the result back and releases everything, whatever stage failed.
//! When no device is requested the host reference algorithm runs instead and no device object
//! is ever created.

use crate::coding::{Shader, ELEMENT_TOKEN, TILE_TOKEN};
use crate::config::OffloadConfig;
use crate::errors::{OffloadError, StageError};
use crate::interface::{Access, DeviceBuffer, ExecutionContext};
use crate::partition::{compute_geometry, DispatchGeometry};
use crate::program::{Kernel, KernelArg, Param, Program};
use crate::reference;
use crate::variable::{Element, HostBuffer, Shape, Variable};
use std::time::{Duration, Instant};

/// Stages of a run, in the only order they can be reached
///
/// The host path goes straight from `Idle` to `ResultsRetrieved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Idle,
    SourcesLoaded,
    ContextReady,
    ProgramCompiled,
    BuffersStaged,
    ArgumentsBound,
    Dispatched,
    ResultsRetrieved,
    Released,
}

/// Where the computation runs
#[derive(Debug, Clone, Copy)]
pub enum ExecutionPath<'a> {
    /// On the accelerator, with the kernels of the given source
    Device(&'a Shader),
    /// With the host reference algorithm
    Host,
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunReport<T: Element> {
    pub output: HostBuffer<T>,
    /// Wall-clock time of the computation only: dispatch, wait and readback on the device
    /// path, the reference call on the host path
    pub elapsed: Duration,
    /// Name of the adapter, `None` on the host path
    pub device: Option<String>,
}

enum JobArg<'a, T: Element> {
    Scalar(i32),
    Input(&'a HostBuffer<T>),
    Output,
}

/// One kernel invocation as the device path needs it
struct Job<'a, T: Element> {
    entry_point: &'static str,
    substitutions: Vec<(&'static str, String)>,
    extents: Vec<u32>,
    tile: u32,
    args: Vec<JobArg<'a, T>>,
    output_shape: Shape,
}

/// Argument once its buffer, if any, is on the device
enum Staged {
    Scalar(i32),
    Buffer(usize),
}

/// Device objects obtained so far by a run, released in reverse order
#[derive(Default)]
struct Acquired {
    program: Option<Program>,
    kernel: Option<Kernel>,
    buffers: Vec<DeviceBuffer>,
}

/// Problem extents of the first `dimensions` dimensions of `buffer`
fn extents(buffer: &impl Variable, dimensions: usize) -> Vec<u32> {
    buffer.dimension_sizes()[..dimensions].to_vec()
}

fn at(stage: Stage) -> impl FnOnce(OffloadError) -> StageError {
    move |error| StageError::new(stage, error)
}

/// Runs matrix products and vector additions on the device or on the host
///
/// # Example
/// ```
/// use wgpu_offload::config::OffloadConfig;
/// use wgpu_offload::orchestrator::{ExecutionPath, Orchestrator, Stage};
/// use wgpu_offload::variable::{HostBuffer, Shape};
///
/// let mut orchestrator = Orchestrator::new(OffloadConfig::default());
/// let a = HostBuffer::filled(Shape::square(2), 3.0f32);
/// let b = HostBuffer::filled(Shape::square(2), 2.0f32);
/// let report = pollster::block_on(orchestrator.multiply(&a, &b, ExecutionPath::Host)).unwrap();
/// assert_eq!(report.output.as_slice(), &[12.0; 4]);
/// assert_eq!(orchestrator.stage(), Stage::Released);
/// ```
pub struct Orchestrator {
    config: OffloadConfig,
    stage: Stage,
}

impl Orchestrator {
    pub fn new(config: OffloadConfig) -> Self {
        Orchestrator {
            config,
            stage: Stage::Idle,
        }
    }

    pub fn config(&self) -> &OffloadConfig {
        &self.config
    }

    /// Last stage reached by the current (or last) run
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn begin(&mut self) {
        self.stage = Stage::Idle;
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.stage, "stage {:?} after {:?}", next, self.stage);
        log::debug!("stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }

    /// Square matrix product `a` x `b` with the configured indexing and tile size
    ///
    /// # Errors
    /// A [`StageError`] naming the stage that failed; every device object acquired before the
    /// failure has been released when it is returned.
    pub async fn multiply(
        &mut self,
        a: &HostBuffer<f32>,
        b: &HostBuffer<f32>,
        path: ExecutionPath<'_>,
    ) -> Result<RunReport<f32>, StageError> {
        self.begin();
        let size = match (a.shape().square_side(), b.shape().square_side()) {
            (Some(n), Some(m)) if n == m => n,
            _ => {
                return Err(StageError::new(
                    Stage::SourcesLoaded,
                    OffloadError::ShapeMismatch(format!(
                        "expected two square matrices of the same size, got {:?} and {:?}",
                        a.shape(),
                        b.shape()
                    )),
                ))
            }
        };
        let indexing = self.config.indexing;

        match path {
            ExecutionPath::Host => self.run_host(|| reference::multiply(a, b, indexing)),
            ExecutionPath::Device(shader) => {
                let job = self.multiply_job(a, b, size);
                self.run_device(shader, job).await
            }
        }
    }

    fn multiply_job<'a>(
        &self,
        a: &'a HostBuffer<f32>,
        b: &'a HostBuffer<f32>,
        size: usize,
    ) -> Job<'a, f32> {
        let tile = self.config.work_group_size;
        Job {
            entry_point: self.config.indexing.entry_point(),
            substitutions: vec![(TILE_TOKEN, tile.to_string())],
            extents: extents(a, 2),
            tile,
            args: vec![
                JobArg::Scalar(size as i32),
                JobArg::Input(a),
                JobArg::Input(b),
                JobArg::Output,
            ],
            output_shape: Shape::square(size),
        }
    }

    /// Elementwise sum `a + b` with the configured vector workgroup size
    pub async fn vector_add<T: Element>(
        &mut self,
        a: &HostBuffer<T>,
        b: &HostBuffer<T>,
        path: ExecutionPath<'_>,
    ) -> Result<RunReport<T>, StageError> {
        self.begin();
        if a.shape() != b.shape() {
            return Err(StageError::new(
                Stage::SourcesLoaded,
                OffloadError::ShapeMismatch(format!(
                    "cannot add {:?} and {:?}",
                    a.shape(),
                    b.shape()
                )),
            ));
        }

        match path {
            ExecutionPath::Host => self.run_host(|| reference::vector_add(a, b)),
            ExecutionPath::Device(shader) => {
                let tile = self.config.vector_group_size;
                let job = Job {
                    entry_point: "vector_add",
                    substitutions: vec![
                        (TILE_TOKEN, tile.to_string()),
                        (ELEMENT_TOKEN, T::WGSL_TYPE.to_string()),
                    ],
                    extents: extents(a, 1),
                    tile,
                    args: vec![JobArg::Input(a), JobArg::Input(b), JobArg::Output],
                    output_shape: a.shape(),
                };
                self.run_device(shader, job).await
            }
        }
    }

    fn run_host<T: Element>(
        &mut self,
        compute: impl FnOnce() -> Result<HostBuffer<T>, OffloadError>,
    ) -> Result<RunReport<T>, StageError> {
        let started = Instant::now();
        let output = compute().map_err(at(Stage::ResultsRetrieved))?;
        let elapsed = started.elapsed();
        self.advance(Stage::ResultsRetrieved);
        self.advance(Stage::Released);
        log::info!("host computation took {} us", elapsed.as_micros());
        Ok(RunReport {
            output,
            elapsed,
            device: None,
        })
    }

    async fn run_device<T: Element>(
        &mut self,
        shader: &Shader,
        job: Job<'_, T>,
    ) -> Result<RunReport<T>, StageError> {
        let mut source = shader.clone();
        for (token, value) in &job.substitutions {
            source.replace(token, value);
        }
        // an indivisible work size is a configuration error, caught before any device work
        let geometry = compute_geometry(&job.extents, job.tile).map_err(at(Stage::SourcesLoaded))?;
        self.advance(Stage::SourcesLoaded);

        let mut context = ExecutionContext::acquire(&self.config.device)
            .await
            .map_err(at(Stage::ContextReady))?;
        self.advance(Stage::ContextReady);
        let device = context.adapter_info().name.clone();

        let mut acquired = Acquired::default();
        let result = self
            .drive(&mut context, &source, &job, &geometry, &mut acquired)
            .await;
        Orchestrator::teardown(&mut context, acquired);

        let (output, elapsed) = result?;
        self.advance(Stage::Released);
        log::info!("device computation took {} us", elapsed.as_micros());
        Ok(RunReport {
            output,
            elapsed,
            device: Some(device),
        })
    }

    async fn drive<T: Element>(
        &mut self,
        context: &mut ExecutionContext,
        source: &Shader,
        job: &Job<'_, T>,
        geometry: &DispatchGeometry,
        acquired: &mut Acquired,
    ) -> Result<(HostBuffer<T>, Duration), StageError> {
        let params: Vec<Param> = job
            .args
            .iter()
            .map(|arg| match arg {
                JobArg::Scalar(_) => Param::Scalar,
                JobArg::Input(_) => Param::Buffer(Access::ReadOnly),
                JobArg::Output => Param::Buffer(Access::WriteOnly),
            })
            .collect();

        let program = Program::compile(context, source)
            .await
            .map_err(at(Stage::ProgramCompiled))?;
        let program = acquired.program.insert(program);
        let kernel = program
            .create_kernel(context, job.entry_point, &params)
            .await
            .map_err(at(Stage::ProgramCompiled))?;
        let kernel = acquired.kernel.insert(kernel);
        self.advance(Stage::ProgramCompiled);

        let mut staged = Vec::with_capacity(job.args.len());
        let mut output_index = None;
        for arg in &job.args {
            match arg {
                JobArg::Scalar(value) => staged.push(Staged::Scalar(*value)),
                JobArg::Input(host) => {
                    let buffer = context
                        .allocate(Access::ReadOnly, host.byte_size(), Some(host.get_name().unwrap_or("input")))
                        .await
                        .map_err(at(Stage::BuffersStaged))?;
                    acquired.buffers.push(buffer);
                    staged.push(Staged::Buffer(acquired.buffers.len() - 1));
                }
                JobArg::Output => {
                    let byte_len = (job.output_shape.len() * std::mem::size_of::<T>()) as u64;
                    let buffer = context
                        .allocate(Access::WriteOnly, byte_len, Some("output"))
                        .await
                        .map_err(at(Stage::BuffersStaged))?;
                    acquired.buffers.push(buffer);
                    output_index = Some(acquired.buffers.len() - 1);
                    staged.push(Staged::Buffer(acquired.buffers.len() - 1));
                }
            }
        }
        for (arg, staged) in job.args.iter().zip(&staged) {
            if let (JobArg::Input(host), Staged::Buffer(index)) = (arg, staged) {
                context
                    .write_buffer(&acquired.buffers[*index], *host)
                    .map_err(at(Stage::BuffersStaged))?;
            }
        }
        let output_index = output_index.ok_or_else(|| {
            StageError::new(
                Stage::BuffersStaged,
                OffloadError::InvalidArgument {
                    index: job.args.len() as u32,
                    reason: format!("`{}` has no output argument", job.entry_point),
                },
            )
        })?;
        log::info!("Input data sent to the device");
        self.advance(Stage::BuffersStaged);

        for (index, staged) in staged.iter().enumerate() {
            let arg = match staged {
                Staged::Scalar(value) => KernelArg::Scalar(*value),
                Staged::Buffer(slot) => KernelArg::Buffer(&acquired.buffers[*slot]),
            };
            kernel
                .bind(index as u32, arg)
                .map_err(at(Stage::ArgumentsBound))?;
        }
        self.advance(Stage::ArgumentsBound);

        let started = Instant::now();
        let submission = context
            .submit(kernel, geometry)
            .await
            .map_err(at(Stage::Dispatched))?;
        context.wait_all().map_err(at(Stage::Dispatched))?;
        log::debug!(
            "submission {} of `{}` completed",
            submission.sequence(),
            submission.entry_point()
        );
        self.advance(Stage::Dispatched);

        let mut output = HostBuffer::zeros(job.output_shape).with_name("output");
        context
            .read_buffer(&acquired.buffers[output_index], &mut output)
            .await
            .map_err(at(Stage::ResultsRetrieved))?;
        let elapsed = started.elapsed();
        self.advance(Stage::ResultsRetrieved);
        Ok((output, elapsed))
    }

    /// Releases what the run obtained, then the context itself
    fn teardown(context: &mut ExecutionContext, acquired: Acquired) {
        let released = Orchestrator::release_acquired(context, acquired);
        context.release();
        log::info!("Cleaned up {released} objects");
    }

    /// Releases the buffers newest first, then the kernel, then the program
    ///
    /// A failing release is logged and the others go on. Returns how many objects were released.
    fn release_acquired(context: &mut ExecutionContext, acquired: Acquired) -> usize {
        let Acquired {
            program,
            kernel,
            buffers,
        } = acquired;
        let mut released = 0;

        for buffer in buffers.into_iter().rev() {
            let name = buffer.name().to_string();
            match context.release_buffer(buffer) {
                Ok(()) => released += 1,
                Err(err) => log::warn!("release of buffer `{name}` failed: {err}"),
            }
        }
        if let Some(kernel) = kernel {
            match context.release_kernel(kernel) {
                Ok(()) => released += 1,
                Err(err) => log::warn!("release of the kernel failed: {err}"),
            }
        }
        if let Some(program) = program {
            match program.release(context) {
                Ok(()) => released += 1,
                Err(err) => log::warn!("release of the program failed: {err}"),
            }
        }
        released
    }
}
