/*!
This crate aim is to offload simple dense calculations to the GPU and check them against the host

The project is based on the [`wgpu`] crate: the kernels are WGSL sources shipped in `kernels/`, built at
run time on whatever adapter the machine offers (Vulkan, Metal, DX12 or GL), and driven through a small
explicit lifecycle:

- an [`interface::ExecutionContext`] owns the device, its queue and every object created on it;
- a [`program::Program`] is a kernel source built on that device, a [`program::Kernel`] one of its entry points;
- [`partition`] turns a problem size and a tile size into a dispatch geometry, refusing sizes that don't divide;
- [`orchestrator::Orchestrator`] runs a whole square matrix product or vector addition and releases
  everything whatever stage fails.

The [`reference`] module holds the host versions of the kernels, used both as the oracle of the device
results and as the execution path when no GPU is requested. [`ndarray`] arrays can be moved in and out
of the crate's [`variable::HostBuffer`] through the [`translator`] module.

```
use wgpu_offload::config::OffloadConfig;
use wgpu_offload::orchestrator::{ExecutionPath, Orchestrator};
use wgpu_offload::variable::{HostBuffer, Shape};

let a = HostBuffer::from_vec(Shape::Vector(3), vec![0, 1, 2]).unwrap();
let b = HostBuffer::filled(Shape::Vector(3), 10);
let mut orchestrator = Orchestrator::new(OffloadConfig::default());
let report = pollster::block_on(orchestrator.vector_add(&a, &b, ExecutionPath::Host)).unwrap();
assert_eq!(report.output.as_slice(), &[10, 11, 12]);
```
*/

pub mod coding;
pub mod config;
pub mod errors;
pub mod interface;
pub mod orchestrator;
pub mod partition;
pub mod program;
pub mod reference;
pub mod translator;
pub mod variable;

pub use errors::{OffloadError, OffloadResult, StageError};

#[cfg(test)]
mod tests;
