//! wgpu-offload CLI
//!
//! Runs a square matrix product or a vector addition on the GPU, or on the host when `--gpu`
//! is not given, and reports how long the computation took.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use wgpu_offload::coding::Shader;
use wgpu_offload::config::{DeviceSettings, OffloadConfig};
use wgpu_offload::orchestrator::{ExecutionPath, Orchestrator};
use wgpu_offload::reference::Indexing;
use wgpu_offload::variable::{HostBuffer, Shape};

#[derive(Parser)]
#[command(name = "wgpu-offload")]
#[command(version)]
#[command(about = "Offloads a matrix product or a vector addition to the GPU", long_about = None)]
struct Cli {
    /// Run on the GPU instead of the host
    #[arg(long)]
    gpu: bool,

    /// Print (part of) the result
    #[arg(long)]
    print: bool,

    /// Operation to run
    #[arg(long, value_enum, default_value = "matmul")]
    op: Operation,

    /// Matrix side or vector length (default: 1024)
    #[arg(long)]
    size: Option<u32>,

    /// Workgroup side, must divide the size (default: 8 for matmul, 64 for vector-add)
    #[arg(long)]
    tile: Option<u32>,

    /// Kernel source (default: kernels/multiply.wgsl or kernels/vector_add.wgsl)
    #[arg(long)]
    kernel: Option<PathBuf>,

    /// Comma separated wgpu backends, e.g. "vulkan,metal"
    #[arg(long)]
    backends: Option<String>,

    /// Index scheme of the matrix product
    #[arg(long, value_enum, default_value = "legacy")]
    indexing: IndexingArg,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Operation {
    Matmul,
    VectorAdd,
}

#[derive(Clone, Copy, ValueEnum)]
enum IndexingArg {
    Legacy,
    Standard,
}

impl From<IndexingArg> for Indexing {
    fn from(arg: IndexingArg) -> Self {
        match arg {
            IndexingArg::Legacy => Indexing::Legacy,
            IndexingArg::Standard => Indexing::Standard,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = OffloadConfig {
        indexing: cli.indexing.into(),
        ..OffloadConfig::default()
    };
    if let Some(list) = &cli.backends {
        config.device = DeviceSettings::default().with_backends(list);
    }
    if let Some(size) = cli.size {
        config.matrix_size = size;
        config.vector_len = size;
    }
    if let Some(tile) = cli.tile {
        config.work_group_size = tile;
        config.vector_group_size = tile;
    }

    let shader = if cli.gpu {
        let path = cli.kernel.clone().unwrap_or_else(|| match cli.op {
            Operation::Matmul => PathBuf::from("kernels/multiply.wgsl"),
            Operation::VectorAdd => PathBuf::from("kernels/vector_add.wgsl"),
        });
        let shader = Shader::from_file_path(&path)
            .with_context(|| format!("failed to load kernel source {}", path.display()))?;
        Some(shader)
    } else {
        None
    };
    let path = match &shader {
        Some(shader) => ExecutionPath::Device(shader),
        None => ExecutionPath::Host,
    };

    match cli.op {
        Operation::Matmul => {
            let size = config.matrix_size as usize;
            let a = HostBuffer::filled(Shape::square(size), 3.0f32).with_name("a");
            let b = HostBuffer::filled(Shape::square(size), 2.0f32).with_name("b");

            let mut orchestrator = Orchestrator::new(config);
            let report = orchestrator.multiply(&a, &b, path).await.map_err(|err| {
                if err.is_compile_error() {
                    anyhow::Error::new(err).context("the kernel source does not build")
                } else {
                    anyhow::Error::new(err)
                }
            })?;

            if let Some(device) = &report.device {
                log::info!("computed on {device}");
            }
            println!("multiplication took {} us.", report.elapsed.as_micros());
            if cli.print {
                println!("{}", report.output.preview(10, 10));
            }
        }
        Operation::VectorAdd => {
            let len = config.vector_len as usize;
            let values: Vec<i32> = (0..len as i32).collect();
            let a = HostBuffer::from_vec(Shape::Vector(len), values.clone())?.with_name("a");
            let b = HostBuffer::from_vec(Shape::Vector(len), values)?.with_name("b");

            let mut orchestrator = Orchestrator::new(config);
            let report = orchestrator.vector_add(&a, &b, path).await?;

            println!("vector addition took {} us.", report.elapsed.as_micros());
            if cli.print {
                let rows = a.as_slice().iter().zip(b.as_slice()).zip(report.output.as_slice());
                for ((x, y), z) in rows {
                    println!("{x} + {y} = {z}");
                }
            }
        }
    }
    Ok(())
}
