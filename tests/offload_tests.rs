extern crate wgpu_offload;

use ndarray::Array2;
use wgpu_offload::coding::{Shader, ELEMENT_TOKEN, MULTIPLY_KERNEL, TILE_TOKEN, VECTOR_ADD_KERNEL};
use wgpu_offload::config::{DeviceSettings, OffloadConfig};
use wgpu_offload::errors::OffloadError;
use wgpu_offload::interface::{Access, ExecutionContext};
use wgpu_offload::orchestrator::{ExecutionPath, Orchestrator, Stage};
use wgpu_offload::partition::{compute_geometry, DispatchGeometry};
use wgpu_offload::program::{KernelArg, Param, Program};
use wgpu_offload::reference::{self, Indexing};
use wgpu_offload::variable::{HostBuffer, Shape};

const MATMUL_PARAMS: [Param; 4] = [
    Param::Scalar,
    Param::Buffer(Access::ReadOnly),
    Param::Buffer(Access::ReadOnly),
    Param::Buffer(Access::WriteOnly),
];

/// Opens a context on the default adapter, `None` when the machine has no usable one
async fn context() -> Option<ExecutionContext> {
    match ExecutionContext::acquire(&DeviceSettings::default()).await {
        Ok(context) => Some(context),
        Err(err) => {
            eprintln!("skipping device test: {err}");
            None
        }
    }
}

fn multiply_shader(tile: u32) -> Shader {
    let mut shader = Shader::from_content(MULTIPLY_KERNEL);
    shader.replace(TILE_TOKEN, &tile.to_string());
    shader
}

#[tokio::test]
async fn staging_round_trip() {
    let Some(mut context) = context().await else {
        return;
    };
    let data = HostBuffer::from_vec(Shape::Vector(4), vec![1.0f32, 2.0, 3.0, 4.0]).unwrap();

    let buffer = context
        .allocate(Access::ReadWrite, 16, Some("round trip"))
        .await
        .unwrap();
    assert_eq!(context.live_buffers(), 1);
    context.write_buffer(&buffer, &data).unwrap();

    let mut back = HostBuffer::<f32>::zeros(Shape::Vector(4));
    context.read_buffer(&buffer, &mut back).await.unwrap();
    assert_eq!(back, data);

    let mut short = HostBuffer::<f32>::zeros(Shape::Vector(2));
    assert!(matches!(
        context.read_buffer(&buffer, &mut short).await,
        Err(OffloadError::SizeMismatch { expected: 16, actual: 8 })
    ));

    context.release_buffer(buffer).unwrap();
    assert_eq!(context.live_buffers(), 0);

    // kernels can't write a read-only buffer, the host still stages it both ways
    let read_only = context.allocate(Access::ReadOnly, 16, Some("read only")).await.unwrap();
    context.write_buffer(&read_only, &data).unwrap();
    let mut back = HostBuffer::<f32>::zeros(Shape::Vector(4));
    context.read_buffer(&read_only, &mut back).await.unwrap();
    assert_eq!(back, data);
}

#[tokio::test]
async fn allocation_must_be_positive_and_aligned() {
    let Some(mut context) = context().await else {
        return;
    };
    assert!(matches!(
        context.allocate(Access::ReadOnly, 0, None).await,
        Err(OffloadError::InvalidAllocation(_))
    ));
    assert!(matches!(
        context.allocate(Access::ReadOnly, 6, None).await,
        Err(OffloadError::InvalidAllocation(_))
    ));
    let too_big = context.limits().max_buffer_size.saturating_add(4) & !3;
    assert!(matches!(
        context.allocate(Access::ReadOnly, too_big, None).await,
        Err(OffloadError::OutOfDeviceMemory { .. })
    ));
}

#[tokio::test]
async fn release_is_idempotent() {
    let Some(mut context) = context().await else {
        return;
    };
    let _buffer = context.allocate(Access::WriteOnly, 64, None).await.unwrap();

    context.release();
    assert!(context.is_released());
    assert_eq!(context.live_buffers(), 0);
    context.release();

    assert!(matches!(
        context.allocate(Access::WriteOnly, 64, None).await,
        Err(OffloadError::ContextReleased)
    ));
}

#[tokio::test]
async fn device_multiply_matches_host() {
    if context().await.is_none() {
        return;
    }
    let a = HostBuffer::filled(Shape::square(3), 1.0f32).with_name("a");
    let b = HostBuffer::filled(Shape::square(3), 2.0f32).with_name("b");
    let shader = Shader::from_content(MULTIPLY_KERNEL);
    let config = OffloadConfig {
        work_group_size: 3,
        ..OffloadConfig::default()
    };

    let mut orchestrator = Orchestrator::new(config);
    let report = orchestrator
        .multiply(&a, &b, ExecutionPath::Device(&shader))
        .await
        .unwrap();
    assert_eq!(orchestrator.stage(), Stage::Released);
    assert!(report.device.is_some());

    let expected = reference::multiply(&a, &b, Indexing::Legacy).unwrap();
    for (got, want) in report.output.as_slice().iter().zip(expected.as_slice()) {
        assert!((got - want).abs() < 1e-5, "{got} != {want}");
    }
}

#[tokio::test]
async fn device_standard_multiply_matches_ndarray() {
    if context().await.is_none() {
        return;
    }
    let a_arr = Array2::from_shape_fn((4, 4), |(r, c)| (r * 4 + c) as f32);
    let b_arr = Array2::from_shape_fn((4, 4), |(r, c)| (r as f32) - (c as f32) * 0.5);
    let a = HostBuffer::from_array2(&a_arr);
    let b = HostBuffer::from_array2(&b_arr);
    let shader = Shader::from_content(MULTIPLY_KERNEL);
    let config = OffloadConfig {
        work_group_size: 2,
        indexing: Indexing::Standard,
        ..OffloadConfig::default()
    };

    let mut orchestrator = Orchestrator::new(config);
    let report = orchestrator
        .multiply(&a, &b, ExecutionPath::Device(&shader))
        .await
        .unwrap();

    let expected = a_arr.dot(&b_arr);
    let got = report.output.to_array2().unwrap();
    for (g, e) in got.iter().zip(expected.iter()) {
        assert!((g - e).abs() < 1e-4, "{g} != {e}");
    }
}

#[tokio::test]
async fn device_vector_add() {
    if context().await.is_none() {
        return;
    }
    let shader = Shader::from_content(VECTOR_ADD_KERNEL);
    let config = OffloadConfig {
        vector_group_size: 64,
        ..OffloadConfig::default()
    };
    let mut orchestrator = Orchestrator::new(config);

    let values: Vec<i32> = (0..256).collect();
    let a = HostBuffer::from_vec(Shape::Vector(256), values.clone()).unwrap();
    let b = HostBuffer::from_vec(Shape::Vector(256), values).unwrap();
    let report = orchestrator
        .vector_add(&a, &b, ExecutionPath::Device(&shader))
        .await
        .unwrap();
    assert_eq!(report.output, reference::vector_add(&a, &b).unwrap());

    let x = HostBuffer::filled(Shape::Vector(128), 0.25f32);
    let y = HostBuffer::filled(Shape::Vector(128), 0.5f32);
    let report = orchestrator
        .vector_add(&x, &y, ExecutionPath::Device(&shader))
        .await
        .unwrap();
    assert_eq!(report.output.as_slice(), &[0.75f32; 128][..]);
}

#[tokio::test]
async fn broken_source_is_a_compile_error() {
    let Some(mut context) = context().await else {
        return;
    };
    let shader = Shader::from_content("@compute @workgroup_size(1) fn main() { let x = ; }");
    assert!(matches!(
        Program::compile(&mut context, &shader).await,
        Err(OffloadError::CompileError { .. })
    ));

    let a = HostBuffer::filled(Shape::square(2), 1.0f32);
    let config = OffloadConfig {
        work_group_size: 2,
        ..OffloadConfig::default()
    };
    let mut orchestrator = Orchestrator::new(config);
    let err = orchestrator
        .multiply(&a, &a, ExecutionPath::Device(&shader))
        .await
        .unwrap_err();
    assert_eq!(err.stage, Stage::ProgramCompiled);
    assert!(err.is_compile_error());
    assert_eq!(orchestrator.stage(), Stage::ContextReady);
}

#[tokio::test]
async fn unknown_entry_point() {
    let Some(mut context) = context().await else {
        return;
    };
    let program = Program::compile(&mut context, &multiply_shader(8)).await.unwrap();
    assert_eq!(program.build_log(), "");
    match program.create_kernel(&mut context, "MultiplyMatrix", &MATMUL_PARAMS).await {
        Err(OffloadError::EntryPointNotFound {
            entry_point,
            available,
        }) => {
            assert_eq!(entry_point, "MultiplyMatrix");
            assert_eq!(available, vec!["MultiplyMatrices", "MultiplyMatricesStandard"]);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn dispatch_checks_arguments_and_geometry() {
    let Some(mut context) = context().await else {
        return;
    };
    let program = Program::compile(&mut context, &multiply_shader(4)).await.unwrap();
    let mut kernel = program
        .create_kernel(&mut context, "MultiplyMatrices", &MATMUL_PARAMS)
        .await
        .unwrap();
    assert_eq!(kernel.workgroup_size(), Some([4, 4, 1]));

    let input = context.allocate(Access::ReadOnly, 256, Some("input")).await.unwrap();
    let output = context.allocate(Access::WriteOnly, 256, Some("output")).await.unwrap();

    // a read-only buffer can't serve a written parameter
    assert!(matches!(
        kernel.bind(3, KernelArg::Buffer(&input)),
        Err(OffloadError::InvalidArgument { index: 3, .. })
    ));
    assert!(matches!(
        kernel.bind(4, KernelArg::Scalar(8)),
        Err(OffloadError::InvalidArgument { index: 4, .. })
    ));
    assert!(matches!(
        kernel.bind(1, KernelArg::Scalar(8)),
        Err(OffloadError::InvalidArgument { index: 1, .. })
    ));

    kernel.bind(0, KernelArg::Scalar(8)).unwrap();
    kernel.bind(1, KernelArg::Buffer(&input)).unwrap();
    kernel.bind(2, KernelArg::Buffer(&input)).unwrap();
    assert!(!kernel.is_fully_bound());

    let geometry = compute_geometry(&[8, 8], 4).unwrap();
    assert!(matches!(
        context.submit(&kernel, &geometry).await,
        Err(OffloadError::DispatchRejected(_))
    ));

    kernel.bind(3, KernelArg::Buffer(&output)).unwrap();
    assert!(kernel.is_fully_bound());

    // the kernel declares 4x4 workgroups
    let mismatched = DispatchGeometry::new(&[8, 8], &[2, 2]).unwrap();
    assert!(matches!(
        context.submit(&kernel, &mismatched).await,
        Err(OffloadError::DispatchRejected(_))
    ));

    let submission = context.submit(&kernel, &geometry).await.unwrap();
    assert_eq!(submission.sequence(), 1);
    assert_eq!(submission.entry_point(), "MultiplyMatrices");
    context.wait_all().unwrap();
}

#[tokio::test]
async fn handles_are_bound_to_their_context() {
    let (Some(mut first), Some(mut second)) = (context().await, context().await) else {
        return;
    };
    let foreign = first.allocate(Access::ReadOnly, 64, None).await.unwrap();

    let program = Program::compile(&mut second, &multiply_shader(2)).await.unwrap();
    let mut kernel = program
        .create_kernel(&mut second, "MultiplyMatrices", &MATMUL_PARAMS)
        .await
        .unwrap();
    assert!(matches!(
        kernel.bind(1, KernelArg::Buffer(&foreign)),
        Err(OffloadError::ForeignHandle { .. })
    ));
    assert!(matches!(
        second.release_buffer(foreign),
        Err(OffloadError::ForeignHandle { .. })
    ));
}

#[tokio::test]
async fn failure_after_staging_is_torn_down() {
    if context().await.is_none() {
        return;
    }
    // literal 4x4 workgroups, the configuration asks for 2x2
    let shader = multiply_shader(4);
    let config = OffloadConfig {
        work_group_size: 2,
        ..OffloadConfig::default()
    };
    let a = HostBuffer::filled(Shape::square(4), 1.0f32);

    let mut orchestrator = Orchestrator::new(config);
    let err = orchestrator
        .multiply(&a, &a, ExecutionPath::Device(&shader))
        .await
        .unwrap_err();
    assert_eq!(err.stage, Stage::Dispatched);
    assert!(matches!(err.error, OffloadError::DispatchRejected(_)));
    assert_eq!(orchestrator.stage(), Stage::ArgumentsBound);

    // nothing leaked: the same orchestrator runs again with a matching tile
    let report = orchestrator
        .multiply(&a, &a, ExecutionPath::Device(&multiply_shader(2)))
        .await
        .unwrap();
    assert_eq!(report.output.as_slice(), &[4.0f32; 16][..]);
}

#[tokio::test]
async fn rebinding_an_argument_changes_what_the_kernel_reads() {
    let Some(mut context) = context().await else {
        return;
    };
    let mut shader = Shader::from_content(VECTOR_ADD_KERNEL);
    shader.replace(TILE_TOKEN, "4");
    shader.replace(ELEMENT_TOKEN, "f32");
    let program = Program::compile(&mut context, &shader).await.unwrap();
    let mut kernel = program
        .create_kernel(
            &mut context,
            "vector_add",
            &[
                Param::Buffer(Access::ReadOnly),
                Param::Buffer(Access::ReadOnly),
                Param::Buffer(Access::WriteOnly),
            ],
        )
        .await
        .unwrap();

    let ones = HostBuffer::filled(Shape::Vector(4), 1.0f32);
    let fives = HostBuffer::filled(Shape::Vector(4), 5.0f32);
    let x = context.allocate(Access::ReadOnly, 16, Some("x")).await.unwrap();
    let y = context.allocate(Access::ReadOnly, 16, Some("y")).await.unwrap();
    let out = context.allocate(Access::WriteOnly, 16, Some("out")).await.unwrap();
    context.write_buffer(&x, &ones).unwrap();
    context.write_buffer(&y, &fives).unwrap();

    kernel.bind(0, KernelArg::Buffer(&x)).unwrap();
    kernel.bind(1, KernelArg::Buffer(&x)).unwrap();
    kernel.bind(0, KernelArg::Buffer(&y)).unwrap();
    kernel.bind(2, KernelArg::Buffer(&out)).unwrap();

    let geometry = compute_geometry(&[4], 4).unwrap();
    context.submit(&kernel, &geometry).await.unwrap();
    context.wait_all().unwrap();

    let mut result = HostBuffer::<f32>::zeros(Shape::Vector(4));
    context.read_buffer(&out, &mut result).await.unwrap();
    assert_eq!(result, reference::vector_add(&fives, &ones).unwrap());
}
