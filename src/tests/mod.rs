use crate::coding::{Shader, MULTIPLY_KERNEL, VECTOR_ADD_KERNEL};
use crate::config::{DeviceSettings, OffloadConfig};
use crate::errors::OffloadError;
use crate::orchestrator::{ExecutionPath, Orchestrator, Stage};
use crate::reference::Indexing;
use crate::variable::{HostBuffer, Shape, Variable};
use ndarray::{array, Array2};

/// Configuration whose device path can never find an adapter
fn no_device_config() -> OffloadConfig {
    OffloadConfig {
        device: DeviceSettings {
            backends: wgpu::Backends::empty(),
            ..DeviceSettings::default()
        },
        ..OffloadConfig::default()
    }
}

#[tokio::test]
async fn host_multiply_constant_operands() {
    let a = HostBuffer::filled(Shape::square(2), 3.0f32);
    let b = HostBuffer::filled(Shape::square(2), 2.0f32);

    let mut orchestrator = Orchestrator::new(OffloadConfig::default());
    let report = orchestrator.multiply(&a, &b, ExecutionPath::Host).await.unwrap();

    assert_eq!(report.output.as_slice(), &[12.0; 4]);
    assert!(report.device.is_none());
    assert_eq!(orchestrator.stage(), Stage::Released);
}

#[tokio::test]
async fn host_multiply_standard_matches_ndarray() {
    let a_arr: Array2<f32> = array![[1., 2., 3.], [4., 5., 6.], [7., 8., 9.]];
    let b_arr: Array2<f32> = array![[9., 8., 7.], [6., 5., 4.], [3., 2., 1.]];
    let a = HostBuffer::from_array2(&a_arr);
    let b = HostBuffer::from_array2(&b_arr);

    let config = OffloadConfig {
        indexing: Indexing::Standard,
        ..OffloadConfig::default()
    };
    let mut orchestrator = Orchestrator::new(config);
    let report = orchestrator.multiply(&a, &b, ExecutionPath::Host).await.unwrap();

    assert_eq!(report.output.to_array2().unwrap(), a_arr.dot(&b_arr));
}

#[tokio::test]
async fn host_vector_add() {
    let a = HostBuffer::from_vec(Shape::Vector(3), vec![0, 1, 2]).unwrap();
    let b = HostBuffer::filled(Shape::Vector(3), 10);

    let mut orchestrator = Orchestrator::new(OffloadConfig::default());
    let report = orchestrator.vector_add(&a, &b, ExecutionPath::Host).await.unwrap();

    assert_eq!(report.output.as_slice(), &[10, 11, 12]);
    assert_eq!(orchestrator.stage(), Stage::Released);
}

#[tokio::test]
async fn mismatched_operands_fail_before_any_device_work() {
    let a = HostBuffer::filled(Shape::square(2), 1.0f32);
    let b = HostBuffer::filled(Shape::square(3), 1.0f32);
    let shader = Shader::from_content(MULTIPLY_KERNEL);

    let mut orchestrator = Orchestrator::new(no_device_config());
    let err = orchestrator
        .multiply(&a, &b, ExecutionPath::Device(&shader))
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::SourcesLoaded);
    assert!(matches!(err.error, OffloadError::ShapeMismatch(_)));
    assert_eq!(orchestrator.stage(), Stage::Idle);
}

#[tokio::test]
async fn indivisible_size_is_a_configuration_error() {
    let a = HostBuffer::filled(Shape::square(3), 1.0f32);
    let b = HostBuffer::filled(Shape::square(3), 2.0f32);
    let shader = Shader::from_content(MULTIPLY_KERNEL);
    let config = OffloadConfig {
        work_group_size: 32,
        ..no_device_config()
    };

    let mut orchestrator = Orchestrator::new(config);
    let err = orchestrator
        .multiply(&a, &b, ExecutionPath::Device(&shader))
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::SourcesLoaded);
    assert!(matches!(
        err.error,
        OffloadError::IndivisibleWorkSize {
            extent: 3,
            local: 32,
            ..
        }
    ));
    // the run stopped before a context was even requested
    assert_eq!(orchestrator.stage(), Stage::Idle);
}

#[tokio::test]
async fn no_adapter_fails_at_context_stage() {
    let a = HostBuffer::from_vec(Shape::Vector(4), vec![1, 2, 3, 4]).unwrap();
    let b = HostBuffer::filled(Shape::Vector(4), 1);
    let shader = Shader::from_content(VECTOR_ADD_KERNEL);
    let config = OffloadConfig {
        vector_group_size: 4,
        ..no_device_config()
    };

    let mut orchestrator = Orchestrator::new(config);
    let err = orchestrator
        .vector_add(&a, &b, ExecutionPath::Device(&shader))
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::ContextReady);
    assert!(matches!(err.error, OffloadError::AcceleratorUnavailable(_)));
    assert!(!err.is_compile_error());
    assert_eq!(orchestrator.stage(), Stage::SourcesLoaded);

    // the host path still works with the same orchestrator
    let report = orchestrator.vector_add(&a, &b, ExecutionPath::Host).await.unwrap();
    assert_eq!(report.output.as_slice(), &[2, 3, 4, 5]);
}

#[test]
fn stage_error_names_the_stage() {
    let err = crate::errors::StageError::new(
        Stage::ProgramCompiled,
        OffloadError::CompileError {
            log: "unknown identifier `sume`".to_string(),
        },
    );
    assert!(err.is_compile_error());
    let text = err.to_string();
    assert!(text.starts_with("stage ProgramCompiled failed"));
    assert!(text.contains("sume"));
}

#[test]
fn host_buffer_as_variable() {
    let buffer = HostBuffer::from_vec(Shape::Matrix { rows: 2, cols: 3 }, vec![0.0f32; 6])
        .unwrap()
        .with_name("c");
    assert_eq!(buffer.get_name(), Some("c"));
    assert_eq!(buffer.byte_size(), 24);
    assert_eq!(buffer.dimension_sizes(), [2, 3, 1]);
}
