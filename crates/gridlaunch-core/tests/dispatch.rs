//! Dispatcher tests against the in-process recording backend.
//!
//! Covers:
//! - Typed and handle-based launches forwarding values unchanged
//! - Default-stream convenience entry points
//! - Ordering of repeated launches on one stream
//! - Verbatim propagation of backend rejections, without retries
//! - The unchecked handle signature contract

use std::sync::Arc;
use std::thread;

use gridlaunch_core::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

type VectorAddArgs = (DevicePtr<f32>, DevicePtr<f32>, DevicePtr<f32>, u32);

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[test]
fn test_launch_forwards_configuration_unchanged() {
    init_tracing();
    let backend = RecordingBackend::default();
    let kernel = backend.register_typed::<VectorAddArgs>("vector_add");

    let config = make_launch_config(Dimensions::new(256, 1, 1), Dimensions::new(128, 1, 1), 0);
    let a = DevicePtr::from_addr(0x1_0000);
    let b = DevicePtr::from_addr(0x2_0000);
    let c = DevicePtr::from_addr(0x3_0000);

    let result = launch_on_default(&backend, &kernel, &config, (a, b, c, 32768));
    assert!(result.is_ok());

    assert_eq!(backend.attempts(), 1);
    let commands = backend.commands(StreamId::DEFAULT);
    assert_eq!(commands.len(), 1);

    let record = &commands[0];
    assert_eq!(record.kernel, "vector_add");
    assert_eq!(record.function, kernel.handle().raw());
    assert_eq!(record.stream, StreamId::DEFAULT);
    assert_eq!(record.config.grid, Dimensions::new(256, 1, 1));
    assert_eq!(record.config.block, Dimensions::new(128, 1, 1));
    assert_eq!(record.config.dynamic_shared_memory, 0);
    assert_eq!(record.argument::<DevicePtr<f32>>(0), Some(a));
    assert_eq!(record.argument::<DevicePtr<f32>>(2), Some(c));
    assert_eq!(record.argument::<u32>(3), Some(32768));
}

#[test]
fn test_oversized_shared_memory_is_reported_not_retried() {
    init_tracing();
    let limits = DeviceLimits::builder().with_max_shared_memory(65536).build();
    let backend = RecordingBackend::new(limits);
    let kernel = backend.register_typed::<(DevicePtr<f32>, u32)>("reduce");

    let config = LaunchConfig::new(Dimensions::linear(64), Dimensions::linear(256))
        .with_shared_memory(70000);
    let err = launch_on_default(&backend, &kernel, &config, (DevicePtr::null(), 0))
        .expect_err("70000 bytes exceeds the 64 KiB ceiling");

    assert_eq!(
        err,
        HostLaunchError::InvalidConfiguration(LimitViolation::SharedMemory {
            requested: 70000,
            limit: 65536,
        })
    );
    assert_eq!(backend.attempts(), 1, "exactly one enqueue attempt");
    assert!(backend.all_commands().is_empty(), "nothing recorded, nothing clamped");
}

#[test]
fn test_empty_configuration_reaches_backend() {
    let backend = RecordingBackend::default();
    let kernel = backend.register_typed::<()>("noop");
    let config = LaunchConfig::new(Dimensions::new(0, 1, 1), Dimensions::linear(32));

    let err = launch_on_default(&backend, &kernel, &config, ()).unwrap_err();
    assert!(matches!(
        err,
        HostLaunchError::InvalidConfiguration(LimitViolation::EmptyGrid { .. })
    ));
    assert_eq!(backend.attempts(), 1);
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_repeated_launch_enqueues_two_ordered_commands() {
    let backend = RecordingBackend::default();
    let kernel = backend.register_typed::<(u32,)>("step");
    let stream = backend.create_stream();

    let first = LaunchConfig::for_elements(4096, 128);
    let second = LaunchConfig::for_elements(4096, 128);
    assert_eq!(first, second);

    launch(&backend, &kernel, &first, stream, (1,)).unwrap();
    launch(&backend, &kernel, &second, stream, (2,)).unwrap();

    let commands = backend.commands(stream);
    assert_eq!(commands.len(), 2);
    assert!(commands[0].sequence < commands[1].sequence);
    assert_eq!(commands[0].argument::<u32>(0), Some(1));
    assert_eq!(commands[1].argument::<u32>(0), Some(2));
    assert_eq!(commands[0].config, commands[1].config);
}

#[test]
fn test_streams_keep_separate_command_lists() {
    let backend = RecordingBackend::default();
    let kernel = backend.register_typed::<(u32,)>("tagged");
    let s1 = backend.create_stream();
    let s2 = backend.create_stream();
    let config = LaunchConfig::new(Dimensions::linear(1), Dimensions::linear(32));

    for i in 0..5u32 {
        let stream = if i % 2 == 0 { s1 } else { s2 };
        launch(&backend, &kernel, &config, stream, (i,)).unwrap();
    }

    let tags = |stream| -> Vec<u32> {
        backend
            .commands(stream)
            .iter()
            .map(|record| record.argument::<u32>(0).unwrap())
            .collect()
    };
    assert_eq!(tags(s1), vec![0, 2, 4]);
    assert_eq!(tags(s2), vec![1, 3]);
    assert!(backend.commands(StreamId::DEFAULT).is_empty());
}

#[test]
fn test_concurrent_enqueue_preserves_per_thread_order() {
    let backend = Arc::new(RecordingBackend::default());
    let kernel = backend.register_typed::<(u32, u32)>("worker");
    let stream = backend.create_stream();
    let config = LaunchConfig::new(Dimensions::linear(8), Dimensions::linear(64));

    let handles: Vec<_> = (0..4u32)
        .map(|thread_id| {
            let backend = Arc::clone(&backend);
            thread::spawn(move || {
                for step in 0..100u32 {
                    launch(&*backend, &kernel, &config, stream, (thread_id, step)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let commands = backend.commands(stream);
    assert_eq!(commands.len(), 400);
    for thread_id in 0..4u32 {
        let steps: Vec<u32> = commands
            .iter()
            .filter(|record| record.argument::<u32>(0) == Some(thread_id))
            .map(|record| record.argument::<u32>(1).unwrap())
            .collect();
        assert_eq!(steps, (0..100).collect::<Vec<_>>());
    }
}

// ============================================================================
// Handle-based path
// ============================================================================

#[test]
fn test_handle_launch_matches_typed_launch() {
    let backend = RecordingBackend::default();
    let typed = backend.register_typed::<(DevicePtr<u32>, u32)>("fill");
    let handle: KernelHandle = typed.into();
    let config = LaunchConfig::for_elements(1000, 128);
    let out = DevicePtr::<u32>::from_addr(0x4000);

    launch_on_default(&backend, &typed, &config, (out, 9)).unwrap();
    unsafe {
        launch_handle_on_default(&backend, handle, &config, (out, 9u32)).unwrap();
    }

    let commands = backend.commands(StreamId::DEFAULT);
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].function, commands[1].function);
    assert_eq!(commands[0].config, commands[1].config);
    assert_eq!(commands[0].arguments, commands[1].arguments);
}

#[test]
fn test_handle_launch_on_explicit_stream() {
    let backend = RecordingBackend::default();
    let handle = backend.register_kernel("library_kernel");
    let stream = backend.create_stream();
    let config = LaunchConfig::new(Dimensions::planar(16, 16), Dimensions::planar(8, 8));

    unsafe {
        launch_handle(&backend, handle, &config, stream, (1.0f32, 2.0f32)).unwrap();
    }
    assert_eq!(backend.commands(stream).len(), 1);
    assert_eq!(backend.commands(stream)[0].config.grid.dimensionality(), 2);
}

/// The handle carries no signature and the device does not check arguments:
/// a launch with the wrong parameter list is accepted and forwarded as-is.
/// Matching the real signature is the caller's job.
#[test]
fn test_handle_signature_mismatch_is_not_detected() {
    let backend = RecordingBackend::default();
    let typed = backend.register_typed::<(DevicePtr<f32>, u32)>("expects_ptr_and_len");
    let handle = typed.handle();
    let config = LaunchConfig::new(Dimensions::linear(1), Dimensions::linear(32));

    // Wrong: three u8 instead of (pointer, u32).
    let result = unsafe { launch_handle_on_default(&backend, handle, &config, (1u8, 2u8, 3u8)) };
    assert!(result.is_ok());

    let record = &backend.commands(StreamId::DEFAULT)[0];
    assert_eq!(record.arguments.len(), 3);
    assert_eq!(record.argument::<DevicePtr<f32>>(0), None);
}

#[test]
fn test_unknown_handle_status_propagates() {
    let backend = RecordingBackend::default();
    let elsewhere = RecordingBackend::default();
    let foreign = elsewhere.register_kernel("foreign");
    let config = LaunchConfig::new(Dimensions::linear(1), Dimensions::linear(1));

    let err = unsafe { launch_handle_on_default(&backend, foreign, &config, ()) }.unwrap_err();
    assert_eq!(err, HostLaunchError::InvalidHandle(foreign.raw()));
}

#[test]
fn test_backend_by_reference() {
    let backend = RecordingBackend::default();
    let kernel = backend.register_typed::<()>("noop");
    let by_ref: &RecordingBackend = &backend;
    let config = LaunchConfig::new(Dimensions::linear(1), Dimensions::linear(1));

    launch_on_default(&by_ref, &&kernel, &config, ()).unwrap();
    assert_eq!(backend.attempts(), 1);
}
