//! Property-based invariants from spec.md §8, run over randomized
//! platform/invocation parameters with `proptest`. Each property spins up
//! its own single-threaded, paused-clock tokio runtime per case (the
//! `proptest!` macro generates plain synchronous `fn`s, so the async
//! controller has to be driven from inside each case rather than via
//! `#[tokio::test]`).

use std::sync::Arc;

use proptest::prelude::*;

use wrench_serverless_sim::{
    FunctionBody, FunctionInput, FunctionManager, HeadController, Host, Image, InvocationOutcome,
    InvocationState, Link, Platform, RandomScheduler, ServerlessConfig,
};

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("build paused current-thread runtime")
}

fn platform_with(cores: u32, ram_bytes: u64, disk_bytes: u64, flop_rate: f64, bandwidth: f64) -> Platform {
    Platform {
        head_node: Host::new("head", 4, 1 << 30, 1 << 30, flop_rate),
        repository: Host::new("repo", 1, 0, 0, 1.0e9),
        compute_nodes: vec![Host::new("n0", cores, ram_bytes, disk_bytes, flop_rate)],
        repository_link: Link::new(bandwidth, 0.0),
        head_to_node_link: Link::new(bandwidth, 0.0),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// spec.md §8: "An invocation's completion time ≥ its admission time +
    /// (image-download time if not cached) + (copy time if not cached) +
    /// (load time if not cached) + its intrinsic compute time."
    ///
    /// Every invocation in this property is cold (a fresh image per case),
    /// so all three staging terms apply.
    #[test]
    fn completion_time_never_undercuts_staging_and_compute(
        image_bytes in 1_000_000u64..200_000_000u64,
        flops in 1.0e8f64..1.0e10f64,
        flop_rate in 1.0e9f64..1.0e10f64,
        bandwidth in 1.0e7f64..1.0e9f64,
    ) {
        let runtime = paused_runtime();
        runtime.block_on(async move {
            let platform = platform_with(4, 64 << 30, 1 << 40, flop_rate, bandwidth);
            let handle = HeadController::spawn(platform, ServerlessConfig::default(), Arc::new(RandomScheduler::with_seed(1)));
            let manager = FunctionManager::new(handle);

            let image = Image::new("img", image_bytes);
            let function = manager.create_function("f", FunctionBody::Flops(flops), image);
            let registered = manager
                .register_function(function, 3600.0, 1 << 30, 1 << 30, 0, 0)
                .await
                .expect("registration succeeds within capacity");

            let invocation = manager
                .invoke_function(registered, FunctionInput::default())
                .await
                .expect("invocation admitted");
            let outcome = manager.wait_one(invocation).await;
            prop_assert!(matches!(outcome, InvocationOutcome::Completed(_)));

            let info = manager.invocation_info(invocation).await.expect("invocation recorded");
            let started = info.started_at_secs.expect("completed invocation has a start time");
            let ended = info.ended_at_secs.expect("completed invocation has an end time");

            let download_secs = image_bytes as f64 / bandwidth;
            let copy_secs = image_bytes as f64 / bandwidth;
            let load_secs = image_bytes as f64 / bandwidth;
            let compute_secs = flops / flop_rate;
            let staging_lower_bound = download_secs + copy_secs + load_secs;

            // Compute starts only once the image is resident in RAM, so the
            // time from admission to compute-start alone must cover staging.
            prop_assert!(
                started - info.admitted_at_secs >= staging_lower_bound - 1e-6,
                "start-admitted {} below staging lower bound {}",
                started - info.admitted_at_secs,
                staging_lower_bound
            );
            prop_assert!(
                ended - started >= compute_secs - 1e-6,
                "end-start {} below compute lower bound {}",
                ended - started,
                compute_secs
            );
            Ok(())
        })?;
    }

    /// spec.md §3 invariant 1 (by construction, via the state machine) and
    /// §8: "Each invocation transitions through states monotonically;
    /// terminal states are absorbing." Observed here as admitted ≤ started
    /// ≤ ended and a `Done` terminal state once `wait_one` returns.
    #[test]
    fn invocation_timestamps_are_monotonic(
        flops in 1.0e8f64..1.0e10f64,
        ram_limit in 1u64..(1u64 << 30),
    ) {
        let runtime = paused_runtime();
        runtime.block_on(async move {
            let platform = platform_with(4, 64 << 30, 1 << 40, 5.0e9, 1.0e9);
            let handle = HeadController::spawn(platform, ServerlessConfig::default(), Arc::new(RandomScheduler::with_seed(2)));
            let manager = FunctionManager::new(handle);

            let image = Image::new("img", 1_000_000);
            let function = manager.create_function("f", FunctionBody::Flops(flops), image);
            let registered = manager
                .register_function(function, 3600.0, 1 << 30, ram_limit, 0, 0)
                .await
                .expect("ram_limit stays within the single node's capacity");

            let invocation = manager
                .invoke_function(registered, FunctionInput::default())
                .await
                .expect("invocation admitted");
            manager.wait_one(invocation).await;

            let info = manager.invocation_info(invocation).await.expect("invocation recorded");
            prop_assert_eq!(info.state, InvocationState::Done);
            let started = info.started_at_secs.expect("started");
            let ended = info.ended_at_secs.expect("ended");
            prop_assert!(info.admitted_at_secs <= started);
            prop_assert!(started <= ended);
            Ok(())
        })?;
    }

    /// spec.md §3 invariant 4: "free_ram[n] ≥ 0 ... at all times; likewise
    /// free_disk[n] ≥ 0 ... and free_head_disk ≥ 0." Free budgets are
    /// `u64`/`u32`, so any overdraw would already have panicked on
    /// subtraction overflow; this property additionally checks the
    /// upper bound — free resources can never exceed what the platform
    /// was built with, i.e. the controller never fabricates capacity.
    #[test]
    fn free_resources_never_exceed_node_capacity(
        // Large enough that a 1 MB image's RAM/disk reservations plus a
        // quarter-capacity ram_limit/disk_limit never collide.
        ram_bytes in (8u64 << 20)..(1u64 << 34),
        disk_bytes in (8u64 << 20)..(1u64 << 34),
        cores in 1u32..16u32,
    ) {
        let runtime = paused_runtime();
        runtime.block_on(async move {
            let platform = platform_with(cores, ram_bytes, disk_bytes, 5.0e9, 1.0e9);
            let handle = HeadController::spawn(platform, ServerlessConfig::default(), Arc::new(RandomScheduler::with_seed(3)));
            let manager = FunctionManager::new(handle);

            let image = Image::new("img", 1_000_000);
            let function = manager.create_function("f", FunctionBody::Flops(1.0e9), image);
            let registered = manager
                .register_function(function, 3600.0, (disk_bytes / 4).max(1), (ram_bytes / 4).max(1), 0, 0)
                .await
                .expect("registration within capacity");

            let invocation = manager
                .invoke_function(registered, FunctionInput::default())
                .await
                .expect("invocation admitted");
            manager.wait_one(invocation).await;

            let snapshot = manager.resource_snapshot().await.expect("controller still running");
            prop_assert!(snapshot.free_ram["n0"] <= ram_bytes);
            prop_assert!(snapshot.free_disk["n0"] <= disk_bytes);
            prop_assert!(snapshot.free_cores["n0"] <= cores);
            // The one invocation has completed and released every
            // scratch/compute reservation it held; cores are back to full
            // idle capacity. RAM and disk stay reduced by the image now
            // resident there, per the data model — images are never
            // evicted, so both budgets remain down by the image size.
            prop_assert_eq!(snapshot.free_disk["n0"], disk_bytes - 1_000_000);
            prop_assert_eq!(snapshot.free_cores["n0"], cores);
            Ok(())
        })?;
    }
}
