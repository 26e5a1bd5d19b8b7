//! Robot 构建、启动与停止

mod common;

use common::{Rig, fast_config};
use std::sync::Arc;
use std::time::Duration;
use stretch_device::mock::{Action, MockWristBoard};
use stretch_device::{Device, Shared, WristBoard, shared};
use stretch_driver::{
    AsyncRecordingHook, DEFAULT_HISTORY_CAPACITY, DriverError, RobotBuilder, RobotConfig,
    StatusOrigin, WaccRegistry,
};

const DEVICE_ORDER: [&str; 7] = ["pimu", "base", "lift", "arm", "head", "wacc", "end_of_arm"];

#[test]
fn test_startup_and_stop_lifecycle() {
    let rig = Rig::new();
    let mut robot = rig.robot(fast_config());
    assert!(!robot.is_running());

    robot.startup().unwrap();
    assert!(robot.is_running());
    assert_eq!(
        rig.journal.devices_where(|e| e.action == Action::Startup),
        DEVICE_ORDER
    );
    // 启动返回时两个线程都已产出状态
    let status = robot.get_status();
    assert!(status.timestamps.non_dynamixel_wall_time.is_set());
    assert!(status.timestamps.dynamixel_wall_time.is_set());

    std::thread::sleep(Duration::from_millis(400));
    assert_eq!(robot.status_history_ids().len(), DEFAULT_HISTORY_CAPACITY);

    robot.stop();
    assert!(!robot.is_running());
    assert_eq!(
        rig.journal.devices_where(|e| e.action == Action::Stop),
        DEVICE_ORDER
    );

    // 设备停止后不再有拉取
    let stop_index = rig
        .journal
        .index_of(|e| e.action == Action::Stop)
        .unwrap();
    let last_pull = rig
        .journal
        .events()
        .iter()
        .rposition(|e| e.action == Action::PullStatus)
        .unwrap();
    assert!(last_pull < stop_index);

    let newest = robot.latest_entry().id;
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(robot.latest_entry().id, newest);
}

#[test]
fn test_startup_twice_is_rejected_and_stop_is_idempotent() {
    let rig = Rig::new();
    let mut robot = rig.robot(fast_config());
    robot.startup().unwrap();

    assert!(matches!(robot.startup(), Err(DriverError::AlreadyRunning)));

    robot.stop();
    robot.stop();
    assert_eq!(rig.journal.count("pimu", &Action::Stop), 1);
}

#[test]
fn test_restart_after_stop() {
    let rig = Rig::new();
    let mut robot = rig.robot(fast_config());
    robot.startup().unwrap();
    robot.stop();
    let before = robot.latest_entry().id;

    robot.startup().unwrap();
    assert!(robot.is_running());
    assert!(robot.latest_entry().id > before);
    robot.stop();
}

#[test]
fn test_stop_waits_for_slow_pull_before_stopping_devices() {
    let rig = Rig::new();
    let mut robot = rig.robot(fast_config());
    robot.startup().unwrap();

    rig.end_of_arm
        .lock()
        .delay_next_pull(Duration::from_millis(2500));
    // 让 Dynamixel 线程进入慢速拉取
    std::thread::sleep(Duration::from_millis(100));

    let started = std::time::Instant::now();
    robot.stop();
    assert!(started.elapsed() >= Duration::from_secs(2));

    let events = rig.journal.events();
    let first_stop = events
        .iter()
        .position(|e| e.action == Action::Stop)
        .unwrap();
    let pulls_after_stop: Vec<&str> = events[first_stop..]
        .iter()
        .filter(|e| e.action == Action::PullStatus)
        .map(|e| e.device.as_str())
        .collect();
    assert!(pulls_after_stop.is_empty(), "pulled after stop: {:?}", pulls_after_stop);
}

#[test]
fn test_failed_device_startup_does_not_abort() {
    let rig = Rig::new();
    rig.lift.lock().set_startup_ok(false);
    let mut robot = rig.robot(fast_config());

    robot.startup().unwrap();

    assert_eq!(rig.journal.count_where(|e| e.action == Action::Startup), 7);
    assert!(!rig.lift.lock().is_started());
    assert!(rig.end_of_arm.lock().is_started());
    robot.stop();
}

#[test]
fn test_configured_sync_mode_is_applied() {
    let rig = Rig::new();
    let config = RobotConfig {
        sync_mode_enabled: true,
        ..fast_config()
    };
    let mut robot = rig.robot(config);

    robot.startup().unwrap();

    assert!(robot.sync_mode_enabled());
    std::thread::sleep(Duration::from_millis(100));
    assert!(rig.journal.count("pimu", &Action::StatusSync) > 0);
    assert!(rig.journal.count("wacc", &Action::StatusSync) > 0);
    robot.stop();
}

#[test]
fn test_drop_stops_devices() {
    let rig = Rig::new();
    {
        let mut robot = rig.robot(fast_config());
        robot.startup().unwrap();
    }
    assert_eq!(
        rig.journal.devices_where(|e| e.action == Action::Stop),
        DEVICE_ORDER
    );
}

#[test]
fn test_recording_hook_sees_both_loops() {
    let rig = Rig::new();
    let mut robot = rig.robot(fast_config());
    let (hook, rx) = AsyncRecordingHook::new();
    let hook = Arc::new(hook);
    robot.add_status_callback(hook.clone());

    robot.startup().unwrap();
    std::thread::sleep(Duration::from_millis(200));
    robot.stop();

    let recorded: Vec<_> = rx.try_iter().collect();
    assert!(!recorded.is_empty());
    let mut ids: Vec<u64> = recorded.iter().map(|r| r.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), recorded.len());
    assert!(recorded.iter().any(|r| r.origin == StatusOrigin::NonDynamixel));
    assert!(recorded.iter().any(|r| r.origin == StatusOrigin::Dynamixel));
    assert_eq!(hook.dropped_count(), 0);

    let metrics = robot.metrics().snapshot();
    assert_eq!(metrics.snapshots_appended, hook.recorded_count());
    assert!(metrics.non_dynamixel_iterations > 0);
    assert!(metrics.dynamixel_iterations > metrics.non_dynamixel_iterations);
}

#[test]
fn test_build_reports_missing_device() {
    let rig = Rig::new();
    let result = RobotBuilder::new()
        .pimu(rig.pimu.clone())
        .base(rig.base.clone())
        .lift(rig.lift.clone())
        .head(rig.head.clone())
        .wacc(rig.wacc.clone())
        .end_of_arm(rig.end_of_arm.clone())
        .build();

    assert!(matches!(result, Err(DriverError::MissingDevice("arm"))));
}

#[test]
fn test_build_rejects_invalid_config() {
    let rig = Rig::new();
    let mut config = fast_config();
    config.history_capacity = 0;

    let result = rig.builder().config(config).build();
    assert!(matches!(result, Err(DriverError::Config(_))));
}

#[test]
fn test_custom_wacc_from_registry() {
    let rig = Rig::new();
    let custom: Shared<MockWristBoard> =
        shared(MockWristBoard::named("wacc_with_sensor", rig.journal.clone()));
    let mut registry = WaccRegistry::new();
    let factory_handle = custom.clone();
    registry
        .register("wacc_with_sensor", move |_config: &RobotConfig| {
            factory_handle.clone() as Shared<dyn WristBoard>
        })
        .unwrap();

    let config = RobotConfig {
        custom_wacc: Some("wacc_with_sensor".to_string()),
        ..fast_config()
    };
    let mut robot = RobotBuilder::new()
        .config(config)
        .pimu(rig.pimu.clone())
        .base(rig.base.clone())
        .lift(rig.lift.clone())
        .arm(rig.arm.clone())
        .head(rig.head.clone())
        .end_of_arm(rig.end_of_arm.clone())
        .wacc_registry(registry)
        .build()
        .unwrap();

    assert_eq!(robot.devices().wacc.lock().name(), "wacc_with_sensor");
    robot.startup().unwrap();
    robot.stop();
    assert!(custom.lock().pull_count() > 0);
    assert_eq!(rig.wacc.lock().pull_count(), 0);
}

#[test]
fn test_unknown_custom_wacc() {
    let rig = Rig::new();
    let config = RobotConfig {
        custom_wacc: Some("missing_wacc".to_string()),
        ..fast_config()
    };

    match rig.builder().config(config).build() {
        Err(DriverError::UnknownDevice(name)) => assert_eq!(name, "missing_wacc"),
        other => panic!("expected UnknownDevice, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_status_report_carries_identity_and_status() {
    let rig = Rig::new();
    let config = RobotConfig {
        serial_no: "stretch-re2-3003".to_string(),
        batch_name: "irma".to_string(),
        ..fast_config()
    };
    let mut robot = rig.robot(config);
    robot.startup().unwrap();

    let report = robot.status_report();
    robot.pretty_print();
    robot.stop();

    assert_eq!(report.serial_no, "stretch-re2-3003");
    assert_eq!(report.batch_name, "irma");
    assert!(report.status.timestamps.non_dynamixel_wall_time.is_set());
    let text = report.to_string();
    assert!(text.contains("Batch     irma"));
    assert!(text.contains("end_of_arm:"));
}
