//! Scheduler behaviour: first pass, interrupts, suspend/resume, shutdown.
//!
//! The loop and a scripted driver run side by side on one task via
//! `join`; the poll period is long enough that only the first pass and
//! explicit interrupts trigger detection.

#![allow(clippy::unwrap_used)]

use bq2429x::registers::{Register, CHG_CONFIG, VENDOR_ID};
use bq2429x::{Bq2429x, ChargeMode, ChargerConfig, ChargerMonitor, MonitorConfig};
use embassy_futures::join::join;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_time::{with_timeout, Duration, Timer};
use platform::mocks::{MockRegisterBus, RecordingSink};
use platform::SupplyEvent;

const PLUGGED: u8 = 0xA4;

/// Long enough that no timer-driven pass happens within a test
const SLOW_POLL: MonitorConfig = MonitorConfig {
    poll_period: Duration::from_secs(10),
    resume_delay: Duration::from_millis(10),
};

/// Time for one loop iteration to run
const SETTLE: Duration = Duration::from_millis(30);

fn bq24296() -> MockRegisterBus {
    let mock = MockRegisterBus::new();
    mock.set_register(Register::VendorStatus.addr(), VENDOR_ID);
    mock
}

#[tokio::test]
async fn full_lifecycle() {
    let mock = bq24296();
    mock.set_register(Register::SystemStatus.addr(), PLUGGED);
    let charger: Bq2429x<_, NoopRawMutex> = Bq2429x::attach(&mock, ChargerConfig::default())
        .await
        .unwrap();
    let monitor: ChargerMonitor<NoopRawMutex> = ChargerMonitor::new(SLOW_POLL);
    let mut sink = RecordingSink::new();

    let script = async {
        // First pass runs without waiting for the poll period.
        Timer::after(SETTLE).await;
        assert!(charger.input_present().await);

        mock.set_register(Register::SystemStatus.addr(), 0x00);
        monitor.on_interrupt();
        Timer::after(SETTLE).await;
        assert!(!charger.input_present().await);

        monitor.suspend().await;
        let reads = mock.read_count();
        mock.set_register(Register::SystemStatus.addr(), PLUGGED);
        monitor.on_interrupt();
        Timer::after(SETTLE).await;
        assert_eq!(mock.read_count(), reads, "no pass while suspended");

        monitor.resume();
        Timer::after(SETTLE).await;
        assert!(charger.input_present().await);

        // Something switched the boost on behind the monitor's back.
        mock.set_register(Register::PowerOnConfig.addr(), CHG_CONFIG.place(0b10));
        monitor.shutdown().await;
    };

    let (result, ()) = join(monitor.run(&charger, &mut sink), script).await;
    result.unwrap();

    assert_eq!(
        sink.events(),
        &[
            SupplyEvent::InputAttached,
            SupplyEvent::InputRemoved,
            SupplyEvent::InputAttached,
        ]
    );
    assert_eq!(charger.charge_mode().await.unwrap(), ChargeMode::Disabled);
}

#[tokio::test]
async fn detection_errors_do_not_stop_the_loop() {
    let mock = bq24296();
    let charger: Bq2429x<_, NoopRawMutex> = Bq2429x::attach(&mock, ChargerConfig::default())
        .await
        .unwrap();
    let monitor: ChargerMonitor<NoopRawMutex> = ChargerMonitor::new(SLOW_POLL);
    let mut sink = RecordingSink::new();

    mock.fail_reads(true);
    let script = async {
        Timer::after(SETTLE).await;
        mock.fail_reads(false);
        mock.set_register(Register::SystemStatus.addr(), PLUGGED);
        monitor.on_interrupt();
        Timer::after(SETTLE).await;
        monitor.shutdown().await;
    };

    let (result, ()) = join(monitor.run(&charger, &mut sink), script).await;
    result.unwrap();
    assert_eq!(sink.events(), &[SupplyEvent::InputAttached]);
}

#[tokio::test]
async fn shutdown_while_suspended_returns() {
    let mock = bq24296();
    let charger: Bq2429x<_, NoopRawMutex> = Bq2429x::attach(&mock, ChargerConfig::default())
        .await
        .unwrap();
    let monitor: ChargerMonitor<NoopRawMutex> = ChargerMonitor::new(SLOW_POLL);

    let script = async {
        Timer::after(SETTLE).await;
        monitor.suspend().await;
        mock.clear_log();
        monitor.shutdown().await;
    };

    let (result, ()) = join(monitor.run(&charger, &mut ()), script).await;
    result.unwrap();
    // CHG_CONFIG was not OTG, so shutdown only read it back.
    assert!(mock.writes().is_empty());
    assert_eq!(mock.read_count(), 1);
}

#[tokio::test]
async fn requests_after_shutdown_do_not_block() {
    let mock = bq24296();
    let charger: Bq2429x<_, NoopRawMutex> = Bq2429x::attach(&mock, ChargerConfig::default())
        .await
        .unwrap();
    let monitor: ChargerMonitor<NoopRawMutex> = ChargerMonitor::new(SLOW_POLL);

    // Never started
    assert!(!monitor.is_running());
    with_timeout(SETTLE, monitor.suspend()).await.unwrap();

    let (result, ()) = join(monitor.run(&charger, &mut ()), async {
        assert!(monitor.is_running());
        monitor.shutdown().await;
    })
    .await;
    result.unwrap();
    assert!(!monitor.is_running());

    with_timeout(SETTLE, monitor.suspend()).await.unwrap();
    with_timeout(SETTLE, monitor.shutdown()).await.unwrap();
    monitor.resume();
}
