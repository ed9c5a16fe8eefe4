//! Timeout-aware async reads and writes on a paused tokio clock.

mod common;

use std::time::Duration;

use common::MockDriver;
use ftd2xx::{AsyncDevice, Error, Status, TimeoutPolicy};
use proptest::prelude::*;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn read_without_data_returns_empty_after_timeout() {
    let driver = MockDriver::new();
    let mut dev =
        AsyncDevice::with_policy(driver.open_device(), TimeoutPolicy::from_millis(1000, 0)).unwrap();
    assert_eq!(driver.state().timeouts.last(), Some(&(1, 0)));

    let start = Instant::now();
    let data = dev.read(1).await.unwrap();
    let elapsed = start.elapsed();

    assert!(data.is_empty());
    assert!(elapsed >= Duration::from_millis(1000), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(1100), "{elapsed:?}");
    // The drain still ran once.
    assert_eq!(driver.state().read_calls, vec![1]);
}

#[tokio::test(start_paused = true)]
async fn strict_read_without_data_times_out() {
    let driver = MockDriver::new();
    let policy = TimeoutPolicy::from_millis(1000, 0).strict(true);
    let mut dev = AsyncDevice::with_policy(driver.open_device(), policy).unwrap();

    let start = Instant::now();
    match dev.read(1).await {
        Err(Error::ReadTimeout { requested, data }) => {
            assert_eq!(requested, 1);
            assert!(data.is_empty());
        }
        other => panic!("expected ReadTimeout, got {other:?}"),
    }
    assert!(start.elapsed() >= Duration::from_millis(1000));
    assert_eq!(driver.state().read_calls, vec![1]);
}

#[tokio::test(start_paused = true)]
async fn partial_read_returns_available_bytes() {
    let driver = MockDriver::new();
    let mut dev =
        AsyncDevice::with_policy(driver.open_device(), TimeoutPolicy::from_millis(100, 0)).unwrap();
    driver.push_rx(b"abc");

    assert_eq!(dev.read(8).await.unwrap(), b"abc");
    assert_eq!(driver.state().read_calls, vec![3]);
}

#[tokio::test(start_paused = true)]
async fn huge_read_count_returns_queued_bytes() {
    let driver = MockDriver::new();
    let mut dev =
        AsyncDevice::with_policy(driver.open_device(), TimeoutPolicy::from_millis(10, 0)).unwrap();
    driver.push_rx(b"ab");

    assert_eq!(dev.read(usize::MAX / 2).await.unwrap(), b"ab");
    assert_eq!(driver.state().read_calls, vec![2]);

    let policy = TimeoutPolicy::from_millis(10, 0).strict(true);
    dev.set_policy(policy).unwrap();
    driver.push_rx(b"cd");
    match dev.read(usize::MAX).await {
        Err(Error::ReadTimeout { data, .. }) => assert_eq!(data, b"cd"),
        other => panic!("expected ReadTimeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn queue_poll_failure_skips_the_drain() {
    let driver = MockDriver::new();
    let mut dev =
        AsyncDevice::with_policy(driver.open_device(), TimeoutPolicy::from_millis(100, 0)).unwrap();
    driver.state().fail_queue_status = Some(Status::IoError);

    let err = dev.read(4).await.unwrap_err();
    assert_eq!(err.status(), Some(Status::IoError));
    assert!(driver.state().read_calls.is_empty());
}

#[tokio::test(start_paused = true)]
async fn strict_timeout_exposes_drained_bytes() {
    let driver = MockDriver::new();
    let policy = TimeoutPolicy::from_millis(100, 0).strict(true);
    let mut dev = AsyncDevice::with_policy(driver.open_device(), policy).unwrap();
    driver.push_rx(b"abc");

    match dev.read(8).await {
        Err(Error::ReadTimeout { requested: 8, data }) => assert_eq!(data, b"abc"),
        other => panic!("expected ReadTimeout, got {other:?}"),
    }
    // The device was drained; nothing is left for the next call.
    assert_eq!(dev.device().queue_status().unwrap(), 0);
    assert_eq!(dev.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn per_call_strict_override() {
    let driver = MockDriver::new();
    let mut dev =
        AsyncDevice::with_policy(driver.open_device(), TimeoutPolicy::from_millis(50, 0)).unwrap();

    assert!(dev.read_with(2, true).await.unwrap_err().is_timeout());
    assert_eq!(dev.read_with(2, false).await.unwrap(), b"");
}

#[tokio::test(start_paused = true)]
async fn data_arriving_before_deadline_completes_read() {
    let driver = MockDriver::new();
    let mut dev =
        AsyncDevice::with_policy(driver.open_device(), TimeoutPolicy::from_millis(1000, 0)).unwrap();

    let feeder = driver.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        feeder.push_rx(b"ab");
        tokio::time::sleep(Duration::from_millis(50)).await;
        feeder.push_rx(b"cd");
    });

    let start = Instant::now();
    assert_eq!(dev.read(4).await.unwrap(), b"abcd");
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(100), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(200), "{elapsed:?}");
    // Only one native read: the drain after the queue filled.
    assert_eq!(driver.state().read_calls, vec![4]);
}

#[tokio::test(start_paused = true)]
async fn cancelled_read_keeps_drained_bytes() {
    let driver = MockDriver::new();
    let mut dev = AsyncDevice::new(driver.open_device()).unwrap();
    driver.push_rx(b"ab");

    let abandoned = tokio::time::timeout(Duration::from_millis(20), dev.read(4)).await;
    assert!(abandoned.is_err());
    assert_eq!(dev.pending(), 2);
    assert_eq!(dev.device().queue_status().unwrap(), 0);

    driver.push_rx(b"cd");
    assert_eq!(dev.read(4).await.unwrap(), b"abcd");
    assert_eq!(dev.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn carried_bytes_satisfy_small_reads_without_native_calls() {
    let driver = MockDriver::new();
    let mut dev = AsyncDevice::new(driver.open_device()).unwrap();
    driver.push_rx(b"xyz");

    let _ = tokio::time::timeout(Duration::from_millis(5), dev.read(10)).await;
    let calls_before = driver.state().read_calls.len();

    assert_eq!(dev.read(2).await.unwrap(), b"xy");
    assert_eq!(dev.read(1).await.unwrap(), b"z");
    assert_eq!(driver.state().read_calls.len(), calls_before);
}

#[tokio::test(start_paused = true)]
async fn zero_length_read_makes_no_native_call() {
    let driver = MockDriver::new();
    let mut dev = AsyncDevice::new(driver.open_device()).unwrap();
    assert_eq!(dev.read(0).await.unwrap(), b"");
    assert!(driver.state().read_calls.is_empty());
}

#[tokio::test(start_paused = true)]
async fn poll_interval_is_configurable() {
    let driver = MockDriver::new();
    let mut dev =
        AsyncDevice::with_policy(driver.open_device(), TimeoutPolicy::from_millis(30, 0)).unwrap();
    assert_eq!(dev.poll_interval(), ftd2xx::async_transfer::DEFAULT_POLL_INTERVAL);
    dev.set_poll_interval(Duration::from_millis(10));
    assert_eq!(dev.read(1).await.unwrap(), b"");
}

#[tokio::test(start_paused = true)]
async fn read_on_closed_device_fails() {
    let driver = MockDriver::new();
    let mut dev =
        AsyncDevice::with_policy(driver.open_device(), TimeoutPolicy::from_millis(10, 0)).unwrap();
    dev.device_mut().close().unwrap();
    let err = dev.read(1).await.unwrap_err();
    assert_eq!(err.status(), Some(Status::DeviceNotOpened));
}

#[test]
fn timeouts_push_read_flag_to_driver() {
    let driver = MockDriver::new();
    let mut dev = AsyncDevice::new(driver.open_device()).unwrap();
    dev.set_timeouts(Some(Duration::from_millis(250)), Some(Duration::from_millis(100)))
        .unwrap();
    dev.set_timeouts(None, None).unwrap();
    assert_eq!(driver.state().timeouts, vec![(0, 0), (1, 100), (0, 0)]);
    assert_eq!(dev.timeouts(), (None, None));
}

#[test]
fn strict_write_reports_short_writes() {
    let driver = MockDriver::new();
    let mut dev = AsyncDevice::new(driver.open_device()).unwrap();
    driver.state().accept_per_write = Some(3);

    assert_eq!(dev.write(b"hello").unwrap(), 3);
    match dev.write_with(b"hello", true) {
        Err(Error::WriteTimeout {
            requested: 5,
            written: 3,
        }) => {}
        other => panic!("expected WriteTimeout, got {other:?}"),
    }
    assert_eq!(dev.write_with(b"abc", true).unwrap(), 3);
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A non-strict read of `n` bytes with fewer available returns exactly
    /// what was available.
    #[test]
    fn non_strict_short_read_returns_available(
        available in proptest::collection::vec(any::<u8>(), 0..32),
        extra in 1usize..32,
    ) {
        let n = available.len() + extra;
        let driver = MockDriver::new();
        let mut dev = AsyncDevice::with_policy(
            driver.open_device(),
            TimeoutPolicy::from_millis(20, 0),
        ).unwrap();
        driver.push_rx(&available);

        let data = paused_runtime().block_on(dev.read(n)).unwrap();
        prop_assert_eq!(data, available);
    }

    /// A strict read that cannot be satisfied fails and still drains.
    #[test]
    fn strict_short_read_fails_and_drains(
        available in proptest::collection::vec(any::<u8>(), 0..32),
        extra in 1usize..32,
    ) {
        let n = available.len() + extra;
        let driver = MockDriver::new();
        let policy = TimeoutPolicy::from_millis(20, 0).strict(true);
        let mut dev = AsyncDevice::with_policy(driver.open_device(), policy).unwrap();
        driver.push_rx(&available);

        match paused_runtime().block_on(dev.read(n)) {
            Err(Error::ReadTimeout { requested, data }) => {
                prop_assert_eq!(requested, n);
                prop_assert_eq!(data, available);
            }
            other => prop_assert!(false, "expected ReadTimeout, got {:?}", other),
        }
        prop_assert_eq!(driver.state().rx.len(), 0);
    }
}
