//! Synchronous device handle behaviour against the in-memory driver.

mod common;

use std::io::{Read, Write};

use common::MockDriver;
use ftd2xx::constants::{pid, FTDI_VID};
use ftd2xx::{
    list_devices_with, DeviceInfoDetail, DeviceSelector, DeviceType, Error, EventFlags,
    FlowControl, OpenOptions, Purge, Status,
};

fn detail(index: u32, serial: &str) -> DeviceInfoDetail {
    DeviceInfoDetail {
        index,
        flags: 0,
        device_type: DeviceType::Ft232H,
        id: 0x0403_6014,
        location: 0x10 + index,
        serial_number: serial.into(),
        description: "Single RS232-HS".into(),
    }
}

#[test]
fn open_refreshes_device_list_unless_suppressed() {
    let driver = MockDriver::new();
    let _dev = OpenOptions::new().index(0).open_with(driver.clone()).unwrap();
    assert_eq!(driver.state().create_list_calls, 1);

    let _dev = OpenOptions::new().update(false).open_with(driver.clone()).unwrap();
    assert_eq!(driver.state().create_list_calls, 1);
    assert_eq!(driver.state().opened, vec!["Index:0", "Index:0"]);
}

#[test]
fn open_by_identifier() {
    let driver = MockDriver::new();
    let _a = OpenOptions::new()
        .serial_number("FT1ABC")
        .update(false)
        .open_with(driver.clone())
        .unwrap();
    let _b = OpenOptions::new()
        .description("Mock UART")
        .update(false)
        .open_with(driver.clone())
        .unwrap();
    assert_eq!(
        driver.state().opened,
        vec!["SerialNumber:FT1ABC", "Description:Mock UART"]
    );
}

#[test]
fn open_by_location_needs_driver_support() {
    let driver = MockDriver::new();
    let err = OpenOptions::new()
        .location(0x21)
        .update(false)
        .open_with(driver)
        .unwrap_err();
    assert_eq!(err.status(), Some(Status::NotSupported));
}

#[test]
fn open_failure_is_a_device_error() {
    let driver = MockDriver::new();
    driver.state().fail_open = Some(Status::DeviceNotFound);
    let err = OpenOptions::new().open_with(driver).unwrap_err();
    assert_eq!(err.status(), Some(Status::DeviceNotFound));
}

#[test]
fn descriptor_failure_releases_the_handle() {
    let driver = MockDriver::new();
    driver.state().fail_device_info = Some(Status::IoError);
    let err = OpenOptions::new().update(false).open_with(driver.clone()).unwrap_err();
    assert_eq!(err.status(), Some(Status::IoError));
    assert_eq!(driver.state().close_count, 1);
}

#[test]
fn descriptor_is_populated_at_open() {
    let driver = MockDriver::new();
    let mut dev = driver.open_device();
    let info = dev.info().clone();
    assert_eq!(info.device_type, DeviceType::Ft232R);
    assert_eq!(info.vendor_id(), FTDI_VID);
    assert_eq!(info.product_id(), pid::FT232);
    assert_eq!(info.serial_number, "MOCK0001");
    assert_eq!(dev.refresh_info().unwrap(), &info);
}

#[test]
fn close_runs_native_close_once() {
    let driver = MockDriver::new();
    let mut dev = driver.open_device();
    assert!(dev.is_open());
    dev.close().unwrap();
    dev.close().unwrap();
    assert!(!dev.is_open());
    drop(dev);
    assert_eq!(driver.state().close_count, 1);
}

#[test]
fn drop_closes_an_open_device() {
    let driver = MockDriver::new();
    drop(driver.open_device());
    assert_eq!(driver.state().close_count, 1);
}

#[test]
fn operations_after_close_fail_without_native_calls() {
    let driver = MockDriver::new();
    let mut dev = driver.open_device();
    dev.close().unwrap();

    let not_opened = |e: Error| e.status() == Some(Status::DeviceNotOpened);
    assert!(not_opened(dev.read(4).unwrap_err()));
    assert!(not_opened(dev.write(b"x").unwrap_err()));
    assert!(not_opened(dev.queue_status().unwrap_err()));
    assert!(not_opened(dev.status().unwrap_err()));
    assert!(not_opened(dev.purge(Purge::Both).unwrap_err()));
    assert!(not_opened(dev.modem_status().unwrap_err()));

    let s = driver.state();
    assert!(s.read_calls.is_empty());
    assert_eq!(s.write_calls, 0);
    assert!(s.purges.is_empty());
}

#[test]
fn read_returns_what_is_available() {
    let driver = MockDriver::new();
    let mut dev = driver.open_device();
    driver.push_rx(b"abc");
    assert_eq!(dev.queue_status().unwrap(), 3);
    assert_eq!(dev.read(8).unwrap(), b"abc");
    assert_eq!(dev.read(8).unwrap(), b"");
    assert_eq!(dev.status().unwrap().rx_queue, 0);
}

#[test]
fn partial_write_is_not_retried() {
    let driver = MockDriver::new();
    let mut dev = driver.open_device();
    driver.state().accept_per_write = Some(2);
    assert_eq!(dev.write(b"hello").unwrap(), 2);
    assert_eq!(driver.state().write_calls, 1);
    assert_eq!(driver.written(), b"he");
}

#[test]
fn xon_xoff_requires_both_characters() {
    let driver = MockDriver::new();
    let mut dev = driver.open_device();

    let err = dev
        .set_flow_control(FlowControl::XonXoff, Some(0x11), None)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(driver.state().flow, None);

    dev.set_flow_control(FlowControl::XonXoff, Some(0x11), Some(0x13))
        .unwrap();
    assert_eq!(driver.state().flow, Some((FlowControl::XonXoff, 0x11, 0x13)));

    dev.set_flow_control(FlowControl::RtsCts, None, None).unwrap();
    assert_eq!(driver.state().flow, Some((FlowControl::RtsCts, 0, 0)));
}

#[test]
fn unimplemented_driver_calls_report_not_supported() {
    let driver = MockDriver::new();
    let mut dev = driver.open_device();
    assert_eq!(
        dev.set_baud_rate(115200).unwrap_err().status(),
        Some(Status::NotSupported)
    );
    assert_eq!(dev.latency_timer().unwrap_err().status(), Some(Status::NotSupported));
}

#[test]
fn purge_defaults_to_both_buffers() {
    let driver = MockDriver::new();
    let mut dev = driver.open_device();
    driver.push_rx(b"stale");
    dev.purge(Purge::default()).unwrap();
    dev.purge(Purge::Tx).unwrap();
    assert_eq!(driver.state().purges, vec![3, 2]);
    assert_eq!(dev.queue_status().unwrap(), 0);
}

#[test]
fn std_io_traits() {
    let driver = MockDriver::new();
    let mut dev = driver.open_device();
    driver.push_rx(b"ping");

    let mut buf = [0u8; 16];
    let n = Read::read(&mut dev, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"ping");

    Write::write_all(&mut dev, b"pong").unwrap();
    assert_eq!(driver.written(), b"pong");
}

#[test]
fn enumeration_through_explicit_driver() {
    let driver = MockDriver::new();
    driver.state().devices = vec![detail(0, "A1"), detail(1, "B2")];
    let devices = list_devices_with(driver.as_ref()).unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[1].serial_number, "B2");
    assert_eq!(devices[1].location, 0x11);
    assert_eq!(driver.state().create_list_calls, 1);
}

#[test]
fn selector_from_options() {
    let opts = OpenOptions::new().serial_number(b"XYZ".to_vec());
    assert_eq!(opts.selector, DeviceSelector::SerialNumber(b"XYZ".to_vec()));
}

#[test]
fn in_task_control_and_port_numbers() {
    let driver = MockDriver::new();
    let mut dev = driver.open_device();
    dev.stop_in_task().unwrap();
    dev.restart_in_task().unwrap();
    assert_eq!(driver.state().port_calls, vec!["stop_in_task", "restart_in_task"]);

    driver.state().com_port = 7;
    assert_eq!(dev.com_port_number().unwrap(), Some(7));
    driver.state().com_port = -1;
    assert_eq!(dev.com_port_number().unwrap(), None);

    // Port resets are Windows-only and not offered by this driver.
    assert_eq!(dev.reset_port().unwrap_err().status(), Some(Status::NotSupported));
    assert_eq!(dev.cycle_port().unwrap_err().status(), Some(Status::NotSupported));

    dev.close().unwrap();
    assert_eq!(
        dev.stop_in_task().unwrap_err().status(),
        Some(Status::DeviceNotOpened)
    );
}

#[test]
fn event_status_reads_and_clears_pending_events() {
    let driver = MockDriver::new();
    let mut dev = driver.open_device();
    dev.set_wait_mask(EventFlags::from_raw(0b011)).unwrap();
    assert_eq!(driver.state().wait_mask, Some(0b011));

    driver.state().events = 0b010;
    let events = dev.event_status().unwrap();
    assert!(events.modem_status());
    assert!(!events.rx_char());
    assert_eq!(dev.event_status().unwrap().raw(), 0);
}

