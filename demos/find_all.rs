//! List all FTDI devices the D2XX driver can see.
//!
//! Usage: cargo run --example find_all

fn main() -> Result<(), ftd2xx::Error> {
    env_logger::init();

    let version = ftd2xx::library_version()?;
    println!(
        "D2XX library {}.{}.{}",
        (version >> 16) & 0xFF,
        (version >> 8) & 0xFF,
        version & 0xFF
    );

    let devices = ftd2xx::list_devices()?;
    if devices.is_empty() {
        println!("No FTDI devices found.");
        return Ok(());
    }

    for dev in &devices {
        println!(
            "#{}: {:?} vid={:#06x} pid={:#06x} loc={:#x} serial={:?} desc={:?}{}",
            dev.index,
            dev.device_type,
            dev.vendor_id(),
            dev.product_id(),
            dev.location,
            dev.serial_number,
            dev.description,
            if dev.is_open() { " (in use)" } else { "" },
        );
    }

    Ok(())
}
