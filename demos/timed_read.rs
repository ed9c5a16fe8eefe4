//! Timed async reads.
//!
//! Opens the first device, sends a command and waits up to one second for a
//! four byte reply. With `--strict` a short reply is an error instead of a
//! partial result.
//!
//! Usage: cargo run --example timed_read [-- --strict]

use std::time::Duration;

use ftd2xx::{AsyncDevice, DataBits, Error, OpenOptions, Parity, Purge, StopBits, TimeoutPolicy};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let strict = std::env::args().any(|a| a == "--strict");

    let mut dev = OpenOptions::new().index(0).open()?;
    println!("Opened {:?} ({})", dev.info().device_type, dev.info().serial_number);
    dev.set_baud_rate(115200)?;
    dev.set_data_characteristics(DataBits::Eight, StopBits::One, Parity::None)?;
    dev.purge(Purge::Both)?;

    let policy = TimeoutPolicy::new()
        .read_timeout(Some(Duration::from_millis(1000)))
        .write_timeout(Some(Duration::from_millis(500)))
        .strict(strict);
    let mut dev = AsyncDevice::with_policy(dev, policy)?;

    let written = dev.write(b"PING")?;
    println!("Wrote {written} bytes");

    match dev.read(4).await {
        Ok(reply) if reply.is_empty() => println!("No reply within one second"),
        Ok(reply) => println!("Reply: {reply:02X?}"),
        Err(Error::ReadTimeout { requested, data }) => {
            println!("Timed out: got {} of {requested} bytes: {data:02X?}", data.len())
        }
        Err(e) => return Err(e.into()),
    }

    // An abandoned read keeps whatever it drained for the next one.
    tokio::select! {
        reply = dev.read(16) => println!("Read: {:02X?}", reply?),
        _ = tokio::time::sleep(Duration::from_millis(100)) => {
            println!("Gave up after 100 ms, {} bytes carried over", dev.pending());
        }
    }

    Ok(())
}
