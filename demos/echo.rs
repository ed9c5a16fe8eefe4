//! Echo server over a transport.
//!
//! Every byte received on the first device is written back. Runs for ten
//! seconds, then closes gracefully so pending output is flushed.
//!
//! Usage: cargo run --example echo

use std::cell::RefCell;
use std::time::Duration;

use ftd2xx::{create_connection, Error, ModemStatus, OpenOptions, Protocol, Transport, TransportConfig};
use tokio::task::LocalSet;

#[derive(Default)]
struct Echo {
    transport: RefCell<Option<Transport>>,
}

impl Protocol for Echo {
    fn connection_made(&self, transport: &Transport) {
        println!("Connected");
        *self.transport.borrow_mut() = Some(transport.clone());
    }

    fn data_received(&self, data: &[u8]) {
        println!("Echoing {} bytes", data.len());
        if let Some(transport) = self.transport.borrow().as_ref() {
            transport.write(data);
        }
    }

    fn connection_lost(&self, cause: Option<Error>) {
        match cause {
            Some(e) => println!("Connection lost: {e}"),
            None => println!("Connection closed"),
        }
        self.transport.borrow_mut().take();
    }

    fn modem_status_changed(&self, status: ModemStatus) {
        println!("Modem lines: cts={} dsr={} dcd={}", status.cts(), status.dsr(), status.dcd());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    LocalSet::new()
        .run_until(async {
            let config = TransportConfig::new().poll_interval(Duration::from_millis(1));
            let (transport, _echo) =
                create_connection(&OpenOptions::new(), Echo::default, config)?;
            transport.with_device(|dev| dev.set_baud_rate(115200))??;

            tokio::time::sleep(Duration::from_secs(10)).await;
            transport.close();
            while !transport.is_closed() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Ok::<(), Box<dyn std::error::Error>>(())
        })
        .await
}
