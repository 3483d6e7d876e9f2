//! Loopback demo: an echo thread on top of the buffered serial device,
//! with the simulated driver playing the hardware on the main thread.

use anyhow::Result;
use serio_device::{shared, BufferedSerial, SerialError};
use serio_ring::ByteRing;
use serio_sim::SimSerial;
use serio_sync::StdSignal;

fn main() -> Result<()> {
    let sim = SimSerial::new();
    let mut rx_storage = [0u8; 64];
    let mut tx_storage = [0u8; 64];
    let rx = shared(ByteRing::new(&mut rx_storage));
    let tx = shared(ByteRing::new(&mut tx_storage));

    let device: BufferedSerial<'_, SimSerial, StdSignal> =
        BufferedSerial::new(sim.clone(), &rx, Some(&tx));
    device.open()?;

    let message = b"hello through the ring buffers";

    std::thread::scope(|scope| -> Result<()> {
        // Echo thread: whatever arrives goes straight back out.
        let echo = scope.spawn(|| -> Result<usize, SerialError> {
            let mut buf = [0u8; 32];
            let mut echoed = 0;
            while echoed < message.len() {
                let n = device.read(&mut buf)?;
                device.write(&buf[..n])?;
                echoed += n;
            }
            Ok(echoed)
        });

        // Play the wire: feed the message in, drain the echo back out.
        sim.deliver(message);
        while sim.wire().len() < message.len() {
            if !sim.complete_tx() {
                std::thread::yield_now();
            }
        }

        let echoed = echo.join().expect("echo thread panicked")?;
        println!(
            "echoed {} bytes: {}",
            echoed,
            String::from_utf8_lossy(&sim.wire())
        );
        Ok(())
    })?;

    device.close()?;
    Ok(())
}
