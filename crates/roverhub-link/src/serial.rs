//! Serial transport for the motor-controller link.
//!
//! Tokens travel as newline-terminated ASCII lines. The serialport crate
//! is blocking, so reads run on a dedicated thread that pumps complete
//! lines into an unbounded channel; the async side only ever awaits that
//! channel. Writes are short enough to issue inline.

use std::io::{Read, Write};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use roverhub_types::HubError;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tokio::sync::{Mutex, mpsc};
use tracing::{info, warn};

use crate::MotorLink;

/// [`MotorLink`] over a UART serial port (8N1, no flow control).
pub struct SerialMotorLink {
    port: StdMutex<Box<dyn SerialPort>>,
    lines: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl SerialMotorLink {
    /// Open `path` at `baud_rate` and start the reader thread.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Controller`] if the port cannot be opened or
    /// cloned for the reader.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, HubError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| HubError::Controller(format!("open {path}: {e}")))?;

        let reader = port
            .try_clone()
            .map_err(|e| HubError::Controller(format!("clone {path}: {e}")))?;

        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn(move || pump_lines(reader, tx))
            .map_err(|e| HubError::Controller(format!("spawn reader: {e}")))?;

        info!(path, baud_rate, "opened motor-controller serial port");
        Ok(Self {
            port: StdMutex::new(port),
            lines: Mutex::new(rx),
        })
    }
}

#[async_trait]
impl MotorLink for SerialMotorLink {
    async fn send(&self, token: &str) -> Result<(), HubError> {
        let mut port = self.port.lock().unwrap_or_else(|e| e.into_inner());
        port.write_all(token.as_bytes())
            .and_then(|_| port.write_all(b"\n"))
            .and_then(|_| port.flush())
            .map_err(|e| HubError::Controller(format!("serial write: {e}")))
    }

    async fn receive(&self) -> Result<String, HubError> {
        self.lines
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| HubError::Controller("serial reader thread exited".to_string()))
    }
}

/// Accumulate bytes into newline-delimited tokens until the reader fails
/// or the receiving side is dropped. Read timeouts just poll again; EOF
/// and hard errors terminate the pump.
fn pump_lines<R: Read>(mut reader: R, tx: mpsc::UnboundedSender<String>) {
    let mut buf = [0u8; 256];
    let mut acc: Vec<u8> = Vec::new();
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => {
                for &byte in &buf[..n] {
                    if byte == b'\n' {
                        let line = String::from_utf8_lossy(&acc).trim().to_string();
                        acc.clear();
                        if !line.is_empty() && tx.send(line).is_err() {
                            return;
                        }
                    } else {
                        acc.push(byte);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(e) => {
                warn!(error = %e, "serial reader terminated");
                return;
            }
        }
    }
}
