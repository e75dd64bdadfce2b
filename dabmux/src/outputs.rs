//! Concrete ETI output transports. Only their byte-oriented write
//! contract is in scope; each output is just something the main loop
//! calls `write_all` on once per frame.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::net::{ToSocketAddrs, UdpSocket};

use tracing::warn;

use crate::error::{DabmuxError, Result};

/// Wraps a UDP socket so the main loop can `write_all` an ETI frame as one
/// datagram per call, same as any other output.
struct UdpWriter {
    socket: UdpSocket,
}

impl Write for UdpWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builds an output from a `kind://target` URI: `file://path`,
/// `fifo://path` (a pre-existing named pipe, opened the same way as a
/// plain file), `stdout://`, or `udp://host:port`.
pub fn open_output(uri: &str) -> Result<Box<dyn Write + Send>> {
    if let Some(path) = uri.strip_prefix("file://") {
        let file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
        return Ok(Box::new(file));
    }
    if let Some(path) = uri.strip_prefix("fifo://") {
        let file = OpenOptions::new().write(true).open(path)?;
        return Ok(Box::new(file));
    }
    if uri == "stdout://" {
        return Ok(Box::new(io::stdout()));
    }
    if let Some(target) = uri.strip_prefix("udp://") {
        let addr = target
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| DabmuxError::UnknownInputScheme(uri.to_string()))?;
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(addr)?;
        return Ok(Box::new(UdpWriter { socket }));
    }
    warn!(uri, "output transport not implemented in this build, ignoring");
    Ok(Box::new(io::sink()))
}
