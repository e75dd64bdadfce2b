//! Network EDI/STI-D sub-channel input: receives AF/PFT datagrams over UDP,
//! decodes them into STI-D frames, and serves one sub-channel's payload
//! per tick — the concrete `Input` the PFT reassembler and STI-D decoder
//! were built to feed.
//!
//! `edi://host:port/<n>` names the UDP source and the 1-based `ssN` stream
//! index within it this input serves; several sub-channels carried by the
//! same EDI source each get their own socket and decoder instance rather
//! than sharing a single demultiplexed feed.

use std::net::UdpSocket;

use dabmux_edi::EdiDecoder;
use dabmux_input::{Input, InputError, Result, TimestampQueue, TimestampedFrame};
use tracing::warn;

const MAX_DATAGRAM_BYTES: usize = 65_536;
const MAX_PFT_DELAY: usize = 100;
const TIMESTAMP_QUEUE_DEPTH: usize = 250;

pub struct EdiNetworkInput {
    uid: String,
    stream_index: u8,
    socket: Option<UdpSocket>,
    decoder: EdiDecoder,
    timestamped: TimestampQueue,
    recv_buf: Vec<u8>,
}

impl EdiNetworkInput {
    pub fn new(uid: impl Into<String>, stream_index: u8) -> Self {
        Self {
            uid: uid.into(),
            stream_index,
            socket: None,
            decoder: EdiDecoder::new(MAX_PFT_DELAY),
            timestamped: TimestampQueue::new(TIMESTAMP_QUEUE_DEPTH),
            recv_buf: vec![0u8; MAX_DATAGRAM_BYTES],
        }
    }

    /// Drains every datagram currently queued on the socket into the
    /// decoder, then drains every decoded frame matching our stream index
    /// into the release-time queue.
    fn pump(&mut self) {
        let Some(socket) = &self.socket else { return };
        loop {
            match socket.recv(&mut self.recv_buf) {
                Ok(n) if n > 0 => {
                    if let Err(err) = self.decoder.push_datagram(&self.recv_buf[..n]) {
                        warn!(uid = %self.uid, %err, "dropped malformed edi datagram");
                    }
                }
                Ok(_) => break,
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    warn!(uid = %self.uid, %err, "edi socket read failed");
                    break;
                }
            }
        }
        while let Some(frame) = self.decoder.pop_frame() {
            let Some((_, payload)) = frame.subchannels.iter().find(|(idx, _)| *idx == self.stream_index) else {
                continue;
            };
            let release_seconds = match frame.timestamp {
                Some(ts) => ts.seconds as f64 + (ts.tsta as f64) / 16_384_000.0,
                None => f64::NEG_INFINITY,
            };
            self.timestamped.push(TimestampedFrame { release_seconds, bytes: payload.clone() });
        }
    }
}

impl Input for EdiNetworkInput {
    fn open(&mut self, uri: &str) -> Result<()> {
        let target = uri.strip_prefix("edi://").unwrap_or(uri);
        let host_port = target.split('/').next().unwrap_or(target);
        let socket = UdpSocket::bind("0.0.0.0:0")
            .and_then(|s| {
                s.connect(host_port)?;
                s.set_nonblocking(true)?;
                Ok(s)
            })
            .map_err(|e| InputError::Open(self.uid.clone(), host_port.to_string(), e))?;
        self.socket = Some(socket);
        Ok(())
    }

    fn read_frame(&mut self, buf: &mut [u8], len: usize) -> Result<usize> {
        self.pump();
        match self.timestamped.pop_ready(f64::INFINITY) {
            Some(bytes) => {
                let n = bytes.len().min(len);
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(len)
            }
            None => Ok(0),
        }
    }

    fn read_frame_at(&mut self, buf: &mut [u8], len: usize, seconds: u32, _utco: i32, _tsta: u32) -> Result<usize> {
        self.pump();
        match self.timestamped.pop_ready(seconds as f64) {
            Some(bytes) => {
                let n = bytes.len().min(len);
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(len)
            }
            None => Ok(0),
        }
    }

    fn set_bitrate(&mut self, kbps: u16) -> Result<u16> {
        Ok(kbps)
    }

    fn close(&mut self) {
        self.socket = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_parses_host_port_and_drops_stream_suffix() {
        let mut input = EdiNetworkInput::new("test", 3);
        assert!(input.socket.is_none());
        input.open("edi://127.0.0.1:0/3").unwrap();
        assert!(input.socket.is_some());
    }

    #[test]
    fn read_frame_returns_zero_with_nothing_received() {
        let mut input = EdiNetworkInput::new("test", 1);
        input.open("edi://127.0.0.1:0/1").unwrap();
        let mut buf = [0u8; 32];
        assert_eq!(input.read_frame(&mut buf, 32).unwrap(), 0);
    }

    #[test]
    fn close_drops_the_socket() {
        let mut input = EdiNetworkInput::new("test", 1);
        input.open("edi://127.0.0.1:0/1").unwrap();
        input.close();
        assert!(input.socket.is_none());
    }
}
