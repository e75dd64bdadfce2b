//! The input trait shared by every sub-channel source.

use crate::error::Result;

/// A source of sub-channel bytes, one 24 ms frame at a time.
///
/// `len` always equals `bitrate_kbps * 3` (one 24 ms frame at the
/// negotiated bitrate). Implementations that ignore timestamps (see
/// [`BufferPolicy::Prebuffering`](dabmux_model::BufferPolicy::Prebuffering))
/// can implement [`read_frame_at`](Input::read_frame_at) as a thin
/// wrapper over [`read_frame`](Input::read_frame).
pub trait Input: Send {
    /// Open (or reopen) the input, referred to by its `uid` for logging.
    fn open(&mut self, uri: &str) -> Result<()>;

    /// Fill `buf[..len]` with one frame's bytes. Returns the number of
    /// bytes actually written (always `0` or `len`).
    fn read_frame(&mut self, buf: &mut [u8], len: usize) -> Result<usize>;

    /// As [`read_frame`](Input::read_frame), but for timestamped inputs:
    /// `seconds`/`utco`/`tsta` describe the current multiplex time so the
    /// input can decide whether a queued frame's release time has elapsed.
    fn read_frame_at(&mut self, buf: &mut [u8], len: usize, seconds: u32, utco: i32, tsta: u32) -> Result<usize> {
        let _ = (seconds, utco, tsta);
        self.read_frame(buf, len)
    }

    /// Negotiate the bitrate; returns the bitrate the input will actually
    /// honour (inputs with a fixed native bitrate may clamp the request).
    fn set_bitrate(&mut self, kbps: u16) -> Result<u16>;

    fn close(&mut self);
}
