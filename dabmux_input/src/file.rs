//! File input: one type, three sub-modes, selected by [`FileInputMode`] —
//! mirroring the original engine's single `File` input class with a mode
//! flag rather than separate blocking/non-blocking/whole-file classes.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use tracing::warn;

use crate::error::{InputError, Result};
use crate::input::Input;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileInputMode {
    /// Classical blocking read; rewinds to the start on EOF.
    Blocking,
    /// Partial reads accumulate in an internal scratch buffer until a full
    /// frame is available; an empty read returns zero bytes rather than
    /// blocking or erroring.
    NonBlocking,
    /// The whole file is read into memory once and consumed circularly.
    /// A failed reopen keeps serving the previously loaded content.
    LoadEntireFile,
}

pub struct FileInput {
    uid: String,
    mode: FileInputMode,
    path: String,
    bitrate_kbps: u16,

    file: Option<File>,
    scratch: Vec<u8>,
    whole_file: Vec<u8>,
    whole_file_cursor: usize,
}

impl FileInput {
    pub fn new(uid: impl Into<String>, mode: FileInputMode) -> Self {
        Self {
            uid: uid.into(),
            mode,
            path: String::new(),
            bitrate_kbps: 0,
            file: None,
            scratch: Vec::new(),
            whole_file: Vec::new(),
            whole_file_cursor: 0,
        }
    }

    fn open_blocking_or_partial(&mut self) -> Result<()> {
        let file = File::open(&self.path).map_err(|e| InputError::Open(self.uid.clone(), self.path.clone(), e))?;
        self.file = Some(file);
        Ok(())
    }

    pub fn bitrate_kbps(&self) -> u16 {
        self.bitrate_kbps
    }

    fn load_whole_file(&mut self) -> Result<()> {
        let mut file = File::open(&self.path).map_err(|e| InputError::Open(self.uid.clone(), self.path.clone(), e))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).map_err(|e| InputError::Read(self.uid.clone(), e))?;
        self.whole_file = data;
        self.whole_file_cursor = 0;
        Ok(())
    }
}

impl Input for FileInput {
    fn open(&mut self, uri: &str) -> Result<()> {
        self.path = uri.strip_prefix("file://").unwrap_or(uri).to_string();
        match self.mode {
            FileInputMode::Blocking | FileInputMode::NonBlocking => self.open_blocking_or_partial(),
            FileInputMode::LoadEntireFile => match self.load_whole_file() {
                Ok(()) => Ok(()),
                Err(e) if !self.whole_file.is_empty() => {
                    warn!(uid = %self.uid, error = %e, "reopen failed, retaining previously loaded content");
                    Ok(())
                }
                Err(e) => Err(e),
            },
        }
    }

    fn read_frame(&mut self, buf: &mut [u8], len: usize) -> Result<usize> {
        match self.mode {
            FileInputMode::Blocking => {
                let Some(file) = self.file.as_mut() else { return Ok(0) };
                let mut total = 0;
                while total < len {
                    let n = file.read(&mut buf[total..len]).map_err(|e| InputError::Read(self.uid.clone(), e))?;
                    if n == 0 {
                        file.seek(SeekFrom::Start(0)).map_err(|e| InputError::Read(self.uid.clone(), e))?;
                        continue;
                    }
                    total += n;
                }
                Ok(len)
            }
            FileInputMode::NonBlocking => {
                let Some(file) = self.file.as_mut() else { return Ok(0) };
                while self.scratch.len() < len {
                    let mut chunk = vec![0u8; len - self.scratch.len()];
                    let n = file.read(&mut chunk).map_err(|e| InputError::Read(self.uid.clone(), e))?;
                    if n == 0 {
                        if self.scratch.is_empty() {
                            file.seek(SeekFrom::Start(0)).map_err(|e| InputError::Read(self.uid.clone(), e))?;
                        }
                        return Ok(0);
                    }
                    self.scratch.extend_from_slice(&chunk[..n]);
                }
                buf[..len].copy_from_slice(&self.scratch[..len]);
                self.scratch.drain(..len);
                Ok(len)
            }
            FileInputMode::LoadEntireFile => {
                if self.whole_file.is_empty() {
                    return Ok(0);
                }
                for slot in buf.iter_mut().take(len) {
                    *slot = self.whole_file[self.whole_file_cursor];
                    self.whole_file_cursor = (self.whole_file_cursor + 1) % self.whole_file.len();
                }
                Ok(len)
            }
        }
    }

    fn set_bitrate(&mut self, kbps: u16) -> Result<u16> {
        if kbps % 8 != 0 {
            return Err(InputError::BitrateNotMultipleOf8(self.uid.clone(), kbps));
        }
        self.bitrate_kbps = kbps;
        Ok(kbps)
    }

    fn close(&mut self) {
        self.file = None;
        self.scratch.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f
    }

    #[test]
    fn blocking_rewinds_on_eof() {
        let f = sample_file(&[1, 2, 3, 4]);
        let mut input = FileInput::new("in1", FileInputMode::Blocking);
        input.open(f.path().to_str().unwrap()).unwrap();
        input.set_bitrate(8).unwrap();

        let mut buf = [0u8; 4];
        input.read_frame(&mut buf, 4).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        // Second read wraps around since the file has exactly 4 bytes.
        input.read_frame(&mut buf, 4).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn non_blocking_accumulates_partial_reads() {
        let f = sample_file(&[9, 9, 9, 9, 9, 9]);
        let mut input = FileInput::new("in2", FileInputMode::NonBlocking);
        input.open(f.path().to_str().unwrap()).unwrap();
        let mut buf = [0u8; 6];
        let n = input.read_frame(&mut buf, 6).unwrap();
        assert_eq!(n, 6);
    }

    #[test]
    fn load_entire_file_consumes_circularly() {
        let f = sample_file(&[1, 2, 3]);
        let mut input = FileInput::new("in3", FileInputMode::LoadEntireFile);
        input.open(f.path().to_str().unwrap()).unwrap();
        let mut buf = [0u8; 7];
        input.read_frame(&mut buf, 7).unwrap();
        assert_eq!(buf, [1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn load_entire_file_keeps_old_content_on_failed_reopen() {
        let f = sample_file(&[5, 6, 7]);
        let mut input = FileInput::new("in4", FileInputMode::LoadEntireFile);
        input.open(f.path().to_str().unwrap()).unwrap();
        assert!(input.open("/nonexistent/path/does/not/exist").is_ok());
        let mut buf = [0u8; 3];
        input.read_frame(&mut buf, 3).unwrap();
        assert_eq!(buf, [5, 6, 7]);
    }
}
