//! Builds the concrete [`Input`] for a sub-channel's URI and adapts it,
//! together with its buffer-management policy, to the
//! [`dabmux_eti::FrameSource`] the MSC assembler pulls from.

use dabmux_eti::FrameSource;
use dabmux_input::{FileInput, FileInputMode, FrameGrouping, Input, PrebufferingQueue};
use dabmux_input::PrbsInput;
use dabmux_model::{BufferPolicy, SubchannelType};
use dabmux_stats::{ControlRegistry, Registry};
use tracing::warn;

use crate::edi_input::EdiNetworkInput;
use crate::error::{DabmuxError, Result};

/// Default prebuffering sizing: 1 frame minimum, 8 low watermark, 500 max —
/// in frame-grouping units (AAC superframes for audio, single frames else).
const DEFAULT_MIN_FRAMES: usize = 1;
const DEFAULT_LOW_WATERMARK: usize = 8;
const DEFAULT_MAX_FRAMES: usize = 500;

pub fn open_input(uid: &str, uri: &str, bitrate_kbps: u16) -> Result<Box<dyn Input>> {
    let mut input: Box<dyn Input> = if let Some(path) = uri.strip_prefix("filenb://") {
        let mut f = FileInput::new(uid, FileInputMode::NonBlocking);
        f.open(path)?;
        Box::new(f)
    } else if let Some(path) = uri.strip_prefix("filewhole://") {
        let mut f = FileInput::new(uid, FileInputMode::LoadEntireFile);
        f.open(path)?;
        Box::new(f)
    } else if uri.strip_prefix("file://").is_some() {
        let mut f = FileInput::new(uid, FileInputMode::Blocking);
        f.open(uri)?;
        Box::new(f)
    } else if uri.starts_with("prbs://") {
        let mut p = PrbsInput::new(uid);
        p.open(uri)?;
        Box::new(p)
    } else if let Some(rest) = uri.strip_prefix("edi://") {
        let stream_index: u8 = rest
            .rsplit('/')
            .next()
            .filter(|s| *s != rest)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| DabmuxError::UnknownInputScheme(format!("{uri} (missing /<stream-index> suffix)")))?;
        let mut e = EdiNetworkInput::new(uid, stream_index);
        e.open(uri)?;
        Box::new(e)
    } else {
        return Err(DabmuxError::UnknownInputScheme(uri.to_string()));
    };
    input.set_bitrate(bitrate_kbps)?;
    Ok(input)
}

enum ChannelPolicy {
    Prebuffering(PrebufferingQueue),
    /// Current multiplex time, refreshed once per tick by the main loop
    /// before the MSC assembler runs.
    Timestamped { seconds: u32, utco: i32, tsta: u32 },
}

/// Adapts one sub-channel's [`Input`] + buffer policy to a single-pull
/// [`FrameSource`], publishing fill/underrun stats as it goes.
pub struct InputChannel {
    uid: String,
    input: Box<dyn Input>,
    policy: ChannelPolicy,
    registry: Registry,
    controls: ControlRegistry,
}

impl InputChannel {
    pub fn new(
        uid: String,
        input: Box<dyn Input>,
        buffer_policy: BufferPolicy,
        subchannel_type: SubchannelType,
        registry: Registry,
        controls: ControlRegistry,
    ) -> Self {
        let policy = match buffer_policy {
            BufferPolicy::Prebuffering => {
                let grouping = if subchannel_type.is_audio() { FrameGrouping::AacSuperframe } else { FrameGrouping::Mpeg };
                ChannelPolicy::Prebuffering(PrebufferingQueue::new(DEFAULT_MIN_FRAMES, DEFAULT_LOW_WATERMARK, DEFAULT_MAX_FRAMES, grouping))
            }
            BufferPolicy::Timestamped => ChannelPolicy::Timestamped { seconds: 0, utco: 0, tsta: 0 },
        };
        registry.register(&uid);
        Self { uid, input, policy, registry, controls }
    }

    /// Refreshes the multiplex time a [`BufferPolicy::Timestamped`] channel
    /// gates its release against; a no-op for prebuffering channels.
    pub fn advance_time(&mut self, seconds: u32, utco: i32, tsta: u32) {
        if let ChannelPolicy::Timestamped { seconds: s, utco: u, tsta: t } = &mut self.policy {
            *s = seconds;
            *u = utco;
            *t = tsta;
        }
    }
}

impl FrameSource for InputChannel {
    fn pull(&mut self, buf: &mut [u8], len: usize) -> bool {
        let enabled = self.controls.input(&self.uid).map(|c| c.enabled).unwrap_or(true);
        if !enabled {
            return false;
        }
        match &mut self.policy {
            ChannelPolicy::Prebuffering(queue) => {
                let mut scratch = vec![0u8; len];
                match self.input.read_frame(&mut scratch, len) {
                    Ok(n) if n == len => queue.push(scratch),
                    Ok(_) => {}
                    Err(err) => warn!(uid = %self.uid, %err, "input read failed"),
                }
                self.registry.record_fill(&self.uid, queue.len() as f32);
                match queue.pop() {
                    Some(frame) => {
                        let n = frame.len().min(len);
                        buf[..n].copy_from_slice(&frame[..n]);
                        true
                    }
                    None => {
                        self.registry.record_underrun(&self.uid);
                        false
                    }
                }
            }
            ChannelPolicy::Timestamped { seconds, utco, tsta } => {
                match self.input.read_frame_at(buf, len, *seconds, *utco, *tsta) {
                    Ok(n) if n == len => true,
                    Ok(_) => {
                        self.registry.record_underrun(&self.uid);
                        false
                    }
                    Err(err) => {
                        warn!(uid = %self.uid, %err, "timestamped input read failed");
                        self.registry.record_underrun(&self.uid);
                        false
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dabmux_stats::InputControls;

    struct ConstantInput(u8);

    impl Input for ConstantInput {
        fn open(&mut self, _uri: &str) -> dabmux_input::Result<()> {
            Ok(())
        }

        fn read_frame(&mut self, buf: &mut [u8], len: usize) -> dabmux_input::Result<usize> {
            buf[..len].fill(self.0);
            Ok(len)
        }

        fn set_bitrate(&mut self, kbps: u16) -> dabmux_input::Result<u16> {
            Ok(kbps)
        }

        fn close(&mut self) {}
    }

    #[test]
    fn edi_uri_without_stream_index_suffix_errs() {
        let err = open_input("sc1", "edi://127.0.0.1:12000", 64).unwrap_err();
        assert!(matches!(err, DabmuxError::UnknownInputScheme(_)));
    }

    #[test]
    fn unrecognised_scheme_errs() {
        let err = open_input("sc1", "rtmp://example.invalid/stream", 64).unwrap_err();
        assert!(matches!(err, DabmuxError::UnknownInputScheme(_)));
    }

    #[test]
    fn edi_uri_with_non_numeric_stream_index_errs() {
        let err = open_input("sc1", "edi://127.0.0.1:12000/not-a-number", 64).unwrap_err();
        assert!(matches!(err, DabmuxError::UnknownInputScheme(_)));
    }

    #[test]
    fn disabled_input_is_skipped_without_touching_the_input() {
        let registry = Registry::new();
        registry.register("sc1");
        let controls = ControlRegistry::new();
        controls.register_input("sc1");
        let mut disabled = InputControls::default();
        disabled.enabled = false;
        controls.set_input("sc1", disabled);

        let mut channel = InputChannel::new(
            "sc1".to_string(),
            Box::new(ConstantInput(0xAA)),
            BufferPolicy::Prebuffering,
            SubchannelType::DabAudio,
            registry,
            controls,
        );
        let mut buf = [0u8; 16];
        assert!(!channel.pull(&mut buf, 16));
        assert_eq!(buf, [0u8; 16]);
    }
}
