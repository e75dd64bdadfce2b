//! Software DAB/DAB+ multiplexer: assembles an ensemble multiplex and
//! emits ETI-NI and/or EDI.

mod cli;
mod edi_input;
mod error;
mod inputs;
mod outputs;
mod run;
mod signals;

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use clap::Parser;
use dabmux_core::time::{EnsembleClock, FRAME_PERIOD_MS};
use dabmux_edi::emitter::{DEFAULT_CHUNK_LEN, DEFAULT_FEC, DEFAULT_TAGPACKET_ALIGNMENT};
use dabmux_edi::{EdiEmitter, PftConfig};
use dabmux_fic::Carousel;
use dabmux_stats::{ControlRegistry, Registry};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use inputs::{open_input, InputChannel};
use outputs::open_output;
use run::Multiplexer;

/// Frames a TCP EDI destination will buffer while disconnected before it
/// starts dropping the oldest one.
const EDI_TCP_QUEUE_DEPTH: usize = 64;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (ensemble, promoted_config, general) = {
        let root = std::fs::read_to_string(&cli.config)?;
        let root: dabmux_model::ConfigRoot = toml::from_str(&root)?;
        let (ensemble, promoted) = dabmux_model::Ensemble::from_config(&root)?;
        (ensemble, promoted, root)
    };

    let log_level = cli.log_level.clone().unwrap_or_else(|| general.general.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    for uid in &promoted_config {
        warn!(uid, "sub-channel's UEP descriptor had no matching table row, silently promoted to EEP-A/3");
    }

    let registry = Registry::new();
    let controls = ControlRegistry::new();

    let mut channels = Vec::with_capacity(ensemble.subchannels.len());
    for sc in &ensemble.subchannels {
        let input = open_input(&sc.uid, &sc.input_uri, sc.bitrate_kbps)?;
        controls.register_input(&sc.uid);
        channels.push(InputChannel::new(
            sc.uid.clone(),
            input,
            sc.buffer_policy,
            sc.subchannel_type,
            registry.clone(),
            controls.clone(),
        ));
    }

    let mut outputs = Vec::with_capacity(general.outputs.len());
    let mut edi: Option<EdiEmitter> = None;
    for (uid, out) in &general.outputs {
        match (&out.uri, &out.edi) {
            (Some(uri), None) => outputs.push(open_output(uri)?),
            (None, Some(edi_cfg)) => {
                let emitter = edi.get_or_insert_with(|| {
                    let mut pft = PftConfig {
                        chunk_len: edi_cfg.chunk_len.map(|v| v as usize).unwrap_or(DEFAULT_CHUNK_LEN),
                        fec: edi_cfg.fec.unwrap_or(DEFAULT_FEC),
                        latency_frames: edi_cfg.interleave.unwrap_or(0) / FRAME_PERIOD_MS,
                    };
                    pft.latency_frames = pft.interleave_frames(FRAME_PERIOD_MS);
                    let alignment = edi_cfg.tagpacket_alignment.unwrap_or(DEFAULT_TAGPACKET_ALIGNMENT);
                    EdiEmitter::with_tagpacket_alignment(if pft.latency_frames > 0 { Some(pft) } else { None }, alignment)
                });
                for dest in &edi_cfg.destinations {
                    let addr: SocketAddr = (dest.host.as_str(), dest.port)
                        .to_socket_addrs()?
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("output {uid}: could not resolve {}:{}", dest.host, dest.port))?;
                    match dest.protocol.as_str() {
                        "udp" => {
                            let socket = UdpSocket::bind("0.0.0.0:0")?;
                            emitter.add_udp_unicast(socket, addr);
                        }
                        "tcp" => emitter.add_tcp_server(addr, EDI_TCP_QUEUE_DEPTH),
                        other => warn!(uid, protocol = other, "unrecognised edi destination protocol, ignoring"),
                    }
                }
            }
            (Some(_), Some(_)) => return Err(anyhow::anyhow!("output {uid}: specify either uri or edi, not both")),
            (None, None) => return Err(anyhow::anyhow!("output {uid}: missing uri or edi")),
        }
    }

    let mut rc = general.remotecontrol.as_ref().map(|rc| {
        let bind = rc.bind.clone().unwrap_or_else(|| "127.0.0.1".to_string());
        let port = rc.port.unwrap_or(12345);
        dabmux_stats::RcSupervisor::new(bind, port, registry.clone(), controls.clone())
    });
    if let Some(rc) = &mut rc {
        rc.check_and_restart();
    }

    let (clock, _initial_frame_counter) = EnsembleClock::init(0, 0, 0, true);

    let mut mux = Multiplexer {
        ensemble,
        carousel: Carousel::new(),
        clock,
        channels,
        outputs,
        edi,
        controls,
        rc,
        frame_limit: cli.limit,
    };

    let shutdown = signals::install()?;
    mux.run(shutdown)?;

    Ok(())
}
