//! Remote-control surface: newline-delimited JSON request/reply over TCP,
//! one thread per connection. Exposes three read operations — `info`,
//! `config`, `values` — against the shared [`Registry`]/[`ControlRegistry`].

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::controls::ControlRegistry;
use crate::registry::Registry;

/// Consecutive `accept()` failures before the listener gives up and exits,
/// letting the supervisor treat the thread as faulted and rebind it.
const MAX_CONSECUTIVE_ACCEPT_ERRORS: u32 = 10;

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request {
    Info,
    Config,
    Values,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Response {
    Info { frames: u64, tist_offset_seconds: i32 },
    Config { uids: Vec<String> },
    Values { inputs: Vec<crate::registry::InputSnapshot> },
    Error { error: String },
}

fn handle_request(registry: &Registry, controls: &ControlRegistry, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(Request::Info) => {
            let mux = controls.multiplexer();
            Response::Info { frames: controls.frames(), tist_offset_seconds: mux.tist_offset_seconds }
        }
        Ok(Request::Config) => Response::Config { uids: registry.uids() },
        Ok(Request::Values) => Response::Values { inputs: registry.snapshot_all() },
        Err(err) => Response::Error { error: err.to_string() },
    }
}

fn handle_connection(stream: TcpStream, registry: Registry, controls: ControlRegistry) {
    let peer = stream.peer_addr().ok();
    let reader = BufReader::new(stream.try_clone().expect("clone tcp stream"));
    let mut writer = stream;
    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(err) => {
                warn!(?peer, %err, "remote-control connection read error");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_request(&registry, &controls, &line);
        let mut encoded = serde_json::to_vec(&response).unwrap_or_default();
        encoded.push(b'\n');
        if writer.write_all(&encoded).is_err() {
            return;
        }
    }
    debug!(?peer, "remote-control connection closed");
}

/// Serves the remote-control protocol on `listener`, spawning one thread
/// per accepted connection, until [`MAX_CONSECUTIVE_ACCEPT_ERRORS`]
/// `accept()` calls in a row fail — at which point it gives up and
/// returns, marking the thread faulted for [`RcSupervisor`] to notice.
pub fn serve(listener: TcpListener, registry: Registry, controls: ControlRegistry) {
    let mut consecutive_errors = 0u32;
    for conn in listener.incoming() {
        match conn {
            Ok(stream) => {
                consecutive_errors = 0;
                let registry = registry.clone();
                let controls = controls.clone();
                thread::spawn(move || handle_connection(stream, registry, controls));
            }
            Err(err) => {
                consecutive_errors += 1;
                warn!(%err, consecutive_errors, "remote-control accept failed");
                if consecutive_errors >= MAX_CONSECUTIVE_ACCEPT_ERRORS {
                    warn!("remote-control listener giving up after repeated accept failures");
                    return;
                }
            }
        }
    }
}

/// Supervises the remote-control listener thread: (re)binds and spawns it
/// on demand, and restarts it if [`serve`] has exited (bind failure at
/// startup, or the accept-failure threshold above).
pub struct RcSupervisor {
    bind: String,
    port: u16,
    registry: Registry,
    controls: ControlRegistry,
    handle: Option<JoinHandle<()>>,
}

impl RcSupervisor {
    pub fn new(bind: String, port: u16, registry: Registry, controls: ControlRegistry) -> Self {
        Self { bind, port, registry, controls, handle: None }
    }

    /// Verifies the listener thread is alive, (re)starting it if it has
    /// never run or has faulted. Call this periodically from the main loop.
    pub fn check_and_restart(&mut self) {
        let alive = self.handle.as_ref().is_some_and(|h| !h.is_finished());
        if alive {
            return;
        }
        if self.handle.take().is_some() {
            warn!(bind = %self.bind, port = self.port, "remote-control thread faulted, restarting");
        }
        match TcpListener::bind((self.bind.as_str(), self.port)) {
            Ok(listener) => {
                info!(bind = %self.bind, port = self.port, "remote-control surface listening");
                let registry = self.registry.clone();
                let controls = self.controls.clone();
                self.handle = Some(thread::spawn(move || serve(listener, registry, controls)));
            }
            Err(err) => warn!(%err, bind = %self.bind, port = self.port, "remote-control bind failed, will retry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_request_reports_frame_counter() {
        let registry = Registry::new();
        let controls = ControlRegistry::new();
        controls.increment_frames();
        let response = handle_request(&registry, &controls, r#"{"op":"info"}"#);
        match response {
            Response::Info { frames, .. } => assert_eq!(frames, 1),
            _ => panic!("expected Info response"),
        }
    }

    #[test]
    fn config_request_lists_registered_uids() {
        let registry = Registry::new();
        registry.register("svc1");
        let controls = ControlRegistry::new();
        let response = handle_request(&registry, &controls, r#"{"op":"config"}"#);
        match response {
            Response::Config { uids } => assert_eq!(uids, vec!["svc1".to_string()]),
            _ => panic!("expected Config response"),
        }
    }

    #[test]
    fn malformed_request_yields_error_response() {
        let registry = Registry::new();
        let controls = ControlRegistry::new();
        let response = handle_request(&registry, &controls, "not json");
        assert!(matches!(response, Response::Error { .. }));
    }

    #[test]
    fn supervisor_binds_on_first_check_and_stays_alive() {
        let registry = Registry::new();
        let controls = ControlRegistry::new();
        let mut supervisor = RcSupervisor::new("127.0.0.1".to_string(), 0, registry, controls);
        assert!(supervisor.handle.is_none());
        supervisor.check_and_restart();
        assert!(supervisor.handle.is_some());
        supervisor.check_and_restart();
        assert!(!supervisor.handle.as_ref().unwrap().is_finished());
    }
}
