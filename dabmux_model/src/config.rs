//! TOML configuration loading: deserializes the key/value tree into an
//! [`Ensemble`]. This is a from-scratch mapping of that tree shape, not a
//! reimplementation of the legacy INI-style grammar.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::announcement::{AnnouncementCluster, AnnouncementFlags};
use crate::component::Component;
use crate::ensemble::{Ensemble, LocalTimeOffset, ReconfigCounter, TransmissionMode};
use crate::error::{ConfigError, Result};
use crate::label::Label;
use crate::protection::{EepProfile, Protection};
use crate::service::{ProgrammeType, Service, ServiceId};
use crate::subchannel::{BufferPolicy, Subchannel, SubchannelType};

#[derive(Debug, Deserialize)]
pub struct ConfigRoot {
    pub general: GeneralSection,
    pub ensemble: EnsembleSection,
    #[serde(default)]
    pub subchannels: HashMap<String, SubchannelSection>,
    #[serde(default)]
    pub services: HashMap<String, ServiceSection>,
    #[serde(default)]
    pub components: HashMap<String, ComponentSection>,
    #[serde(default)]
    pub announcements: HashMap<String, AnnouncementSection>,
    #[serde(default)]
    pub outputs: HashMap<String, OutputSection>,
    #[serde(default)]
    pub remotecontrol: Option<RemoteControlSection>,
}

/// One `[outputs.<uid>]` entry: either a plain byte-oriented transport
/// named by `uri` (`file://`, `fifo://`, `stdout://`, `udp://`, …), or a
/// structured `edi` object describing a multi-destination EDI emitter.
#[derive(Debug, Deserialize)]
pub struct OutputSection {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub edi: Option<EdiOutputSection>,
}

/// `outputs.X.edi`: global PFT/FEC settings plus a list of destinations.
#[derive(Debug, Deserialize)]
pub struct EdiOutputSection {
    #[serde(default)]
    pub chunk_len: Option<u16>,
    #[serde(default)]
    pub fec: Option<u8>,
    /// Interleaving depth in milliseconds, capped at 30 000 by the emitter.
    #[serde(default)]
    pub interleave: Option<u32>,
    #[serde(default)]
    pub tagpacket_alignment: Option<usize>,
    pub destinations: Vec<EdiDestinationSection>,
}

#[derive(Debug, Deserialize)]
pub struct EdiDestinationSection {
    /// `"udp"` or `"tcp"`.
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

/// Process-wide settings: daemonize/syslog/log
/// level and the stats RC socket path.
#[derive(Debug, Deserialize)]
pub struct GeneralSection {
    #[serde(default)]
    pub daemonize: bool,
    #[serde(default)]
    pub syslog: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub stats_rc_socket: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
pub struct EnsembleSection {
    pub ecc: NumberOrHex,
    pub eid: NumberOrHex,
    #[serde(default = "default_table_id")]
    pub international_table_id: NumberOrHex,
    #[serde(default)]
    pub local_time_offset: Option<String>,
    #[serde(default = "default_mode")]
    pub transmission_mode: String,
    #[serde(default)]
    pub alarm: bool,
    #[serde(default = "default_reconfig")]
    pub reconfig_counter: String,
    pub label: String,
    #[serde(default)]
    pub short_label_mask: Option<NumberOrHex>,
}

fn default_table_id() -> NumberOrHex {
    NumberOrHex::Decimal(1)
}
fn default_mode() -> String {
    "I".to_string()
}
fn default_reconfig() -> String {
    "0".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SubchannelSection {
    pub id: NumberOrHex,
    #[serde(rename = "type")]
    pub subchannel_type: String,
    pub bitrate: NumberOrHex,
    pub protection: String,
    #[serde(default = "default_buffer_policy")]
    pub buffer_policy: String,
    pub input: String,
}

fn default_buffer_policy() -> String {
    "prebuffering".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ServiceSection {
    pub id: NumberOrHex,
    #[serde(default)]
    pub ecc: Option<NumberOrHex>,
    #[serde(default)]
    pub programme_type: Option<NumberOrHex>,
    #[serde(default)]
    pub programme_type_dynamic: bool,
    #[serde(default)]
    pub language: Option<NumberOrHex>,
    #[serde(default)]
    pub announcement_support: Option<NumberOrHex>,
    #[serde(default)]
    pub announcement_clusters: Vec<String>,
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct ComponentSection {
    pub service: String,
    pub subchannel: String,
    pub scids: NumberOrHex,
    pub component_type: NumberOrHex,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnnouncementSection {
    pub cluster_id: NumberOrHex,
    #[serde(default)]
    pub flags: NumberOrHex,
    pub subchannel: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoteControlSection {
    #[serde(default)]
    pub bind: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Numeric field that accepts decimal or `0x`-prefixed hexadecimal.
#[derive(Debug, Clone, Copy)]
pub enum NumberOrHex {
    Decimal(i64),
}

impl NumberOrHex {
    pub fn as_u64(self) -> u64 {
        let NumberOrHex::Decimal(v) = self;
        v as u64
    }
    pub fn as_u16(self) -> u16 {
        self.as_u64() as u16
    }
    pub fn as_u8(self) -> u8 {
        self.as_u64() as u8
    }
}

impl<'de> Deserialize<'de> for NumberOrHex {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor;
        impl<'de> serde::de::Visitor<'de> for Visitor {
            type Value = NumberOrHex;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a decimal integer or a 0x-prefixed hex string")
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E> {
                Ok(NumberOrHex::Decimal(v))
            }
            fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E> {
                Ok(NumberOrHex::Decimal(v as i64))
            }
            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if let Some(hex) = v.strip_prefix("0x").or_else(|| v.strip_prefix("0X")) {
                    i64::from_str_radix(hex, 16).map(NumberOrHex::Decimal).map_err(E::custom)
                } else {
                    v.parse::<i64>().map(NumberOrHex::Decimal).map_err(E::custom)
                }
            }
        }
        deserializer.deserialize_any(Visitor)
    }
}

impl Default for NumberOrHex {
    fn default() -> Self {
        NumberOrHex::Decimal(0)
    }
}

/// Load a configuration tree from a TOML file and build a validated
/// ensemble. Returns the list of sub-channel uids silently promoted from
/// UEP to EEP (the caller should log a warning for each).
pub fn load_config(path: &Path) -> Result<(Ensemble, Vec<String>)> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Parse(e.to_string()))?;
    let root: ConfigRoot = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    Ensemble::from_config(&root)
}

impl Ensemble {
    /// Build and validate an ensemble from a parsed configuration tree.
    pub fn from_config(root: &ConfigRoot) -> Result<(Ensemble, Vec<String>)> {
        let transmission_mode = match root.ensemble.transmission_mode.as_str() {
            "I" => TransmissionMode::I,
            "II" => TransmissionMode::II,
            "III" => TransmissionMode::III,
            "IV" => TransmissionMode::IV,
            other => return Err(ConfigError::Parse(format!("unknown transmission mode {other}"))),
        };

        let local_time_offset = match root.ensemble.local_time_offset.as_deref() {
            None | Some("auto") => LocalTimeOffset::Auto,
            Some(s) => {
                let half_hours: i8 =
                    s.parse().map_err(|_| ConfigError::Parse(format!("invalid local_time_offset {s}")))?;
                LocalTimeOffset::HalfHours(half_hours)
            }
        };

        let reconfig_counter = match root.ensemble.reconfig_counter.as_str() {
            "hash" => ReconfigCounter::Hash,
            s => {
                let v: u16 = s.parse().map_err(|_| ConfigError::Parse(format!("invalid reconfig_counter {s}")))?;
                ReconfigCounter::Fixed(v)
            }
        };

        let mut label = Label::new(root.ensemble.label.clone());
        if let Some(mask) = root.ensemble.short_label_mask {
            label.short_mask = mask.as_u16();
        }

        let mut ensemble = Ensemble {
            ecc: root.ensemble.ecc.as_u8(),
            eid: root.ensemble.eid.as_u16(),
            international_table_id: root.ensemble.international_table_id.as_u8(),
            local_time_offset,
            transmission_mode,
            alarm: root.ensemble.alarm,
            reconfig_counter,
            label,
            subchannels: Vec::new(),
            services: Vec::new(),
            components: Vec::new(),
            announcement_clusters: Vec::new(),
            linkage_sets: Vec::new(),
            frequency_info: Vec::new(),
            other_ensemble_services: Vec::new(),
        };

        for (uid, sc) in &root.subchannels {
            let subchannel_type = parse_subchannel_type(&sc.subchannel_type)?;
            let protection = parse_protection(&sc.protection)?;
            let buffer_policy = match sc.buffer_policy.as_str() {
                "prebuffering" => BufferPolicy::Prebuffering,
                "timestamped" => BufferPolicy::Timestamped,
                other => return Err(ConfigError::Parse(format!("unknown buffer_policy {other}"))),
            };
            ensemble.subchannels.push(Subchannel {
                uid: uid.clone(),
                id: sc.id.as_u8(),
                subchannel_type,
                bitrate_kbps: sc.bitrate.as_u16(),
                protection,
                buffer_policy,
                input_uri: sc.input.clone(),
                start_cu: 0,
                size_cu: 0,
            });
        }

        for (uid, svc) in &root.services {
            let service_id = if svc.id.as_u64() > u16::MAX as u64 {
                ServiceId::Data(svc.id.as_u64() as u32)
            } else {
                ServiceId::Programme(svc.id.as_u16())
            };
            ensemble.services.push(Service {
                uid: uid.clone(),
                service_id,
                ecc: svc.ecc.map(|e| e.as_u8()),
                programme_type: svc.programme_type.map(|code| ProgrammeType {
                    code: code.as_u8(),
                    dynamic: svc.programme_type_dynamic,
                }),
                language_code: svc.language.map(|l| l.as_u8()),
                announcement_support: svc.announcement_support.map(|a| a.as_u16()).unwrap_or(0),
                announcement_clusters: svc.announcement_clusters.clone(),
                label: Label::new(svc.label.clone()),
            });
        }

        for (uid, comp) in &root.components {
            ensemble.components.push(Component {
                uid: uid.clone(),
                service_uid: comp.service.clone(),
                subchannel_uid: comp.subchannel.clone(),
                scids: comp.scids.as_u8(),
                component_type: comp.component_type.as_u8(),
                packet_addressing: None,
                user_applications: Vec::new(),
                label: comp.label.as_ref().map(|l| Label::new(l.clone())),
            });
        }

        for (uid, ann) in &root.announcements {
            ensemble.announcement_clusters.push(AnnouncementCluster {
                uid: uid.clone(),
                cluster_id: ann.cluster_id.as_u8(),
                flags: AnnouncementFlags(ann.flags.as_u16()),
                target_subchannel_uid: ann.subchannel.clone(),
            });
        }

        let promoted = ensemble.validate()?;
        Ok((ensemble, promoted))
    }
}

fn parse_subchannel_type(s: &str) -> Result<SubchannelType> {
    match s {
        "dab" => Ok(SubchannelType::DabAudio),
        "dabplus" => Ok(SubchannelType::DabPlusAudio),
        "data" => Ok(SubchannelType::DataDmb),
        "packet" => Ok(SubchannelType::Packet),
        other => Err(ConfigError::Parse(format!("unknown sub-channel type {other}"))),
    }
}

/// Parses `"uep:<index>"` or `"eep:<profile><level>"`, e.g. `"eep:a3"`.
fn parse_protection(s: &str) -> Result<Protection> {
    if let Some(rest) = s.strip_prefix("uep:") {
        let index: u8 = rest.parse().map_err(|_| ConfigError::Parse(format!("invalid UEP index {rest}")))?;
        return Ok(Protection::Uep { table_index: index });
    }
    if let Some(rest) = s.strip_prefix("eep:") {
        let mut chars = rest.chars();
        let profile = match chars.next() {
            Some('a') | Some('A') => EepProfile::A,
            Some('b') | Some('B') => EepProfile::B,
            _ => return Err(ConfigError::Parse(format!("invalid EEP profile in {s}"))),
        };
        let level: u8 = chars
            .as_str()
            .parse()
            .map_err(|_| ConfigError::Parse(format!("invalid EEP level in {s}")))?;
        return Ok(Protection::Eep { profile, level });
    }
    Err(ConfigError::Parse(format!("unrecognised protection descriptor {s}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[general]
log_level = "debug"

[ensemble]
ecc = "0xE1"
eid = "0x4001"
label = "Test Ensemble"

[subchannels.sub1]
id = 0
type = "dabplus"
bitrate = 64
protection = "eep:a3"
input = "file:///tmp/test.dabp"

[services.svc1]
id = "0x4001"
label = "Test Service"

[components.comp1]
service = "svc1"
subchannel = "sub1"
scids = 0
component_type = "0x3F"
"#;

    #[test]
    fn parses_minimal_config() {
        let root: ConfigRoot = toml::from_str(SAMPLE).unwrap();
        let (ensemble, promoted) = Ensemble::from_config(&root).unwrap();
        assert!(promoted.is_empty());
        assert_eq!(ensemble.eid, 0x4001);
        assert_eq!(ensemble.subchannels.len(), 1);
        assert_eq!(ensemble.subchannels[0].start_cu, 0);
    }

    #[test]
    fn rejects_unknown_service_reference() {
        let mut root: ConfigRoot = toml::from_str(SAMPLE).unwrap();
        root.components.get_mut("comp1").unwrap().service = "missing".into();
        assert!(Ensemble::from_config(&root).is_err());
    }

    #[test]
    fn parses_structured_edi_output_section() {
        let toml_with_edi = format!(
            r#"{SAMPLE}
[outputs.eti1]
uri = "file:///tmp/test.eti"

[outputs.edi1]
[outputs.edi1.edi]
chunk_len = 180
fec = 2
interleave = 480
tagpacket_alignment = 8

[[outputs.edi1.edi.destinations]]
protocol = "udp"
host = "239.1.2.3"
port = 12000

[[outputs.edi1.edi.destinations]]
protocol = "tcp"
host = "10.0.0.5"
port = 9000
"#
        );
        let root: ConfigRoot = toml::from_str(&toml_with_edi).unwrap();
        assert_eq!(root.outputs["eti1"].uri.as_deref(), Some("file:///tmp/test.eti"));
        assert!(root.outputs["eti1"].edi.is_none());

        let edi = root.outputs["edi1"].edi.as_ref().unwrap();
        assert_eq!(edi.chunk_len, Some(180));
        assert_eq!(edi.fec, Some(2));
        assert_eq!(edi.interleave, Some(480));
        assert_eq!(edi.destinations.len(), 2);
        assert_eq!(edi.destinations[0].protocol, "udp");
        assert_eq!(edi.destinations[1].port, 9000);
    }
}
