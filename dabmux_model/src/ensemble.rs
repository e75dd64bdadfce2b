//! Ensemble: the root entity, owning every other entity in the model.

use std::collections::HashSet;

use dabmux_core::crc::crc16_ccitt;

use crate::announcement::AnnouncementCluster;
use crate::component::Component;
use crate::error::{ConfigError, Result};
use crate::frequency::FrequencyInfo;
use crate::label::Label;
use crate::linkage::LinkageSet;
use crate::other_ensemble::OtherEnsembleService;
use crate::protection::Protection;
use crate::service::Service;
use crate::subchannel::Subchannel;

/// Total MSC capacity of one common interleaved frame, in capacity units.
pub const MAX_CAPACITY_UNITS: u16 = 864;

/// Transmission mode; controls FIC length (24 bytes for I/II/IV, 32 for III).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmissionMode {
    I,
    II,
    III,
    IV,
}

impl TransmissionMode {
    /// FICL: FIC length in 32-bit words per 24 ms frame (24 in modes
    /// I/II/IV, 32 in mode III). Used directly in the ETI FL computation.
    pub fn ficl_words(self) -> u16 {
        match self {
            TransmissionMode::III => 32,
            _ => 24,
        }
    }

    /// Total FIC payload budget in bytes: `ficl_words * 4`.
    pub fn fic_budget_bytes(self) -> u16 {
        self.ficl_words() * 4
    }

    /// Number of FIBs per frame (each FIB is 32 bytes: 30 data + 2 CRC).
    pub fn fib_count(self) -> u8 {
        (self.fic_budget_bytes() / 32) as u8
    }

    /// How many frames apart FIG 0/0 must reappear in the first FIB: every
    /// frame in modes I/IV, every fourth frame in modes II/III.
    pub fn fig0_0_period_frames(self) -> u32 {
        match self {
            TransmissionMode::I | TransmissionMode::IV => 1,
            TransmissionMode::II | TransmissionMode::III => 4,
        }
    }
}

/// Local time offset in signed half-hours, or derived from the system zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalTimeOffset {
    HalfHours(i8),
    Auto,
}

/// A reconfiguration counter value, or a request to derive it from a hash
/// of the current configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconfigCounter {
    Fixed(u16),
    Hash,
}

#[derive(Debug, Clone)]
pub struct Ensemble {
    pub ecc: u8,
    pub eid: u16,
    pub international_table_id: u8,
    pub local_time_offset: LocalTimeOffset,
    pub transmission_mode: TransmissionMode,
    pub alarm: bool,
    pub reconfig_counter: ReconfigCounter,
    pub label: Label,

    pub subchannels: Vec<Subchannel>,
    pub services: Vec<Service>,
    pub components: Vec<Component>,
    pub announcement_clusters: Vec<AnnouncementCluster>,
    pub linkage_sets: Vec<LinkageSet>,
    pub frequency_info: Vec<FrequencyInfo>,
    pub other_ensemble_services: Vec<OtherEnsembleService>,
}

impl Ensemble {
    /// Validate every cross-reference and invariant in §3/§4.B, assigning
    /// sub-channel start addresses in declaration order as a side effect.
    /// Returns the set of sub-channel uids that were silently promoted
    /// from UEP to EEP, for the caller to log a warning against.
    pub fn validate(&mut self) -> Result<Vec<String>> {
        let mut promoted = Vec::new();
        let mut seen_ids = HashSet::new();
        let mut next_start: u16 = 0;

        for sc in &mut self.subchannels {
            if !seen_ids.insert(sc.id) {
                return Err(ConfigError::DuplicateSubchannelId(sc.uid.clone()));
            }
            if sc.bitrate_kbps % 8 != 0 {
                return Err(ConfigError::BitrateNotMultipleOf8(sc.uid.clone(), sc.bitrate_kbps));
            }
            sc.protection.validate_bitrate(sc.bitrate_kbps, &sc.uid)?;

            let resolved = sc.protection.resolve(sc.bitrate_kbps);
            if resolved.promoted {
                promoted.push(sc.uid.clone());
            }
            sc.protection = resolved.protection;
            sc.size_cu = resolved.size_cu;
            sc.start_cu = next_start;
            next_start += resolved.size_cu;
        }

        if next_start > MAX_CAPACITY_UNITS {
            return Err(ConfigError::CapacityExceeded { used: next_start });
        }

        let mut seen_service_ids = HashSet::new();
        for svc in &self.services {
            if !seen_service_ids.insert(svc.uid.clone()) {
                return Err(ConfigError::DuplicateServiceId(svc.uid.clone()));
            }
        }

        let mut seen_component_ids = HashSet::new();
        for comp in &self.components {
            if !seen_component_ids.insert(comp.uid.clone()) {
                return Err(ConfigError::DuplicateComponentId(comp.uid.clone()));
            }
            if !self.services.iter().any(|s| s.uid == comp.service_uid) {
                return Err(ConfigError::UnknownService(comp.uid.clone(), comp.service_uid.clone()));
            }
            let subchannel = self
                .subchannels
                .iter()
                .find(|s| s.uid == comp.subchannel_uid)
                .ok_or_else(|| ConfigError::UnknownSubchannel(comp.uid.clone(), comp.subchannel_uid.clone()))?;
            if comp.packet_addressing.is_some() && !subchannel.subchannel_type.is_packet() {
                return Err(ConfigError::NotAPacketSubchannel(comp.uid.clone(), comp.subchannel_uid.clone()));
            }
            if comp.is_primary() && comp.label.is_some() {
                return Err(ConfigError::PrimaryComponentLabeled(comp.uid.clone()));
            }
        }

        for set in &self.linkage_sets {
            if !self.services.iter().any(|s| s.uid == set.key_service_uid) {
                return Err(ConfigError::UnknownKeyService(set.lsn.to_string(), set.key_service_uid.clone()));
            }
        }

        for cluster in &self.announcement_clusters {
            if !AnnouncementCluster::is_valid_id(cluster.cluster_id) {
                return Err(ConfigError::InvalidClusterId(cluster.uid.clone(), cluster.cluster_id));
            }
        }

        Ok(promoted)
    }

    /// Whether any announcement cluster uses the reserved alarm cluster id
    /// (255), which sets the ensemble alarm flag.
    pub fn has_alarm_cluster(&self) -> bool {
        self.announcement_clusters.iter().any(|c| c.is_alarm_cluster())
    }

    /// Resolve `reconfig_counter` to its transmitted value: the fixed value
    /// if set, or a CRC16 hash of a canonical configuration concatenation,
    /// taken modulo 1024.
    pub fn reconfig_counter_value(&self) -> u16 {
        match self.reconfig_counter {
            ReconfigCounter::Fixed(v) => v & 0x3FF,
            ReconfigCounter::Hash => self.config_hash() % 1024,
        }
    }

    /// Canonical concatenation of (eid, ecc, per-service {id, ecc},
    /// per-component {sid, subchid, type, SCIdS}, per-subch {id, start,
    /// bitrate, type-code, tpl}) hashed with CRC16/CCITT.
    fn config_hash(&self) -> u16 {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.eid.to_be_bytes());
        buf.push(self.ecc);

        for svc in &self.services {
            match svc.service_id {
                crate::service::ServiceId::Programme(id) => buf.extend_from_slice(&id.to_be_bytes()),
                crate::service::ServiceId::Data(id) => buf.extend_from_slice(&id.to_be_bytes()),
            }
            buf.push(svc.ecc.unwrap_or(self.ecc));
        }

        for comp in &self.components {
            let service_idx = self.services.iter().position(|s| s.uid == comp.service_uid).unwrap_or(0) as u16;
            let subch_idx = self.subchannels.iter().position(|s| s.uid == comp.subchannel_uid).unwrap_or(0) as u16;
            buf.extend_from_slice(&service_idx.to_be_bytes());
            buf.extend_from_slice(&subch_idx.to_be_bytes());
            buf.push(comp.component_type);
            buf.push(comp.scids);
        }

        for sc in &self.subchannels {
            buf.push(sc.id);
            buf.extend_from_slice(&sc.start_cu.to_be_bytes());
            buf.extend_from_slice(&sc.bitrate_kbps.to_be_bytes());
            buf.push(u8::from(sc.subchannel_type));
            buf.push(sc.to_tpl());
        }

        crc16_ccitt(&buf)
    }
}

// `SubchannelType` has no explicit discriminant; cast through a helper to
// keep the hash stable without exposing repr details on the public enum.
impl From<crate::subchannel::SubchannelType> for u8 {
    fn from(t: crate::subchannel::SubchannelType) -> u8 {
        match t {
            crate::subchannel::SubchannelType::DabAudio => 0,
            crate::subchannel::SubchannelType::DabPlusAudio => 1,
            crate::subchannel::SubchannelType::DataDmb => 2,
            crate::subchannel::SubchannelType::Packet => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::protection::{EepProfile, Protection};
    use crate::service::{Service, ServiceId};
    use crate::subchannel::{BufferPolicy, SubchannelType};

    fn minimal_ensemble() -> Ensemble {
        Ensemble {
            ecc: 0xE1,
            eid: 0x4001,
            international_table_id: 1,
            local_time_offset: LocalTimeOffset::HalfHours(2),
            transmission_mode: TransmissionMode::I,
            alarm: false,
            reconfig_counter: ReconfigCounter::Fixed(0),
            label: Label::new("Test Ensemble"),
            subchannels: vec![],
            services: vec![],
            components: vec![],
            announcement_clusters: vec![],
            linkage_sets: vec![],
            frequency_info: vec![],
            other_ensemble_services: vec![],
        }
    }

    #[test]
    fn slot_allocation_is_sequential_and_disjoint() {
        let mut ens = minimal_ensemble();
        ens.subchannels.push(Subchannel {
            uid: "sub1".into(),
            id: 0,
            subchannel_type: SubchannelType::DabPlusAudio,
            bitrate_kbps: 64,
            protection: Protection::Eep { profile: EepProfile::A, level: 3 },
            buffer_policy: BufferPolicy::Prebuffering,
            input_uri: "file:///dev/null".into(),
            start_cu: 0,
            size_cu: 0,
        });
        ens.subchannels.push(Subchannel {
            uid: "sub2".into(),
            id: 1,
            subchannel_type: SubchannelType::DabPlusAudio,
            bitrate_kbps: 96,
            protection: Protection::Eep { profile: EepProfile::A, level: 3 },
            buffer_policy: BufferPolicy::Prebuffering,
            input_uri: "file:///dev/null".into(),
            start_cu: 0,
            size_cu: 0,
        });
        ens.validate().unwrap();
        assert_eq!(ens.subchannels[0].start_cu, 0);
        assert_eq!(ens.subchannels[1].start_cu, ens.subchannels[0].size_cu);
    }

    #[test]
    fn duplicate_subchannel_id_rejected() {
        let mut ens = minimal_ensemble();
        for uid in ["sub1", "sub2"] {
            ens.subchannels.push(Subchannel {
                uid: uid.into(),
                id: 0,
                subchannel_type: SubchannelType::DabPlusAudio,
                bitrate_kbps: 64,
                protection: Protection::Eep { profile: EepProfile::A, level: 3 },
                buffer_policy: BufferPolicy::Prebuffering,
                input_uri: "file:///dev/null".into(),
                start_cu: 0,
                size_cu: 0,
            });
        }
        assert!(matches!(ens.validate(), Err(ConfigError::DuplicateSubchannelId(_))));
    }

    #[test]
    fn primary_component_with_label_rejected() {
        let mut ens = minimal_ensemble();
        ens.subchannels.push(Subchannel {
            uid: "sub1".into(),
            id: 0,
            subchannel_type: SubchannelType::DabPlusAudio,
            bitrate_kbps: 64,
            protection: Protection::Eep { profile: EepProfile::A, level: 3 },
            buffer_policy: BufferPolicy::Prebuffering,
            input_uri: "file:///dev/null".into(),
            start_cu: 0,
            size_cu: 0,
        });
        ens.services.push(Service {
            uid: "svc1".into(),
            service_id: ServiceId::Programme(0x4001),
            ecc: None,
            programme_type: None,
            language_code: None,
            announcement_support: 0,
            announcement_clusters: vec![],
            label: Label::new("Svc"),
        });
        ens.components.push(Component {
            uid: "comp1".into(),
            service_uid: "svc1".into(),
            subchannel_uid: "sub1".into(),
            scids: 0,
            component_type: 0x3F,
            packet_addressing: None,
            user_applications: vec![],
            label: Some(Label::new("nope")),
        });
        assert!(matches!(ens.validate(), Err(ConfigError::PrimaryComponentLabeled(_))));
    }

    #[test]
    fn capacity_exceeded_rejected() {
        let mut ens = minimal_ensemble();
        ens.subchannels.push(Subchannel {
            uid: "sub1".into(),
            id: 0,
            subchannel_type: SubchannelType::DabPlusAudio,
            bitrate_kbps: 3200,
            protection: Protection::Eep { profile: EepProfile::A, level: 1 },
            buffer_policy: BufferPolicy::Prebuffering,
            input_uri: "file:///dev/null".into(),
            start_cu: 0,
            size_cu: 0,
        });
        assert!(matches!(ens.validate(), Err(ConfigError::CapacityExceeded { .. })));
    }

    #[test]
    fn reconfig_hash_changes_with_bitrate() {
        let mut a = minimal_ensemble();
        a.reconfig_counter = ReconfigCounter::Hash;
        a.subchannels.push(Subchannel {
            uid: "sub1".into(),
            id: 0,
            subchannel_type: SubchannelType::DabPlusAudio,
            bitrate_kbps: 64,
            protection: Protection::Eep { profile: EepProfile::A, level: 3 },
            buffer_policy: BufferPolicy::Prebuffering,
            input_uri: "file:///dev/null".into(),
            start_cu: 0,
            size_cu: 0,
        });
        a.validate().unwrap();
        let mut b = a.clone();
        b.subchannels[0].bitrate_kbps = 96;
        b.validate().unwrap();
        assert_ne!(a.reconfig_counter_value(), b.reconfig_counter_value());
    }
}
