//! FIG 0/18 (announcement support) and FIG 0/19 (announcement switching).
//!
//! 0/19 additionally tracks each cluster's transition: a cluster that just
//! appeared in the ensemble is flagged "new" for one cycle, a cluster that
//! disappeared keeps transmitting with its switch flags cleared for a few
//! frames so receivers mid-announcement can fall back cleanly, then drops
//! out of the carousel entirely.

use std::collections::HashMap;

use dabmux_model::{Ensemble, ServiceId};

use crate::generator::{fig0_header, fig_header, FigGenerator, FrameContext};
use crate::rate::RepetitionRate;

fn service_id_u16(svc: &dabmux_model::Service) -> u16 {
    match svc.service_id {
        ServiceId::Programme(v) => v,
        ServiceId::Data(v) => v as u16,
    }
}

/// FIG 0/18: one entry per service that declares announcement support.
#[derive(Debug, Default)]
pub struct Fig0_18 {
    cursor: usize,
}

impl FigGenerator for Fig0_18 {
    fn fig_type(&self) -> (u8, u8) {
        (0, 18)
    }
    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::B
    }
    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let services: Vec<_> = ensemble.services.iter().filter(|s| s.announcement_support != 0).collect();
        let n = services.len();
        if n == 0 {
            return (0, true);
        }

        let mut body = Vec::new();
        let mut visited = 0;
        while visited < n {
            let svc = services[(self.cursor + visited) % n];
            let cluster_ids: Vec<u8> = svc
                .announcement_clusters
                .iter()
                .filter_map(|uid| ensemble.announcement_clusters.iter().find(|c| &c.uid == uid))
                .map(|c| c.cluster_id)
                .collect();
            let entry_len = 2 + 2 + 1 + cluster_ids.len();
            if body.len() + entry_len > buf.len().saturating_sub(2) {
                break;
            }
            body.extend_from_slice(&service_id_u16(svc).to_be_bytes());
            body.extend_from_slice(&svc.announcement_support.to_be_bytes());
            body.push(cluster_ids.len() as u8 & 0x1F);
            body.extend_from_slice(&cluster_ids);
            visited += 1;
        }
        if visited == 0 {
            return (0, false);
        }

        buf[0] = fig_header(0, (body.len() + 1) as u8);
        buf[1] = fig0_header(18, false, false, false);
        buf[2..2 + body.len()].copy_from_slice(&body);
        let written = 2 + body.len();
        let complete = visited == n;
        self.cursor = (self.cursor + visited) % n;
        (written, complete)
    }
}

const DISABLE_COUNTDOWN_FRAMES: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClusterState {
    New,
    Active,
    Disabling(u8),
}

/// FIG 0/19: announcement switching, one cluster per invocation.
#[derive(Debug, Default)]
pub struct Fig0_19 {
    cursor: usize,
    state: HashMap<u8, ClusterState>,
}

impl FigGenerator for Fig0_19 {
    fn fig_type(&self) -> (u8, u8) {
        (0, 19)
    }
    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::A
    }
    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let present: HashMap<u8, &dabmux_model::AnnouncementCluster> =
            ensemble.announcement_clusters.iter().map(|c| (c.cluster_id, c)).collect();

        for id in present.keys() {
            self.state.entry(*id).or_insert(ClusterState::New);
        }
        let gone: Vec<u8> = self
            .state
            .keys()
            .copied()
            .filter(|id| !present.contains_key(id))
            .collect();
        for id in gone {
            match self.state.get(&id) {
                Some(ClusterState::Disabling(0)) | None => {
                    self.state.remove(&id);
                }
                Some(ClusterState::Disabling(_)) => {}
                _ => {
                    self.state.insert(id, ClusterState::Disabling(DISABLE_COUNTDOWN_FRAMES));
                }
            }
        }

        let mut ids: Vec<u8> = self.state.keys().copied().collect();
        ids.sort_unstable();
        let n = ids.len();
        if n == 0 {
            return (0, true);
        }

        let id = ids[self.cursor % n];
        let (cluster_id, asw, new_flag, subchannel_id) = match self.state[&id] {
            ClusterState::Disabling(remaining) => {
                let target = present.get(&id).and_then(|c| {
                    ensemble.subchannels.iter().find(|s| s.uid == c.target_subchannel_uid)
                });
                if remaining == 0 {
                    self.state.remove(&id);
                } else {
                    self.state.insert(id, ClusterState::Disabling(remaining - 1));
                }
                (id, 0u16, false, target.map(|s| s.id).unwrap_or(0))
            }
            state => {
                let cluster = present[&id];
                let target = ensemble.subchannels.iter().find(|s| s.uid == cluster.target_subchannel_uid);
                let new_flag = state == ClusterState::New;
                if new_flag {
                    self.state.insert(id, ClusterState::Active);
                }
                (id, cluster.flags.0, new_flag, target.map(|s| s.id).unwrap_or(0))
            }
        };

        if buf.len() < 6 {
            return (0, false);
        }
        buf[0] = fig_header(0, 5);
        buf[1] = fig0_header(19, false, false, false);
        buf[2] = cluster_id;
        buf[3..5].copy_from_slice(&asw.to_be_bytes());
        buf[5] = (new_flag as u8) << 7 | (subchannel_id & 0x3F);
        self.cursor = (self.cursor + 1) % n;
        (6, self.cursor == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fig0::test_support::empty_ensemble;
    use dabmux_core::time::MjdTime;
    use dabmux_model::{AnnouncementCluster, AnnouncementFlags};

    fn ctx() -> FrameContext {
        FrameContext { frame_counter: 0, mjd: MjdTime::from_unix(0, 0) }
    }

    #[test]
    fn fig0_19_flags_a_fresh_cluster_as_new_then_not() {
        let mut ens = empty_ensemble();
        ens.announcement_clusters.push(AnnouncementCluster {
            uid: "c1".into(),
            cluster_id: 1,
            flags: AnnouncementFlags(AnnouncementFlags::ALARM),
            target_subchannel_uid: "sub1".into(),
        });
        let mut gen = Fig0_19::default();
        let mut buf = [0u8; 16];
        let (n1, _) = gen.fill(&ens, &ctx(), &mut buf);
        assert_eq!(n1, 6);
        assert_ne!(buf[5] & 0x80, 0);

        let (n2, _) = gen.fill(&ens, &ctx(), &mut buf);
        assert_eq!(n2, 6);
        assert_eq!(buf[5] & 0x80, 0);
    }

    #[test]
    fn fig0_19_keeps_transmitting_with_cleared_flags_after_removal() {
        let mut ens = empty_ensemble();
        ens.announcement_clusters.push(AnnouncementCluster {
            uid: "c1".into(),
            cluster_id: 1,
            flags: AnnouncementFlags(AnnouncementFlags::ALARM),
            target_subchannel_uid: "sub1".into(),
        });
        let mut gen = Fig0_19::default();
        let mut buf = [0u8; 16];
        gen.fill(&ens, &ctx(), &mut buf);
        gen.fill(&ens, &ctx(), &mut buf);

        ens.announcement_clusters.clear();
        let (n, _) = gen.fill(&ens, &ctx(), &mut buf);
        assert_eq!(n, 6);
        assert_eq!(u16::from_be_bytes([buf[3], buf[4]]), 0);
        assert_eq!(gen.state.len(), 1);
    }

    #[test]
    fn fig0_18_skips_services_without_announcement_support() {
        let mut ens = empty_ensemble();
        ens.services.push(dabmux_model::Service {
            uid: "svc1".into(),
            service_id: dabmux_model::ServiceId::Programme(0x4001),
            ecc: None,
            programme_type: None,
            language_code: None,
            announcement_support: 0,
            announcement_clusters: vec![],
            label: dabmux_model::Label::new("Svc"),
        });
        let mut gen = Fig0_18::default();
        let mut buf = [0u8; 30];
        let (n, complete) = gen.fill(&ens, &ctx(), &mut buf);
        assert_eq!(n, 0);
        assert!(complete);
    }
}
