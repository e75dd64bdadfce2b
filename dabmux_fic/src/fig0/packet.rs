//! FIG 0/3: packet-mode component addressing.

use dabmux_model::Ensemble;

use crate::generator::{fig0_header, fig_header, FigGenerator, FrameContext};
use crate::rate::RepetitionRate;

#[derive(Debug, Default)]
pub struct Fig0_3 {
    cursor: usize,
}

impl FigGenerator for Fig0_3 {
    fn fig_type(&self) -> (u8, u8) {
        (0, 3)
    }

    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::B
    }

    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let packet_components: Vec<_> =
            ensemble.components.iter().filter(|c| c.packet_addressing.is_some()).collect();
        let n = packet_components.len();
        if n == 0 {
            return (0, true);
        }

        let mut body = Vec::new();
        let mut visited = 0;
        while visited < n {
            let comp = packet_components[(self.cursor + visited) % n];
            let pa = comp.packet_addressing.unwrap();
            if body.len() + 4 > buf.len().saturating_sub(2) {
                break;
            }
            body.extend_from_slice(&pa.packet_id.to_be_bytes());
            body.push((pa.data_group as u8) << 7 | ((pa.packet_address >> 8) as u8 & 0x03));
            body.push((pa.packet_address & 0xFF) as u8);
            visited += 1;
        }

        if visited == 0 {
            return (0, false);
        }

        buf[0] = fig_header(0, (body.len() + 1) as u8);
        buf[1] = fig0_header(3, false, false, false);
        buf[2..2 + body.len()].copy_from_slice(&body);
        let written = 2 + body.len();
        let complete = visited == n;
        self.cursor = (self.cursor + visited) % n;
        (written, complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fig0::test_support::empty_ensemble;
    use dabmux_core::time::MjdTime;
    use dabmux_model::component::PacketAddressing;
    use dabmux_model::Component;

    fn ctx() -> FrameContext {
        FrameContext { frame_counter: 0, mjd: MjdTime::from_unix(0, 0) }
    }

    #[test]
    fn emits_one_entry_per_packet_component() {
        let mut ens = empty_ensemble();
        ens.components.push(Component {
            uid: "comp1".into(),
            service_uid: "svc1".into(),
            subchannel_uid: "sub1".into(),
            scids: 0,
            component_type: 0,
            packet_addressing: Some(PacketAddressing { packet_id: 10, packet_address: 3, data_group: false }),
            user_applications: vec![],
            label: None,
        });
        let mut gen = Fig0_3::default();
        let mut buf = [0u8; 30];
        let (n, complete) = gen.fill(&ens, &ctx(), &mut buf);
        assert!(complete);
        assert_eq!(n, 6);
    }
}
