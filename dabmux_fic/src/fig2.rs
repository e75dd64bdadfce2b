//! FIG type 2: extended (UTF-8) labels with text-control attributes, for
//! entities that declared an [`ExtendedLabel`](dabmux_model::ExtendedLabel).

use dabmux_model::{Ensemble, TextAttribute};

use crate::generator::{fig_header, FigGenerator, FrameContext};
use crate::rate::RepetitionRate;

fn attribute_code(attr: TextAttribute) -> u8 {
    match attr {
        TextAttribute::Bold => 1,
        TextAttribute::Italic => 2,
        TextAttribute::Underline => 3,
    }
}

/// FIG 2/0: extended ensemble label, emitted only when the ensemble
/// declares one.
#[derive(Debug, Default)]
pub struct Fig2_0;

impl FigGenerator for Fig2_0 {
    fn fig_type(&self) -> (u8, u8) {
        (2, 0)
    }
    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::D
    }
    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let Some(ext) = &ensemble.label.extended else {
            return (0, true);
        };

        let mut body = Vec::new();
        body.extend_from_slice(&ensemble.eid.to_be_bytes());
        let text_bytes = ext.text.as_bytes();
        let len = text_bytes.len().min(255);
        body.push(len as u8);
        body.extend_from_slice(&text_bytes[..len]);
        body.push(ext.control.len() as u8);
        for ctrl in &ext.control {
            body.push(ctrl.start);
            body.push(ctrl.len);
            body.push(attribute_code(ctrl.attribute));
        }

        if body.len() + 2 > buf.len() {
            return (0, false);
        }
        buf[0] = fig_header(2, (body.len() + 1) as u8);
        buf[1] = 0; // charset UTF-8, extension 0
        buf[2..2 + body.len()].copy_from_slice(&body);
        (2 + body.len(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fig0::test_support::empty_ensemble;
    use dabmux_core::time::MjdTime;
    use dabmux_model::ExtendedLabel;

    fn ctx() -> FrameContext {
        FrameContext { frame_counter: 0, mjd: MjdTime::from_unix(0, 0) }
    }

    #[test]
    fn no_extended_label_completes_with_nothing_written() {
        let ensemble = empty_ensemble();
        let mut gen = Fig2_0;
        let mut buf = [0u8; 32];
        let (n, complete) = gen.fill(&ensemble, &ctx(), &mut buf);
        assert_eq!(n, 0);
        assert!(complete);
    }

    #[test]
    fn extended_label_is_encoded() {
        let mut ensemble = empty_ensemble();
        ensemble.label.extended = Some(ExtendedLabel { text: "Café Ensemble".into(), control: vec![] });
        let mut gen = Fig2_0;
        let mut buf = [0u8; 64];
        let (n, complete) = gen.fill(&ensemble, &ctx(), &mut buf);
        assert!(complete);
        assert!(n > 0);
    }
}
