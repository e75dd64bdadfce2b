//! Shared test fixtures for FIG 0/x unit tests.
#![cfg(test)]

use dabmux_model::{Ensemble, Label, LocalTimeOffset, ReconfigCounter, TransmissionMode};

pub fn empty_ensemble() -> Ensemble {
    Ensemble {
        ecc: 0xE1,
        eid: 0x4001,
        international_table_id: 1,
        local_time_offset: LocalTimeOffset::HalfHours(2),
        transmission_mode: TransmissionMode::I,
        alarm: false,
        reconfig_counter: ReconfigCounter::Fixed(7),
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
