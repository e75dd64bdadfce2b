//! Other-ensemble services (FIG 0/24): SIds also carried by other
//! ensembles, for service-following receivers.

#[derive(Debug, Clone)]
pub struct OtherEnsembleService {
    pub service_id: u32,
    pub other_eids: Vec<u16>,
}
