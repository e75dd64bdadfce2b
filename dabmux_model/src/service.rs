//! Service: a broadcast offering identified by a service id (SId).

use crate::label::Label;

/// 16-bit (programme) or 32-bit (data) service identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceId {
    Programme(u16),
    Data(u32),
}

impl ServiceId {
    /// Programme type field also carries a PD (Programme/Data) flag; data
    /// services set PD=1 in the FIGs that reference this id.
    pub fn pd_flag(self) -> bool {
        matches!(self, ServiceId::Data(_))
    }
}

/// Programme type with its dynamic/static signalling flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgrammeType {
    pub code: u8,
    pub dynamic: bool,
}

#[derive(Debug, Clone)]
pub struct Service {
    pub uid: String,
    pub service_id: ServiceId,
    /// Extended Country Code, overrides the ensemble ECC when set.
    pub ecc: Option<u8>,
    pub programme_type: Option<ProgrammeType>,
    pub language_code: Option<u8>,
    /// 16-bit announcement support bitmap (ASu).
    pub announcement_support: u16,
    pub announcement_clusters: Vec<String>,
    pub label: Label,
}

impl Service {
    /// A service is "programme" iff its service id is 16-bit; data
    /// services carry a 32-bit id and set PD=1 in the FIGs.
    pub fn is_programme(&self) -> bool {
        matches!(self.service_id, ServiceId::Programme(_))
    }
}
