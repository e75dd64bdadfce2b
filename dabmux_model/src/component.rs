//! Component: binds a service to a sub-channel.

use crate::label::Label;

/// Packet-mode addressing, present only when the component's sub-channel
/// is `SubchannelType::Packet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketAddressing {
    /// 12-bit packet id.
    pub packet_id: u16,
    /// 10-bit packet address.
    pub packet_address: u16,
    pub data_group: bool,
}

/// A user-application descriptor (FIG 0/13): an application type code plus
/// an optional X-PAD application type for audio components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserApplication {
    pub app_type: u16,
    pub xpad_app_type: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct Component {
    pub uid: String,
    pub service_uid: String,
    pub subchannel_uid: String,
    /// Monotonically assigned per-service, starting at 0 for the primary
    /// component.
    pub scids: u8,
    /// Service-component type: 0x0 for MPEG audio, 0x3F for AAC/DAB+,
    /// programmer-supplied for data.
    pub component_type: u8,
    pub packet_addressing: Option<PacketAddressing>,
    pub user_applications: Vec<UserApplication>,
    /// Label; must be absent when `scids == 0` (primary components carry
    /// no label).
    pub label: Option<Label>,
}

impl Component {
    pub fn is_primary(&self) -> bool {
        self.scids == 0
    }
}
