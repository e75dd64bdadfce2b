//! Uniform uid + snapshot access over ensemble entities, used by the
//! remote-control/statistics registry to walk the model without a
//! downcasting dispatch chain.

use serde_json::{json, Value};

use crate::component::Component;
use crate::service::{Service, ServiceId};
use crate::subchannel::Subchannel;

/// An entity addressable by a stable string uid whose current state can
/// be snapshotted as JSON for the `config`/`values` remote-control
/// queries.
pub trait ManagedObject {
    fn uid(&self) -> &str;
    /// Short kind tag (`"subchannel"`, `"service"`, …) for the `config`
    /// listing.
    fn kind(&self) -> &'static str;
    fn snapshot(&self) -> Value;
}

impl ManagedObject for Subchannel {
    fn uid(&self) -> &str {
        &self.uid
    }
    fn kind(&self) -> &'static str {
        "subchannel"
    }
    fn snapshot(&self) -> Value {
        json!({
            "id": self.id,
            "bitrate": self.bitrate_kbps,
            "start_cu": self.start_cu,
            "size_cu": self.size_cu,
            "tpl": self.to_tpl(),
            "input": self.input_uri,
        })
    }
}

impl ManagedObject for Service {
    fn uid(&self) -> &str {
        &self.uid
    }
    fn kind(&self) -> &'static str {
        "service"
    }
    fn snapshot(&self) -> Value {
        let id = match self.service_id {
            ServiceId::Programme(id) => id as u32,
            ServiceId::Data(id) => id,
        };
        json!({
            "id": id,
            "label": self.label.long,
            "programme": self.is_programme(),
        })
    }
}

impl ManagedObject for Component {
    fn uid(&self) -> &str {
        &self.uid
    }
    fn kind(&self) -> &'static str {
        "component"
    }
    fn snapshot(&self) -> Value {
        json!({
            "service": self.service_uid,
            "subchannel": self.subchannel_uid,
            "scids": self.scids,
            "component_type": self.component_type,
        })
    }
}
