//! Linkage sets: groups of services presented to the receiver as
//! equivalent alternatives (FIG 0/6).

/// The network a link entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkType {
    Dab,
    Fm,
    Drm,
    Amss,
}

/// A single entry in a linkage set: another service reachable on a
/// different network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEntry {
    pub link_type: LinkType,
    /// 16-bit (DAB/FM) or 32-bit (DRM/AMSS) id of the linked service.
    pub id: u32,
    pub ecc: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct LinkageSet {
    /// 12-bit Linkage Set Number.
    pub lsn: u16,
    pub active: bool,
    pub hard: bool,
    pub international: bool,
    /// Uid of the key service; must resolve to a resident service.
    pub key_service_uid: String,
    pub links: Vec<LinkEntry>,
}

impl LinkageSet {
    /// Split a mixed-type linkage set into per-type subsets sharing the
    /// same LSN and key service, since a single transmitted FIG 0/6
    /// instance may carry at most one link type.
    pub fn split_by_type(&self) -> Vec<LinkageSubset<'_>> {
        let mut types: Vec<LinkType> = Vec::new();
        for link in &self.links {
            if !types.contains(&link.link_type) {
                types.push(link.link_type);
            }
        }
        types
            .into_iter()
            .map(|t| LinkageSubset {
                set: self,
                link_type: t,
                links: self.links.iter().filter(|l| l.link_type == t).collect(),
            })
            .collect()
    }
}

/// One FIG-0/6-instance's worth of a linkage set: all links of a single
/// type, with the owning set's metadata.
#[derive(Debug, Clone)]
pub struct LinkageSubset<'a> {
    pub set: &'a LinkageSet,
    pub link_type: LinkType,
    pub links: Vec<&'a LinkEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_groups_by_link_type() {
        let set = LinkageSet {
            lsn: 1,
            active: true,
            hard: false,
            international: false,
            key_service_uid: "svc1".into(),
            links: vec![
                LinkEntry { link_type: LinkType::Dab, id: 0x1001, ecc: None },
                LinkEntry { link_type: LinkType::Fm, id: 0xE201, ecc: Some(0xE2) },
                LinkEntry { link_type: LinkType::Dab, id: 0x1002, ecc: None },
            ],
        };
        let subsets = set.split_by_type();
        assert_eq!(subsets.len(), 2);
        let dab = subsets.iter().find(|s| s.link_type == LinkType::Dab).unwrap();
        assert_eq!(dab.links.len(), 2);
    }
}
