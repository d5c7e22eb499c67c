use std::net::Ipv4Addr;

use ringsim_transport::HostId;
use serde::Deserialize;
use serde::Serialize;

use crate::dht::VirtualNode;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VNodeInspect {
    pub did: String,
    pub name: String,
    pub host: HostId,
    pub address: Ipv4Addr,
    pub port: u16,
    pub state: String,
    pub successors: Vec<String>,
    #[serde(default)]
    pub predecessor: Option<String>,
    pub finger_table: Vec<(Option<String>, u64, u64)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageInspect {
    pub name: String,
    pub did: String,
    pub items: Vec<(String, String)>,
    pub backup_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DHashInspect {
    pub host: HostId,
    pub vnodes: Vec<StorageInspect>,
}

impl VNodeInspect {
    pub fn inspect(vnode: &VirtualNode, address: Ipv4Addr, port: u16) -> Self {
        let ring = &vnode.ring;
        let successors = ring
            .successors()
            .list()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        let finger = ring.finger.list().iter().map(|x| x.map(|did| did.to_string()));

        Self {
            did: ring.did.to_string(),
            name: vnode.name.clone(),
            host: vnode.host,
            address,
            port,
            state: vnode.state.to_string(),
            successors,
            predecessor: ring.predecessor.map(|x| x.to_string()),
            finger_table: compress_iter(finger),
        }
    }
}

impl StorageInspect {
    pub fn inspect(vnode: &VirtualNode) -> Result<Self> {
        let items = vnode
            .store
            .objects()?
            .into_iter()
            .map(|o| {
                (
                    o.key.to_string(),
                    String::from_utf8_lossy(&o.value).into_owned(),
                )
            })
            .collect();
        Ok(Self {
            name: vnode.name.clone(),
            did: vnode.did().to_string(),
            items,
            backup_count: vnode.store.backup_objects()?.len(),
        })
    }
}

impl DHashInspect {
    /// Inventory of the given vnodes, ordered by did.
    pub fn inspect<'a>(host: HostId, vnodes: impl Iterator<Item = &'a VirtualNode>) -> Result<Self> {
        let mut vnodes = vnodes
            .map(StorageInspect::inspect)
            .collect::<Result<Vec<_>>>()?;
        vnodes.sort_by(|a, b| a.did.cmp(&b.did));
        Ok(Self { host, vnodes })
    }
}

impl std::fmt::Display for VNodeInspect {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "VNode: {} ({})", self.name, self.state)?;
        writeln!(f, "Host: {} Ip: {} Port: {}", self.host, self.address, self.port)?;
        writeln!(f, "Key: {}", self.did)?;
        match &self.predecessor {
            Some(p) => writeln!(f, "Predecessor: {p}")?,
            None => writeln!(f, "Predecessor: none")?,
        }
        writeln!(f, "Successors:")?;
        for s in self.successors.iter() {
            writeln!(f, "  {s}")?;
        }
        write!(f, "Finger Table:")?;
        for (did, start, end) in self.finger_table.iter() {
            write!(
                f,
                "\n  [{start:>3}..{end:>3}] {}",
                did.as_deref().unwrap_or("-")
            )?;
        }
        Ok(())
    }
}

impl std::fmt::Display for DHashInspect {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "DHash of node {}", self.host)?;
        for vnode in self.vnodes.iter() {
            write!(
                f,
                "\nVNode: {} Key: {} Objects: {} Replicas: {}",
                vnode.name,
                vnode.did,
                vnode.items.len(),
                vnode.backup_count
            )?;
            for (k, v) in vnode.items.iter() {
                write!(f, "\n  {k} => {v}")?;
            }
        }
        Ok(())
    }
}

pub fn compress_iter<T>(iter: impl Iterator<Item = T>) -> Vec<(T, u64, u64)>
where T: PartialEq {
    let mut result = vec![];
    let mut start = 0u64;
    let mut count = 0u64;
    let mut prev: Option<T> = None;

    for (i, x) in iter.enumerate() {
        match prev {
            Some(p) if p == x => {
                count += 1;
                prev = Some(p);
                continue;
            }
            Some(p) => {
                result.push((p, start, start + count - 1));
            }
            None => {}
        }
        start = i as u64;
        count = 1;
        prev = Some(x);
    }

    if let Some(p) = prev {
        result.push((p, start, start + count - 1));
    }

    result
}
