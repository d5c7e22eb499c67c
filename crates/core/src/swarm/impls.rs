//! Harness operations of [Swarm], one per [super::Command].
use ringsim_transport::AppState;
use ringsim_transport::HostId;
use ringsim_transport::LinkState;

use super::OperationKind;
use super::RingEvent;
use super::Swarm;
use super::Task;
use crate::consts::KEY_BITS;
use crate::dht::Did;
use crate::dht::VNodeState;
use crate::dht::VirtualNode;
use crate::error::Error;
use crate::error::Result;
use crate::inspect::DHashInspect;
use crate::inspect::VNodeInspect;
use crate::message::FindSuccessorSend;
use crate::message::FindSuccessorThen;
use crate::message::LeaveHandoff;
use crate::message::Message;
use crate::message::TraceRing;

impl Swarm {
    /// Create a vnode named `name` on `host` and start its join.
    pub fn insert_vnode(&mut self, host: HostId, name: &str) -> Result<Did> {
        let h = self.network.host(host)?;
        if h.app != AppState::Running {
            return Err(Error::HostStopped(host));
        }
        if h.link == LinkState::Detached {
            return Err(Error::HostDetached(host));
        }
        let did = Did::from_name(name);
        if self.vnodes.contains_key(&did) {
            return Err(Error::VNodeNameExists(name.to_string()));
        }

        let incarnation = self.next_id();
        let vnode = VirtualNode::new(name, host, self.config.successor_list_len, incarnation);
        self.vnodes.insert(did, vnode);
        self.directory.insert(did, (name.to_string(), host));
        self.reported.remove(&did);

        match self.entry_point(host, Some(did)) {
            None => {
                tracing::info!("vnode {} ({}) bootstraps the ring", name, did);
                self.bootstrap_vnode(did)?;
            }
            Some(entry) => {
                tracing::info!("vnode {} ({}) joins through {}", name, did, entry);
                let txn = self.start_operation(OperationKind::Join { attempts: 1 }, did, host, did);
                self.send(did, entry, join_lookup(txn, did));
            }
        }
        Ok(did)
    }

    /// Make a joining vnode the only member of the ring.
    pub(crate) fn bootstrap_vnode(&mut self, did: Did) -> Result<()> {
        let vnode = self.vnode_mut(did)?;
        vnode.ring.bootstrap();
        vnode.state = VNodeState::Stable;
        let name = vnode.name.clone();
        self.emit(RingEvent::JoinSuccess { name, key: did });
        self.emit_ownership(did, None);
        self.start_timers(did);
        Ok(())
    }

    /// Start the graceful leave of a vnode.
    pub fn remove_vnode(&mut self, host: HostId, name: &str) -> Result<()> {
        let did = self.vnode_on_host(host, name)?;
        let handoff = self.next_id();
        let leave_timeout = self.config.operation_timeout_ms;
        let vnode = self.vnode_mut(did)?;
        if vnode.state != VNodeState::Stable {
            return Err(Error::VNodeNotStable(
                name.to_string(),
                vnode.state.to_string(),
            ));
        }
        if vnode.ring.is_alone() {
            return self.finish_leave(did);
        }

        let objects = vnode.store.objects()?;
        vnode
            .handoffs
            .insert(handoff, objects.iter().map(|o| o.key).collect());
        vnode.state = VNodeState::Leaving;
        let successor = vnode.successor();
        let predecessor = vnode.predecessor();
        let incarnation = vnode.incarnation;

        tracing::info!("vnode {} leaves, handing {} objects to {}", name, objects.len(), successor);
        self.send(
            did,
            successor,
            Message::LeaveHandoff(LeaveHandoff {
                handoff,
                predecessor,
                objects,
            }),
        );
        self.sched
            .schedule_after(leave_timeout, Task::LeaveTimeout(did, incarnation));
        Ok(())
    }

    /// Find the owner of `SHA-1(name)`.
    pub fn lookup(&mut self, host: HostId, name: &str) -> Result<()> {
        self.start_routed(host, Did::from_name(name), OperationKind::Lookup)
    }

    /// Store `value` under `SHA-1(name)`.
    pub fn insert(&mut self, host: HostId, name: &str, value: Vec<u8>) -> Result<()> {
        self.start_routed(host, Did::from_name(name), OperationKind::Insert(value))
    }

    /// Fetch the value stored under `SHA-1(name)`.
    pub fn retrieve(&mut self, host: HostId, name: &str) -> Result<()> {
        self.start_routed(host, Did::from_name(name), OperationKind::Retrieve)
    }

    fn start_routed(&mut self, host: HostId, key: Did, kind: OperationKind) -> Result<()> {
        let then = match &kind {
            OperationKind::Insert(value) => FindSuccessorThen::Store(value.clone()),
            OperationKind::Retrieve => FindSuccessorThen::Fetch,
            _ => FindSuccessorThen::Report,
        };
        let Some(origin) = self.origin_for(host) else {
            tracing::info!("node {} has no way into the ring", host);
            self.fail_operation(super::PendingOperation {
                txn: 0,
                kind,
                key,
                origin_host: host,
                origin: key,
                issued_at: self.now(),
                deadline: self.now(),
            });
            return Ok(());
        };
        let txn = self.start_operation(kind, key, host, origin);
        self.handle_find_successor(origin, FindSuccessorSend {
            txn,
            key,
            then,
            origin,
            hops: 0,
            retries: 0,
            final_hop: false,
        })
    }

    /// Emit [RingEvent::VNodeInfo] for a vnode of `host`.
    pub fn dump_vnode_info(&mut self, host: HostId, name: &str) -> Result<()> {
        let did = self.vnode_on_host(host, name)?;
        let (address, port) = self.network.endpoint(host)?;
        let vnode = self
            .vnodes
            .get(&did)
            .ok_or_else(|| Error::VNodeNotFound(name.to_string()))?;
        let info = VNodeInspect::inspect(vnode, address, port);
        self.emit(RingEvent::VNodeInfo(info));
        Ok(())
    }

    /// Emit [RingEvent::DHashInfo] for every vnode of `host`.
    pub fn dump_dhash_info(&mut self, host: HostId) -> Result<()> {
        self.network.host(host)?;
        let info = DHashInspect::inspect(host, self.vnodes.values().filter(|v| v.host == host))?;
        self.emit(RingEvent::DHashInfo(info));
        Ok(())
    }

    /// Walk the ring through successors, starting at a vnode of `host`.
    pub fn trace_ring(&mut self, host: HostId, name: &str) -> Result<()> {
        let did = self.vnode_on_host(host, name)?;
        self.emit(RingEvent::TraceRing {
            name: name.to_string(),
            key: did,
        });
        let successor = self
            .vnode(did)
            .map(|v| v.successor())
            .unwrap_or(did);
        if successor != did {
            self.send(
                did,
                successor,
                Message::TraceRing(TraceRing {
                    origin: did,
                    hops: 1,
                }),
            );
        }
        Ok(())
    }

    /// Refresh all the fingers of a vnode at once.
    pub fn fix_all_fingers(&mut self, host: HostId, name: &str) -> Result<()> {
        let did = self.vnode_on_host(host, name)?;
        let vnode = self.vnode_mut(did)?;
        if vnode.state != VNodeState::Stable {
            return Err(Error::VNodeNotStable(
                name.to_string(),
                vnode.state.to_string(),
            ));
        }
        for index in 0..KEY_BITS {
            self.fix_finger(did, host, index)?;
        }
        Ok(())
    }

    /// Look up the node responsible for the start of finger `index`.
    pub(crate) fn fix_finger(&mut self, did: Did, host: HostId, index: usize) -> Result<()> {
        let key = self.vnode_mut(did)?.ring.finger.start(index);
        let txn = self.start_operation(OperationKind::FixFinger(index), key, host, did);
        self.handle_find_successor(did, FindSuccessorSend {
            txn,
            key,
            then: FindSuccessorThen::Report,
            origin: did,
            hops: 0,
            retries: 0,
            final_hop: false,
        })
    }

    /// Cut the link of a host.
    pub fn detach(&mut self, host: HostId) -> Result<()> {
        if self.network.detach(host)? {
            self.emit(RingEvent::HostDetached { host });
        }
        Ok(())
    }

    /// Restore the link of a host. Its vnodes rejoin from scratch.
    pub fn reattach(&mut self, host: HostId) -> Result<()> {
        let success = self.network.reattach(host)?;
        self.emit(RingEvent::HostReattached { host, success });
        if !success {
            return Ok(());
        }
        let names: Vec<String> = self
            .vnodes()
            .into_iter()
            .filter(|v| v.host == host)
            .map(|v| v.name.clone())
            .collect();
        for name in names.iter() {
            self.vnodes.remove(&Did::from_name(name));
        }
        self.rejoin(host, names);
        Ok(())
    }

    /// Stop the DHT application of a host, dropping its vnodes without handoff.
    pub fn crash(&mut self, host: HostId) -> Result<()> {
        if !self.network.crash(host)? {
            return Ok(());
        }
        let dids: Vec<Did> = self
            .vnodes()
            .into_iter()
            .filter(|v| v.host == host)
            .map(|v| v.did())
            .collect();
        let crashed = self.crashed.entry(host).or_default();
        for did in dids {
            if let Some(vnode) = self.vnodes.remove(&did) {
                crashed.push(vnode.name);
            }
        }
        tracing::info!("node {} crashed with {} vnodes", host, crashed.len());
        self.emit(RingEvent::HostCrashed { host });
        Ok(())
    }

    /// Restart the DHT application of a host and rejoin the vnodes the crash took down.
    pub fn restart(&mut self, host: HostId) -> Result<()> {
        if !self.network.restart(host)? {
            return Ok(());
        }
        self.emit(RingEvent::HostRestarted { host });
        let names = self.crashed.remove(&host).unwrap_or_default();
        self.rejoin(host, names);
        Ok(())
    }

    fn rejoin(&mut self, host: HostId, names: Vec<String>) {
        for name in names {
            if let Err(e) = self.insert_vnode(host, &name) {
                tracing::warn!("vnode {} could not rejoin: {}", name, e);
            }
        }
    }
}

/// First lookup of a join, for the key of the joining vnode.
pub(crate) fn join_lookup(txn: u64, did: Did) -> Message {
    Message::FindSuccessorSend(FindSuccessorSend {
        txn,
        key: did,
        then: FindSuccessorThen::Join,
        origin: did,
        hops: 0,
        retries: 0,
        final_hop: false,
    })
}
