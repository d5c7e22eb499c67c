#![warn(missing_docs)]
//! The simulation loop owning every virtual node.
//!
//! [Swarm] is the only mutator of ring state. Harness commands, message deliveries, timers and
//! deadlines are all [Task]s of one [Scheduler], so the whole run is deterministic for a given
//! sequence of commands.

mod builder;
/// Events sent to the harness
pub mod event;
mod impls;
mod types;

use std::collections::HashMap;
use std::collections::HashSet;
use std::net::Ipv4Addr;

pub use builder::SwarmBuilder;
pub use event::EventRecord;
pub use event::RingEvent;
pub(crate) use impls::join_lookup;
use ringsim_transport::HostId;
use ringsim_transport::SimNetwork;
use tokio::sync::mpsc::UnboundedSender;
pub(crate) use types::Task;
pub use types::Command;
pub use types::OperationKind;
pub use types::PendingOperation;
pub use types::RingConfig;

use crate::dht::Did;
use crate::dht::VNodeState;
use crate::dht::VirtualNode;
use crate::error::Error;
use crate::error::Result;
use crate::message::Message;
use crate::message::MessagePayload;
use crate::sched::Scheduler;

/// The ring, its hosts and its clock.
pub struct Swarm {
    pub(crate) config: RingConfig,
    pub(crate) network: SimNetwork,
    /// Host whose vnodes are preferred as entry point for joins.
    pub(crate) bootstrap: HostId,
    /// Registry of live vnodes. A crashed or removed vnode is simply absent.
    pub(crate) vnodes: HashMap<Did, VirtualNode>,
    /// Name and host of every vnode ever created, dead ones included.
    pub(crate) directory: HashMap<Did, (String, HostId)>,
    /// Names of the vnodes a crash took down, per host.
    pub(crate) crashed: HashMap<HostId, Vec<String>>,
    /// Vnodes whose failure was already reported, or which left gracefully.
    pub(crate) reported: HashSet<Did>,
    pub(crate) pending: HashMap<u64, PendingOperation>,
    pub(crate) sched: Scheduler<Task>,
    next_id: u64,
    events: UnboundedSender<EventRecord>,
}

impl Swarm {
    /// Current simulated time in ms.
    pub fn now(&self) -> u64 {
        self.sched.now()
    }

    /// The simulated LAN.
    pub fn network(&self) -> &SimNetwork {
        &self.network
    }

    /// Protocol tunables.
    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    /// Get a live vnode.
    pub fn vnode(&self, did: Did) -> Option<&VirtualNode> {
        self.vnodes.get(&did)
    }

    /// Get a live vnode by name.
    pub fn vnode_by_name(&self, name: &str) -> Option<&VirtualNode> {
        self.vnodes.get(&Did::from_name(name))
    }

    /// Every live vnode, in id order.
    pub fn vnodes(&self) -> Vec<&VirtualNode> {
        let mut vnodes: Vec<&VirtualNode> = self.vnodes.values().collect();
        vnodes.sort_by_key(|v| v.did());
        vnodes
    }

    /// Operations waiting for an answer.
    pub fn pending_operations(&self) -> usize {
        self.pending.len()
    }

    /// Time of the next scheduled task.
    pub fn next_task_time(&self) -> Option<u64> {
        self.sched.peek_time()
    }

    /// Schedule a harness command on `host` at absolute time `at_ms`.
    pub fn schedule(&mut self, at_ms: u64, host: HostId, command: Command) {
        tracing::debug!("schedule {} on node {} at {}", command.name(), host, at_ms);
        self.sched.schedule_at(at_ms, Task::Command(host, command));
    }

    /// Run every task due up to `t` included, then move the clock to `t`.
    pub fn run_until(&mut self, t: u64) {
        while let Some((_, task)) = self.sched.pop_until(t) {
            self.run_task(task);
        }
        self.sched.advance_to(t);
    }

    /// Run the simulation for `ms` more milliseconds.
    pub fn run_for(&mut self, ms: u64) {
        let until = self.now().saturating_add(ms);
        self.run_until(until)
    }

    fn run_task(&mut self, task: Task) {
        let res = match task {
            Task::Command(host, command) => {
                let name = command.name();
                self.execute(host, command).map_err(|e| {
                    tracing::warn!("command {} on node {} dropped: {}", name, host, e);
                    e
                })
            }
            Task::Deliver(payload) => self.deliver(payload),
            Task::Undeliverable(payload) => self.handle_undeliverable(payload),
            Task::Stabilize(did, incarnation) => self.stabilize(did, incarnation),
            Task::FixFingers(did, incarnation) => self.fix_fingers(did, incarnation),
            Task::Expire(txn) => self.expire(txn),
            Task::LeaveTimeout(did, incarnation) => self.leave_timeout(did, incarnation),
        };
        if let Err(e) = res {
            tracing::debug!("task failed at {}: {}", self.now(), e);
        }
    }

    /// Run one harness command right now.
    pub fn execute(&mut self, host: HostId, command: Command) -> Result<()> {
        tracing::info!("node {} runs {:?}", host, command);
        match command {
            Command::InsertVNode(name) => self.insert_vnode(host, &name).map(|_| ()),
            Command::RemoveVNode(name) => self.remove_vnode(host, &name),
            Command::Lookup(name) => self.lookup(host, &name),
            Command::Insert(name, value) => self.insert(host, &name, value.into_bytes()),
            Command::Retrieve(name) => self.retrieve(host, &name),
            Command::DumpVNodeInfo(name) => self.dump_vnode_info(host, &name),
            Command::DumpDHashInfo => self.dump_dhash_info(host),
            Command::TraceRing(name) => self.trace_ring(host, &name),
            Command::FixFinger(name) => self.fix_all_fingers(host, &name),
            Command::Detach => self.detach(host),
            Command::ReAttach => self.reattach(host),
            Command::Crash => self.crash(host),
            Command::Restart => self.restart(host),
        }
    }

    pub(crate) fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn emit(&self, event: RingEvent) {
        tracing::debug!("emit {:?}", event);
        let record = EventRecord {
            at_ms: self.now(),
            event,
        };
        if self.events.send(record).is_err() {
            tracing::debug!("event receiver dropped");
        }
    }

    /// Host of a vnode, dead or alive.
    pub(crate) fn host_of(&self, did: Did) -> Option<HostId> {
        self.directory.get(&did).map(|(_, host)| *host)
    }

    /// Name of a vnode, dead or alive.
    pub(crate) fn name_of(&self, did: Did) -> String {
        self.directory
            .get(&did)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| did.to_string())
    }

    /// Address and port of the host of a vnode.
    pub(crate) fn endpoint(&self, did: Did) -> Option<(Ipv4Addr, u16)> {
        self.host_of(did)
            .and_then(|host| self.network.endpoint(host).ok())
    }

    pub(crate) fn vnode_mut(&mut self, did: Did) -> Result<&mut VirtualNode> {
        self.vnodes
            .get_mut(&did)
            .ok_or_else(|| Error::VNodeNotFound(did.to_string()))
    }

    /// Resolve a vnode name that must live on `host`.
    pub(crate) fn vnode_on_host(&self, host: HostId, name: &str) -> Result<Did> {
        let vnode = self
            .vnode_by_name(name)
            .ok_or_else(|| Error::VNodeNotFound(name.to_string()))?;
        if vnode.host != host {
            return Err(Error::VNodeNotOnHost(name.to_string(), host));
        }
        Ok(vnode.did())
    }

    /// A stable vnode reachable from `host`, preferring the bootstrap host, then the lowest id.
    pub(crate) fn entry_point(&self, host: HostId, exclude: Option<Did>) -> Option<Did> {
        let live: Vec<&VirtualNode> = self
            .vnodes()
            .into_iter()
            .filter(|v| Some(v.did()) != exclude)
            .filter(|v| v.state == VNodeState::Stable)
            .filter(|v| self.network.can_deliver(host, v.host))
            .collect();
        live.iter()
            .find(|v| v.host == self.bootstrap)
            .or_else(|| live.first())
            .map(|v| v.did())
    }

    /// The vnode an operation issued on `host` starts from: a local stable vnode if any,
    /// else an entry point.
    pub(crate) fn origin_for(&self, host: HostId) -> Option<Did> {
        if !self
            .network
            .host(host)
            .map(|h| h.app == ringsim_transport::AppState::Running)
            .unwrap_or(false)
        {
            return None;
        }
        self.vnodes()
            .into_iter()
            .find(|v| v.host == host && v.state == VNodeState::Stable)
            .map(|v| v.did())
            .or_else(|| self.entry_point(host, None))
    }

    /// Send a message, delivered after one hop latency.
    pub(crate) fn send(&mut self, from: Did, to: Did, data: Message) {
        tracing::trace!("{} -> {}: {}", from, to, data.kind());
        self.sched.schedule_after(
            self.config.hop_latency_ms,
            Task::Deliver(MessagePayload::new(from, to, data)),
        );
    }

    fn deliver(&mut self, payload: MessagePayload) -> Result<()> {
        let reachable = match (self.host_of(payload.from), self.vnodes.get(&payload.to)) {
            (Some(from_host), Some(target)) => self.network.can_deliver(from_host, target.host),
            _ => false,
        };
        if !reachable {
            tracing::debug!(
                "{} from {} undeliverable: {}",
                payload.data.kind(),
                payload.from,
                Error::NodeUnreachable(payload.to)
            );
            self.sched
                .schedule_after(self.config.request_timeout_ms, Task::Undeliverable(payload));
            return Ok(());
        }
        self.handle_payload(payload)
    }

    /// Register an operation and its deadline.
    pub(crate) fn start_operation(
        &mut self,
        kind: OperationKind,
        key: Did,
        origin_host: HostId,
        origin: Did,
    ) -> u64 {
        let txn = self.next_id();
        let issued_at = self.now();
        let deadline = issued_at + self.config.operation_timeout_ms;
        self.pending.insert(txn, PendingOperation {
            txn,
            kind,
            key,
            origin_host,
            origin,
            issued_at,
            deadline,
        });
        self.sched.schedule_at(deadline, Task::Expire(txn));
        txn
    }

    fn expire(&mut self, txn: u64) -> Result<()> {
        if let Some(op) = self.pending.remove(&txn) {
            tracing::info!("operation {} on {} timed out", txn, op.key);
            self.fail_operation(op);
        }
        Ok(())
    }

    /// Report the failure of an operation.
    pub(crate) fn fail_operation(&mut self, op: PendingOperation) {
        match op.kind {
            OperationKind::Lookup => self.emit(RingEvent::LookupFailure { key: op.key }),
            OperationKind::Insert(value) => self.emit(RingEvent::InsertFailure { key: op.key, value }),
            OperationKind::Retrieve => self.emit(RingEvent::RetrieveFailure { key: op.key }),
            OperationKind::Join { .. } => self.join_failed(op.origin),
            OperationKind::FixFinger(index) => {
                tracing::debug!("fix finger {} of {} gave up", index, op.origin)
            }
        }
    }

    /// Emit the ownership event of `did` for its current predecessor.
    pub(crate) fn emit_ownership(&mut self, did: Did, old: Option<Did>) {
        let Some(vnode) = self.vnodes.get(&did) else {
            return;
        };
        let Some(pred) = vnode.predecessor() else {
            return;
        };
        let Some((address, port)) = self.endpoint(pred) else {
            return;
        };
        self.emit(RingEvent::VNodeKeyOwnership {
            name: vnode.name.clone(),
            key: did,
            predecessor_key: pred,
            old_predecessor_key: old,
            predecessor_address: address,
            predecessor_port: port,
        });
    }

    /// Report a vnode found unreachable, once.
    pub(crate) fn report_failure(&mut self, did: Did) {
        if self.reported.insert(did) {
            let name = self.name_of(did);
            tracing::info!("vnode {} ({}) failed", name, did);
            self.emit(RingEvent::VNodeFailure { name, key: did });
        }
    }

    /// Arm the periodic timers of a vnode that became stable.
    pub(crate) fn start_timers(&mut self, did: Did) {
        if let Some(incarnation) = self.vnodes.get(&did).map(|v| v.incarnation) {
            self.sched.schedule_after(
                self.config.stabilize_interval_ms,
                Task::Stabilize(did, incarnation),
            );
            self.sched.schedule_after(
                self.config.fix_finger_interval_ms,
                Task::FixFingers(did, incarnation),
            );
        }
    }
}
