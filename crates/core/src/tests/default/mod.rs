use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::dht::Did;
use crate::dht::VNodeState;
use crate::swarm::Command;
use crate::swarm::EventRecord;
use crate::swarm::RingConfig;
use crate::swarm::RingEvent;
use crate::swarm::Swarm;
use crate::swarm::SwarmBuilder;

mod test_churn;
mod test_ring;
mod test_storage;

/// A swarm and the receiving end of its event channel.
pub struct Sim {
    pub swarm: Swarm,
    events: UnboundedReceiver<EventRecord>,
}

impl Sim {
    /// `hosts` hosts, bootstrap on host 0.
    pub fn new(hosts: usize) -> Self {
        Self::with_config(hosts, RingConfig::default())
    }

    pub fn with_config(hosts: usize, config: RingConfig) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let swarm = SwarmBuilder::new(tx)
            .config(config)
            .hosts(hosts)
            .bootstrap(0)
            .build()
            .unwrap();
        Self { swarm, events }
    }

    pub fn at(&mut self, at_ms: u64, host: u16, command: Command) {
        self.swarm.schedule(at_ms, host, command)
    }

    /// Every event emitted since the last call.
    pub fn drain(&mut self) -> Vec<EventRecord> {
        std::iter::from_fn(|| self.events.try_recv().ok()).collect()
    }

    pub fn drain_events(&mut self) -> Vec<RingEvent> {
        self.drain().into_iter().map(|r| r.event).collect()
    }

    /// Vnode of the host at the same index as its position in `names`, joined 200ms apart.
    pub fn join_all(&mut self, names: &[&str], start: u64) {
        for (i, name) in names.iter().enumerate() {
            self.at(
                start + 200 * i as u64,
                i as u16,
                Command::InsertVNode(name.to_string()),
            );
        }
    }

    /// Name of the live vnode responsible for `key`.
    pub fn owner_of(&self, key: Did) -> String {
        let owners: Vec<_> = self
            .swarm
            .vnodes()
            .into_iter()
            .filter(|v| v.contains(key))
            .collect();
        assert_eq!(owners.len(), 1, "{} owned by {} vnodes", key, owners.len());
        owners[0].name.clone()
    }
}

/// Names sorted by their id, the order they take on the ring.
pub fn ring_order(names: &[&str]) -> Vec<String> {
    let mut names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    names.sort_by_key(|n| Did::from_name(n));
    names
}

/// Every live vnode links to its neighbours in id order.
pub fn assert_ring_ordered(swarm: &Swarm) {
    let vnodes = swarm.vnodes();
    let n = vnodes.len();
    assert!(n > 0);
    for (i, vnode) in vnodes.iter().enumerate() {
        let next = vnodes[(i + 1) % n].did();
        let prev = vnodes[(i + n - 1) % n].did();
        assert_eq!(vnode.state, VNodeState::Stable, "{} not stable", vnode.name);
        assert_eq!(vnode.successor(), next, "wrong successor of {}", vnode.name);
        assert_eq!(vnode.predecessor(), Some(prev), "wrong predecessor of {}", vnode.name);
    }
}

pub fn count<F>(events: &[RingEvent], f: F) -> usize
where F: Fn(&RingEvent) -> bool {
    events.iter().filter(|e| f(e)).count()
}
