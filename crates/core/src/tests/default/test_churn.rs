use super::*;

const NAMES: [&str; 5] = ["A", "B", "C", "D", "E"];

fn stable_ring() -> Sim {
    let mut sim = Sim::new(8);
    sim.join_all(&NAMES, 0);
    sim.swarm.run_until(10_000);
    assert_ring_ordered(&sim.swarm);
    sim.drain();
    sim
}

#[test]
fn test_detach_then_reattach_rejoins() {
    let mut sim = stable_ring();
    let host = sim.swarm.vnode_by_name("C").unwrap().host;
    let c = Did::from_name("C");

    sim.at(10_000, host, Command::Detach);
    sim.swarm.run_until(15_000);
    let events = sim.drain_events();
    assert_eq!(events[0], RingEvent::HostDetached { host });
    assert_eq!(
        count(&events, |e| *e
            == RingEvent::VNodeFailure {
                name: "C".into(),
                key: c
            }),
        1
    );
    // the detached vnode is still registered as it was, the others route around it
    assert_eq!(sim.swarm.vnode(c).unwrap().state, VNodeState::Stable);
    let others: Vec<Did> = sim
        .swarm
        .vnodes()
        .into_iter()
        .filter(|v| v.host != host)
        .map(|v| v.did())
        .collect();
    for did in others.iter() {
        let vnode = sim.swarm.vnode(*did).unwrap();
        assert_ne!(vnode.successor(), c);
        assert_ne!(vnode.predecessor(), Some(c));
    }

    sim.at(15_000, host, Command::ReAttach);
    sim.swarm.run_until(25_000);
    let events = sim.drain_events();
    assert_eq!(events[0], RingEvent::HostReattached {
        host,
        success: true
    });
    assert!(events.contains(&RingEvent::JoinSuccess {
        name: "C".into(),
        key: c
    }));
    assert_eq!(sim.swarm.vnodes().len(), 5);
    assert_ring_ordered(&sim.swarm);
}

#[test]
fn test_reattach_attached_host_fails() {
    let mut sim = stable_ring();
    sim.at(10_000, 3, Command::ReAttach);
    sim.swarm.run_until(10_000);
    assert_eq!(sim.drain_events(), vec![RingEvent::HostReattached {
        host: 3,
        success: false
    }]);
}

#[test]
fn test_crash_then_restart_recreates_vnodes() {
    let mut sim = stable_ring();
    let host = sim.swarm.vnode_by_name("D").unwrap().host;

    sim.at(10_000, host, Command::Crash);
    // a crashed host cannot run anything
    sim.at(10_100, host, Command::InsertVNode("F".into()));
    sim.swarm.run_until(15_000);
    assert!(sim.swarm.vnode_by_name("D").is_none());
    assert!(sim.swarm.vnode_by_name("F").is_none());
    assert_eq!(sim.swarm.vnodes().len(), 4);
    assert_ring_ordered(&sim.swarm);

    sim.at(15_000, host, Command::Restart);
    sim.swarm.run_until(25_000);
    let events = sim.drain_events();
    assert!(events.contains(&RingEvent::HostCrashed { host }));
    assert!(events.contains(&RingEvent::HostRestarted { host }));
    assert_eq!(
        count(&events, |e| matches!(e, RingEvent::JoinSuccess { name, .. } if name == "D")),
        1
    );
    assert_eq!(sim.swarm.vnode_by_name("D").unwrap().host, host);
    assert_ring_ordered(&sim.swarm);
}

#[test]
fn test_remove_vnode_keeps_objects() {
    let mut sim = stable_ring();
    for (i, name) in ["foo", "bar", "baz", "qux"].iter().enumerate() {
        sim.at(10_000 + i as u64, 0, Command::Insert(name.to_string(), name.to_string()));
    }
    sim.swarm.run_until(11_000);

    let key = Did::from_name("foo");
    let owner = sim.owner_of(key);
    let host = sim.swarm.vnode_by_name(&owner).unwrap().host;
    sim.drain();
    sim.at(11_000, host, Command::RemoveVNode(owner.clone()));
    sim.swarm.run_until(15_000);

    assert!(sim.swarm.vnode_by_name(&owner).is_none());
    assert_eq!(sim.swarm.vnodes().len(), 4);
    assert_ring_ordered(&sim.swarm);

    let events = sim.drain_events();
    // a graceful leave is not a failure
    assert_eq!(
        count(&events, |e| matches!(e, RingEvent::VNodeFailure { .. })),
        0
    );
    assert!(events.iter().any(|e| matches!(
        e,
        RingEvent::VNodeKeyOwnership { old_predecessor_key, .. }
            if *old_predecessor_key == Some(Did::from_name(&owner))
    )));

    let next_host = sim.swarm.vnode_by_name(&sim.owner_of(key)).unwrap().host;
    for name in ["foo", "bar", "baz", "qux"] {
        sim.at(15_000, next_host, Command::Retrieve(name.to_string()));
    }
    sim.swarm.run_until(16_000);
    let events = sim.drain_events();
    for name in ["foo", "bar", "baz", "qux"] {
        assert!(events.contains(&RingEvent::RetrieveSuccess {
            key: Did::from_name(name),
            value: name.as_bytes().to_vec(),
        }));
    }
}
