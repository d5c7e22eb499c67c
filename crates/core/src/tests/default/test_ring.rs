use super::*;

const NAMES: [&str; 5] = ["A", "B", "C", "D", "E"];

#[test]
fn test_joins_converge_to_ordered_ring() {
    let mut sim = Sim::new(8);
    let ordered = ring_order(&NAMES);
    let ordered: Vec<&str> = ordered.iter().map(|s| s.as_str()).collect();
    sim.join_all(&ordered, 0);
    sim.swarm.run_until(10_000);

    assert_eq!(sim.swarm.vnodes().len(), 5);
    assert_ring_ordered(&sim.swarm);

    let events = sim.drain_events();
    let joined: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            RingEvent::JoinSuccess { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(joined, ring_order(&NAMES));
    assert_eq!(
        count(&events, |e| matches!(e, RingEvent::VNodeFailure { .. })),
        0
    );
}

#[test]
fn test_simultaneous_joins_all_succeed() {
    let mut sim = Sim::new(6);
    sim.at(0, 0, Command::InsertVNode("seed".into()));
    // ten vnodes in the same millisecond, two per host
    let names: Vec<String> = (0..10).map(|i| format!("v{i}")).collect();
    for (i, name) in names.iter().enumerate() {
        sim.at(1000, 1 + (i / 2) as u16, Command::InsertVNode(name.clone()));
    }
    sim.swarm.run_until(40_000);

    let events = sim.drain_events();
    assert_eq!(
        count(&events, |e| matches!(e, RingEvent::VNodeFailure { .. })),
        0
    );
    for name in names.iter() {
        assert!(
            events.contains(&RingEvent::JoinSuccess {
                name: name.clone(),
                key: Did::from_name(name),
            }),
            "{} never joined",
            name
        );
    }
    assert_eq!(sim.swarm.vnodes().len(), 11);
    assert_ring_ordered(&sim.swarm);
}

#[test]
fn test_every_key_has_one_owner() {
    let mut sim = Sim::new(8);
    sim.join_all(&NAMES, 0);
    sim.swarm.run_until(10_000);
    assert_ring_ordered(&sim.swarm);

    for name in ["foo", "bar", "baz", "missing", "A"] {
        sim.owner_of(Did::from_name(name));
    }
    // a vnode owns its own id
    assert_eq!(sim.owner_of(Did::from_name("C")), "C");
}

#[test]
fn test_lookup_reports_owner_address() {
    let mut sim = Sim::new(8);
    sim.join_all(&NAMES, 0);
    sim.swarm.run_until(10_000);
    sim.drain();

    let key = Did::from_name("foo");
    let owner = sim.owner_of(key);
    let host = sim.swarm.vnode_by_name(&owner).unwrap().host;
    let (address, port) = sim.swarm.network().endpoint(host).unwrap();

    // host 7 runs no vnode, the lookup enters through the bootstrap host
    sim.at(10_000, 7, Command::Lookup("foo".into()));
    sim.swarm.run_until(12_000);
    let events = sim.drain_events();
    assert!(events.contains(&RingEvent::LookupSuccess { key, address, port }));
}

#[test]
fn test_trace_ring_walks_successors() {
    let mut sim = Sim::new(8);
    sim.join_all(&NAMES, 0);
    sim.swarm.run_until(10_000);
    sim.drain();

    let start = sim.swarm.vnode_by_name("A").unwrap().host;
    sim.at(10_000, start, Command::TraceRing("A".into()));
    sim.swarm.run_until(10_100);

    let traced: Vec<String> = sim
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            RingEvent::TraceRing { name, .. } => Some(name),
            _ => None,
        })
        .collect();
    let mut expected = ring_order(&NAMES);
    let pos = expected.iter().position(|n| n == "A").unwrap();
    expected.rotate_left(pos);
    assert_eq!(traced, expected);
}

#[test]
fn test_fix_finger_is_idempotent() {
    // only the commands below refresh fingers
    let mut sim = Sim::with_config(8, RingConfig {
        fix_finger_interval_ms: 60_000,
        ..Default::default()
    });
    sim.join_all(&NAMES, 0);
    sim.swarm.run_until(10_000);

    let host = sim.swarm.vnode_by_name("B").unwrap().host;
    sim.at(10_000, host, Command::FixFinger("B".into()));
    sim.swarm.run_until(11_000);
    let fingers = sim.swarm.vnode_by_name("B").unwrap().ring.finger.clone();
    assert!(!fingers.is_empty());

    sim.at(11_000, host, Command::FixFinger("B".into()));
    sim.swarm.run_until(12_000);
    assert_eq!(sim.swarm.vnode_by_name("B").unwrap().ring.finger, fingers);
    assert_eq!(sim.swarm.pending_operations(), 0);
}

#[test]
fn test_fix_finger_points_to_owners() {
    let mut sim = Sim::new(8);
    sim.join_all(&NAMES, 0);
    sim.swarm.run_until(10_000);

    let host = sim.swarm.vnode_by_name("D").unwrap().host;
    sim.at(10_000, host, Command::FixFinger("D".into()));
    sim.swarm.run_until(11_000);

    let vnode = sim.swarm.vnode_by_name("D").unwrap();
    for i in [0, 80, 159] {
        let owner = Did::from_name(&sim.owner_of(vnode.ring.finger.start(i)));
        if owner == vnode.did() {
            assert_eq!(vnode.ring.finger.get(i), None);
        } else {
            assert_eq!(vnode.ring.finger.get(i), Some(owner));
        }
    }
}

#[test]
fn test_dump_commands_check_host() {
    let mut sim = Sim::new(8);
    sim.join_all(&NAMES, 0);
    sim.swarm.run_until(10_000);
    sim.drain();

    let host = sim.swarm.vnode_by_name("A").unwrap().host;
    let other = (host + 1) % 8;
    sim.at(10_000, other, Command::DumpVNodeInfo("A".into()));
    sim.at(10_000, host, Command::DumpVNodeInfo("A".into()));
    sim.at(10_000, host, Command::DumpDHashInfo);
    sim.swarm.run_until(10_000);

    let events = sim.drain_events();
    assert_eq!(events.len(), 2);
    match &events[0] {
        RingEvent::VNodeInfo(info) => {
            assert_eq!(info.name, "A");
            assert_eq!(info.host, host);
            assert_eq!(info.successors.len(), 3);
        }
        e => panic!("unexpected {e:?}"),
    }
    match &events[1] {
        RingEvent::DHashInfo(info) => {
            assert_eq!(info.host, host);
            assert_eq!(info.vnodes.len(), 1);
        }
        e => panic!("unexpected {e:?}"),
    }
}

#[test]
fn test_duplicate_vnode_is_dropped() {
    let mut sim = Sim::new(4);
    sim.at(0, 0, Command::InsertVNode("A".into()));
    sim.at(100, 1, Command::InsertVNode("A".into()));
    sim.swarm.run_until(1_000);
    assert_eq!(sim.swarm.vnodes().len(), 1);
    assert_eq!(sim.swarm.vnode_by_name("A").unwrap().host, 0);
    let events = sim.drain_events();
    assert_eq!(
        count(&events, |e| matches!(e, RingEvent::JoinSuccess { .. })),
        1
    );
}
