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
fn test_insert_then_retrieve() {
    let mut sim = stable_ring();
    let key = Did::from_name("foo");
    sim.at(10_000, 2, Command::Insert("foo".into(), "bar".into()));
    sim.at(10_500, 6, Command::Retrieve("foo".into()));
    sim.swarm.run_until(11_000);

    let events = sim.drain_events();
    let insert = events
        .iter()
        .position(|e| {
            *e == RingEvent::InsertSuccess {
                key,
                value: b"bar".to_vec(),
            }
        })
        .unwrap();
    let retrieve = events
        .iter()
        .position(|e| {
            *e == RingEvent::RetrieveSuccess {
                key,
                value: b"bar".to_vec(),
            }
        })
        .unwrap();
    assert!(insert < retrieve);

    // one served copy, one backup on the successor
    let owner = sim.owner_of(key);
    let holders: Vec<String> = sim
        .swarm
        .vnodes()
        .into_iter()
        .filter(|v| v.store.get(key).unwrap().is_some())
        .map(|v| v.name.clone())
        .collect();
    assert_eq!(holders, vec![owner]);
}

#[test]
fn test_insert_replaces_value() {
    let mut sim = stable_ring();
    sim.at(10_000, 1, Command::Insert("foo".into(), "bar".into()));
    sim.at(10_100, 3, Command::Insert("foo".into(), "baz".into()));
    sim.at(10_200, 5, Command::Retrieve("foo".into()));
    sim.swarm.run_until(11_000);

    let events = sim.drain_events();
    assert!(events.contains(&RingEvent::RetrieveSuccess {
        key: Did::from_name("foo"),
        value: b"baz".to_vec(),
    }));
}

#[test]
fn test_retrieve_missing_fails() {
    let mut sim = stable_ring();
    sim.at(10_000, 4, Command::Retrieve("missing".into()));
    sim.swarm.run_until(11_000);
    let events = sim.drain_events();
    assert_eq!(events, vec![RingEvent::RetrieveFailure {
        key: Did::from_name("missing")
    }]);
}

#[test]
fn test_objects_move_to_joining_owner() {
    let mut sim = Sim::new(8);
    sim.at(0, 0, Command::InsertVNode("A".into()));
    for (i, name) in ["foo", "bar", "baz", "qux", "quux"].iter().enumerate() {
        sim.at(100 + i as u64, 0, Command::Insert(name.to_string(), "v".into()));
    }
    sim.join_all(&["B", "C", "D"], 1_000);
    // join_all puts B on host 0 too, only names matter here
    sim.swarm.run_until(12_000);
    assert_ring_ordered(&sim.swarm);

    for name in ["foo", "bar", "baz", "qux", "quux"] {
        let key = Did::from_name(name);
        let owner = sim.owner_of(key);
        let vnode = sim.swarm.vnode_by_name(&owner).unwrap();
        assert!(vnode.store.get(key).unwrap().is_some(), "{name} not on {owner}");
        for other in sim.swarm.vnodes() {
            if other.name != owner {
                assert!(other.store.get(key).unwrap().is_none(), "{name} also on {}", other.name);
            }
        }
    }
}

#[test]
fn test_crashed_owner_is_replaced_by_successor() {
    let mut sim = stable_ring();
    let key = Did::from_name("foo");
    sim.at(10_000, 7, Command::Insert("foo".into(), "bar".into()));
    sim.swarm.run_until(12_000);

    let owner = sim.owner_of(key);
    let ring: Vec<Did> = sim.swarm.vnodes().iter().map(|v| v.did()).collect();
    let pos = ring.iter().position(|d| *d == Did::from_name(&owner)).unwrap();
    let (dead, pred, succ) = (
        ring[pos],
        ring[(pos + 4) % 5],
        ring[(pos + 1) % 5],
    );
    let dead_host = sim.swarm.vnode(dead).unwrap().host;
    let alive_host = sim.swarm.vnode(succ).unwrap().host;
    sim.drain();

    sim.at(12_000, dead_host, Command::Crash);
    sim.swarm.run_until(17_000);
    sim.at(17_000, alive_host, Command::Retrieve("foo".into()));
    sim.swarm.run_until(18_000);

    assert_eq!(sim.swarm.vnodes().len(), 4);
    assert_ring_ordered(&sim.swarm);
    assert_eq!(sim.owner_of(key), sim.swarm.vnode(succ).unwrap().name);

    let events = sim.drain_events();
    assert_eq!(
        count(&events, |e| matches!(e, RingEvent::VNodeFailure { key, .. } if *key == dead)),
        1
    );
    assert!(events.iter().any(|e| matches!(
        e,
        RingEvent::VNodeKeyOwnership { key, predecessor_key, old_predecessor_key, .. }
            if *key == succ && *predecessor_key == pred && *old_predecessor_key == Some(dead)
    )));
    assert!(events.contains(&RingEvent::RetrieveSuccess {
        key,
        value: b"bar".to_vec(),
    }));
}
