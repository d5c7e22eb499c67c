//! Ringsim: a Chord ring with a DHash content store, running inside a deterministic simulation.
//! --------------
//! - [Did](crate::dht::Did) is the 160 bits identifier space, derived from names with SHA-1.
//! - [PeerRing](crate::dht::PeerRing) holds the Chord state of one virtual node: successor list, predecessor and finger table.
//! - [VirtualNode](crate::dht::VirtualNode) binds a ring participant to a physical host and carries its [DHash](crate::dhash::DHash) store.
//! - [Swarm](crate::swarm::Swarm) is the event loop: it owns every virtual node, the simulated LAN and the [Scheduler](crate::sched::Scheduler).
//!
//! # Simulation
//!
//! Nothing in this crate sleeps or spawns. Every message between virtual nodes is a scheduled task
//! delivered after a fixed hop latency. A message whose destination is crashed, removed or detached
//! bounces back to its sender as an undeliverable notice after the request timeout, which is how
//! failures are discovered.
//!
//! # Join
//!
//! 1. The new vnode `K` routes a lookup for its own id through an entry point and learns its successor `S`.
//! 2. `K` asks `S` for the keys in `(S.predecessor, K]`. `S` accepts `K` as predecessor and answers with copies.
//! 3. `K` installs the copies, becomes stable and acks. Only then `S` drops the objects from its primary store.
//!
//! # Events
//!
//! Every observable outcome is sent as a [RingEvent](crate::swarm::RingEvent) on one channel, stamped
//! with the simulated time it happened at.
pub mod consts;
pub mod dhash;
pub mod dht;
pub mod error;
pub mod inspect;
pub mod message;
pub mod sched;
pub mod storage;
pub mod swarm;
#[cfg(test)]
mod tests;
