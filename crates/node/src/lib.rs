//! Ringsim node: the `chord-run` harness.
//! --------------
//! Commands come from a timestamped script and from an interactive prompt. Both end up in one
//! [Swarm](ringsim_core::swarm::Swarm), driven by the [Processor](crate::processor::Processor), which
//! prints every [RingEvent](ringsim_core::swarm::RingEvent) with the simulated time it happened at.
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod processor;
pub mod script;
