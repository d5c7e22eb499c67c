use crate::dhash::StoredObject;
use crate::dht::Did;
use crate::dht::PeerRingAction;
use crate::dht::VNodeState;
use crate::error::Error;
use crate::error::Result;
use crate::message::types::FindSuccessorFailed;
use crate::message::types::FindSuccessorReport;
use crate::message::types::FindSuccessorSend;
use crate::message::types::Message;
use crate::message::types::Replicate;
use crate::message::FindSuccessorReportHandler;
use crate::message::FindSuccessorThen;
use crate::message::HandleMsg;
use crate::message::MessagePayload;
use crate::message::TransferKeysSend;
use crate::swarm::OperationKind;
use crate::swarm::RingEvent;
use crate::swarm::Swarm;

impl Swarm {
    /// Route `msg` one step further from vnode `at`.
    pub(crate) fn handle_find_successor(&mut self, at: Did, mut msg: FindSuccessorSend) -> Result<()> {
        if msg.hops > self.config.max_hops {
            self.fail_route(at, &msg);
            return Ok(());
        }
        let vnode = self
            .vnodes
            .get(&at)
            .ok_or_else(|| Error::VNodeNotFound(at.to_string()))?;

        // a leaving vnode already handed its keys to the successor
        if vnode.state == VNodeState::Leaving && !vnode.ring.is_alone() {
            let successor = vnode.successor();
            msg.hops += 1;
            msg.final_hop = true;
            self.send(at, successor, Message::FindSuccessorSend(msg));
            return Ok(());
        }

        match vnode.ring.find_successor(msg.key, msg.final_hop) {
            PeerRingAction::Owner => self.serve_as_owner(at, msg),
            PeerRingAction::SuccessorOwns(next) => {
                if msg.then == FindSuccessorThen::Report {
                    self.send(
                        at,
                        msg.origin,
                        Message::FindSuccessorReport(FindSuccessorReport {
                            txn: msg.txn,
                            key: msg.key,
                            owner: next,
                            handler: FindSuccessorReportHandler::Successor,
                        }),
                    );
                } else {
                    msg.hops += 1;
                    msg.final_hop = true;
                    self.send(at, next, Message::FindSuccessorSend(msg));
                }
                Ok(())
            }
            PeerRingAction::Forward(next) => {
                tracing::debug!("{} forwards {} to {}", at, msg.key, next);
                msg.hops += 1;
                msg.final_hop = false;
                self.send(at, next, Message::FindSuccessorSend(msg));
                Ok(())
            }
            PeerRingAction::Backward(pred) => {
                msg.hops += 1;
                msg.final_hop = true;
                self.send(at, pred, Message::FindSuccessorSend(msg));
                Ok(())
            }
        }
    }

    fn serve_as_owner(&mut self, at: Did, msg: FindSuccessorSend) -> Result<()> {
        let vnode = self
            .vnodes
            .get(&at)
            .ok_or_else(|| Error::VNodeNotFound(at.to_string()))?;
        let successor = vnode.successor();
        let (handler, replica) = match msg.then {
            FindSuccessorThen::Report | FindSuccessorThen::Join => {
                (FindSuccessorReportHandler::Successor, None)
            }
            FindSuccessorThen::Store(value) => {
                let object = StoredObject::new(msg.key, value.clone());
                vnode.store.put(&object)?;
                tracing::info!("{} stores {}", at, msg.key);
                (FindSuccessorReportHandler::Stored(value), Some(object))
            }
            FindSuccessorThen::Fetch => {
                let value = vnode.store.get(msg.key)?.map(|o| o.value);
                (FindSuccessorReportHandler::Fetched(value), None)
            }
        };

        if let Some(object) = replica {
            if successor != at {
                self.send(at, successor, Message::Replicate(Replicate { object }));
            }
        }
        self.send(
            at,
            msg.origin,
            Message::FindSuccessorReport(FindSuccessorReport {
                txn: msg.txn,
                key: msg.key,
                owner: at,
                handler,
            }),
        );
        Ok(())
    }

    /// The owner of a joining vnode's key is known, ask it for the keys.
    fn join_located(&mut self, txn: u64, did: Did, owner: Did) -> Result<()> {
        if owner == did {
            tracing::debug!("join of {} routed back to itself", did);
            return self.retry_join(txn, false);
        }
        self.send(
            did,
            owner,
            Message::TransferKeysSend(TransferKeysSend { txn }),
        );
        Ok(())
    }
}

impl HandleMsg<FindSuccessorSend> for Swarm {
    fn handle(&mut self, ctx: &MessagePayload, msg: &FindSuccessorSend) -> Result<()> {
        self.handle_find_successor(ctx.to, msg.clone())
    }
}

impl HandleMsg<FindSuccessorReport> for Swarm {
    fn handle(&mut self, ctx: &MessagePayload, msg: &FindSuccessorReport) -> Result<()> {
        let Some(op) = self.pending.get(&msg.txn) else {
            tracing::debug!("late report {} at {}", msg.txn, ctx.to);
            return Ok(());
        };
        if let OperationKind::Join { .. } = op.kind {
            let origin = op.origin;
            return self.join_located(msg.txn, origin, msg.owner);
        }
        let Some(op) = self.pending.remove(&msg.txn) else {
            return Ok(());
        };

        match op.kind {
            OperationKind::Lookup => match self.endpoint(msg.owner) {
                Some((address, port)) => self.emit(RingEvent::LookupSuccess {
                    key: msg.key,
                    address,
                    port,
                }),
                None => self.emit(RingEvent::LookupFailure { key: msg.key }),
            },
            OperationKind::Insert(value) => {
                self.emit(RingEvent::InsertSuccess { key: msg.key, value })
            }
            OperationKind::Retrieve => match &msg.handler {
                FindSuccessorReportHandler::Fetched(Some(value)) => {
                    self.emit(RingEvent::RetrieveSuccess {
                        key: msg.key,
                        value: value.clone(),
                    })
                }
                _ => {
                    tracing::debug!("retrieve at {}: {}", msg.owner, Error::KeyAbsent(msg.key));
                    self.emit(RingEvent::RetrieveFailure { key: msg.key })
                }
            },
            OperationKind::FixFinger(index) => {
                if let Some(vnode) = self.vnodes.get_mut(&op.origin) {
                    vnode.ring.finger.set(index, msg.owner);
                }
            }
            OperationKind::Join { .. } => {}
        }
        Ok(())
    }
}

impl HandleMsg<FindSuccessorFailed> for Swarm {
    fn handle(&mut self, _ctx: &MessagePayload, msg: &FindSuccessorFailed) -> Result<()> {
        let Some(op) = self.pending.get(&msg.txn) else {
            return Ok(());
        };
        if let OperationKind::Join { .. } = op.kind {
            return self.retry_join(msg.txn, true);
        }
        if let Some(op) = self.pending.remove(&msg.txn) {
            self.fail_operation(op);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use crate::dht::Did;
    use crate::swarm::Command;
    use crate::swarm::RingEvent;
    use crate::swarm::SwarmBuilder;

    #[test]
    fn test_lookup_own_key_resolves_locally() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut swarm = SwarmBuilder::new(tx).hosts(4).bootstrap(1).build().unwrap();
        swarm.schedule(0, 1, Command::InsertVNode("A".into()));
        swarm.schedule(100, 1, Command::Lookup("A".into()));
        swarm.run_until(100);
        // not resolved before the reply hop
        while let Ok(record) = rx.try_recv() {
            assert!(!matches!(record.event, RingEvent::LookupSuccess { .. }));
        }
        swarm.run_until(102);
        let record = rx.try_recv().unwrap();
        assert_eq!(record.at_ms, 102);
        assert_eq!(record.event, RingEvent::LookupSuccess {
            key: Did::from_name("A"),
            address: "10.1.1.2".parse().unwrap(),
            port: 2000,
        });
    }

    #[test]
    fn test_operation_without_ring_fails() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut swarm = SwarmBuilder::new(tx).hosts(2).bootstrap(0).build().unwrap();
        swarm.schedule(5, 0, Command::Retrieve("foo".into()));
        swarm.run_until(5);
        let record = rx.try_recv().unwrap();
        assert_eq!(record.at_ms, 5);
        assert_eq!(record.event, RingEvent::RetrieveFailure {
            key: Did::from_name("foo")
        });
    }
}
