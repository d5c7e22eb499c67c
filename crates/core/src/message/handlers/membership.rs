use crate::dht::Did;
use crate::dht::VNodeState;
use crate::error::Result;
use crate::message::types::HandoffAck;
use crate::message::types::LeaveAck;
use crate::message::types::LeaveHandoff;
use crate::message::types::Message;
use crate::message::types::SetSuccessor;
use crate::message::types::TraceRing;
use crate::message::types::TransferKeysReject;
use crate::message::types::TransferKeysReport;
use crate::message::types::TransferKeysSend;
use crate::message::HandleMsg;
use crate::message::MessagePayload;
use crate::swarm::OperationKind;
use crate::swarm::RingEvent;
use crate::swarm::Swarm;
use crate::swarm::Task;

impl Swarm {
    /// Look up the successor of a joining vnode again, after the ring had time to settle.
    ///
    /// Only `counted` retries, the ones caused by an unreachable vnode or an exhausted route,
    /// use up `max_request_retries`. The others are bounded by the operation deadline.
    pub(crate) fn retry_join(&mut self, txn: u64, counted: bool) -> Result<()> {
        let max_attempts = self.config.max_request_retries;
        let Some(op) = self.pending.get_mut(&txn) else {
            return Ok(());
        };
        let OperationKind::Join { attempts } = &mut op.kind else {
            return Ok(());
        };
        if counted {
            *attempts += 1;
        }
        let (attempts, did, host) = (*attempts, op.origin, op.origin_host);
        if !self.vnodes.contains_key(&did) {
            self.pending.remove(&txn);
            return Ok(());
        }
        if attempts > max_attempts {
            if let Some(op) = self.pending.remove(&txn) {
                self.fail_operation(op);
            }
            return Ok(());
        }

        match self.entry_point(host, Some(did)) {
            None => {
                self.pending.remove(&txn);
                tracing::info!("no vnode left to join, {} bootstraps", did);
                self.bootstrap_vnode(did)
            }
            Some(entry) => {
                tracing::debug!("join of {} retried through {}, attempt {}", did, entry, attempts);
                let payload = MessagePayload::new(
                    did,
                    entry,
                    crate::swarm::join_lookup(txn, did),
                );
                self.sched
                    .schedule_after(self.config.stabilize_interval_ms, Task::Deliver(payload));
                Ok(())
            }
        }
    }

    /// A join gave up: the vnode is dropped and reported failed.
    pub(crate) fn join_failed(&mut self, did: Did) {
        let Some(vnode) = self.vnodes.get(&did) else {
            return;
        };
        if vnode.state != VNodeState::Joining {
            return;
        }
        let name = vnode.name.clone();
        self.vnodes.remove(&did);
        self.reported.insert(did);
        tracing::warn!("vnode {} failed to join", name);
        self.emit(RingEvent::VNodeFailure { name, key: did });
    }

    /// Remove a leaving vnode for good, after relinking its predecessor.
    pub(crate) fn finish_leave(&mut self, did: Did) -> Result<()> {
        let Some(vnode) = self.vnodes.remove(&did) else {
            return Ok(());
        };
        let successor = vnode.successor();
        if let Some(pred) = vnode.predecessor() {
            if pred != did && successor != did && pred != successor {
                self.send(
                    did,
                    pred,
                    Message::SetSuccessor(SetSuccessor {
                        leaving: did,
                        successor,
                    }),
                );
            }
        }
        vnode.store.clear()?;
        self.reported.insert(did);
        tracing::info!("vnode {} left the ring", vnode.name);
        Ok(())
    }

    /// The successor never acked a leave.
    pub(crate) fn leave_timeout(&mut self, did: Did, incarnation: u64) -> Result<()> {
        match self.vnodes.get(&did) {
            Some(vnode) if vnode.incarnation == incarnation && vnode.state == VNodeState::Leaving => {
                tracing::warn!("leave of {} was not acked, leaving anyway", vnode.name);
                self.finish_leave(did)
            }
            _ => Ok(()),
        }
    }
}

impl HandleMsg<TransferKeysSend> for Swarm {
    fn handle(&mut self, ctx: &MessagePayload, msg: &TransferKeysSend) -> Result<()> {
        let (joining, did) = (ctx.from, ctx.to);
        let handoff = self.next_id();
        let vnode = self.vnode_mut(did)?;
        let accept = vnode.state == VNodeState::Stable
            && match vnode.ring.predecessor {
                Some(pred) => joining.is_between(pred, did),
                None => true,
            };
        if !accept {
            let predecessor = vnode.ring.predecessor;
            tracing::debug!("{} rejects {} as predecessor", did, joining);
            self.send(
                did,
                joining,
                Message::TransferKeysReject(TransferKeysReject {
                    txn: msg.txn,
                    predecessor,
                }),
            );
            return Ok(());
        }

        let old = vnode.ring.predecessor.replace(joining);
        vnode.ring.join(joining);
        let objects = vnode.store.outside(joining, did)?;
        vnode
            .handoffs
            .insert(handoff, objects.iter().map(|o| o.key).collect());
        let successors = vnode.ring.successors().list();
        tracing::info!("{} takes {} as predecessor, hands {} objects", did, joining, objects.len());

        self.emit_ownership(did, old);
        self.send(
            did,
            joining,
            Message::TransferKeysReport(TransferKeysReport {
                txn: msg.txn,
                handoff,
                predecessor: old,
                successors,
                objects,
            }),
        );
        Ok(())
    }
}

impl HandleMsg<TransferKeysReport> for Swarm {
    fn handle(&mut self, ctx: &MessagePayload, msg: &TransferKeysReport) -> Result<()> {
        let (did, successor) = (ctx.to, ctx.from);
        if self.pending.remove(&msg.txn).is_none() {
            return Ok(());
        }
        let vnode = self.vnode_mut(did)?;
        if vnode.state != VNodeState::Joining {
            return Ok(());
        }

        vnode.ring.predecessor = msg.predecessor.filter(|p| *p != did);
        if let Some(pred) = vnode.ring.predecessor {
            vnode.ring.finger.join(pred);
        }
        vnode.ring.join(successor);
        let tail: Vec<Did> = msg
            .successors
            .iter()
            .copied()
            .filter(|s| *s != did)
            .collect();
        vnode.ring.successor_seq.extend(&tail);
        for s in tail.iter() {
            vnode.ring.finger.join(*s);
        }
        vnode.store.install(&msg.objects)?;
        vnode.state = VNodeState::Stable;
        let name = vnode.name.clone();

        self.reported.remove(&did);
        self.emit(RingEvent::JoinSuccess { name, key: did });
        self.emit_ownership(did, None);
        self.send(
            did,
            successor,
            Message::HandoffAck(HandoffAck {
                handoff: msg.handoff,
            }),
        );
        self.start_timers(did);
        Ok(())
    }
}

impl HandleMsg<TransferKeysReject> for Swarm {
    fn handle(&mut self, ctx: &MessagePayload, msg: &TransferKeysReject) -> Result<()> {
        let (did, rejecter) = (ctx.to, ctx.from);
        match self.pending.get(&msg.txn).map(|op| &op.kind) {
            Some(OperationKind::Join { .. }) => {}
            _ => return Ok(()),
        }
        match msg.predecessor {
            // an earlier request was taken, its report is on the way
            Some(pred) if pred == did => Ok(()),
            // another vnode joined in between, it is the one to ask
            Some(pred) if pred.is_between(did, rejecter) => {
                tracing::debug!("join of {} moves on from {} to {}", did, rejecter, pred);
                self.send(
                    did,
                    pred,
                    Message::TransferKeysSend(TransferKeysSend { txn: msg.txn }),
                );
                Ok(())
            }
            _ => self.retry_join(msg.txn, false),
        }
    }
}

impl HandleMsg<LeaveHandoff> for Swarm {
    fn handle(&mut self, ctx: &MessagePayload, msg: &LeaveHandoff) -> Result<()> {
        let (leaving, did) = (ctx.from, ctx.to);
        let vnode = self.vnode_mut(did)?;
        vnode.store.install(&msg.objects)?;

        let takes_over =
            vnode.ring.predecessor.is_none() || vnode.ring.predecessor == Some(leaving);
        if takes_over {
            vnode.ring.remove(leaving);
            match msg.predecessor.filter(|p| *p != leaving) {
                Some(pred) if pred == did => vnode.ring.bootstrap(),
                Some(pred) => {
                    vnode.ring.predecessor = Some(pred);
                    vnode.ring.finger.join(pred);
                }
                None => vnode.ring.predecessor = None,
            }
            tracing::info!("{} takes over the keys of {}", did, leaving);
            self.emit_ownership(did, Some(leaving));
        }
        self.send(
            did,
            leaving,
            Message::LeaveAck(LeaveAck {
                handoff: msg.handoff,
            }),
        );
        Ok(())
    }
}

impl HandleMsg<LeaveAck> for Swarm {
    fn handle(&mut self, ctx: &MessagePayload, _msg: &LeaveAck) -> Result<()> {
        match self.vnode(ctx.to).map(|v| v.state) {
            Some(VNodeState::Leaving) => self.finish_leave(ctx.to),
            _ => Ok(()),
        }
    }
}

impl HandleMsg<SetSuccessor> for Swarm {
    fn handle(&mut self, ctx: &MessagePayload, msg: &SetSuccessor) -> Result<()> {
        let vnode = self.vnode_mut(ctx.to)?;
        vnode.ring.remove(msg.leaving);
        vnode.ring.join(msg.successor);
        Ok(())
    }
}

impl HandleMsg<TraceRing> for Swarm {
    fn handle(&mut self, ctx: &MessagePayload, msg: &TraceRing) -> Result<()> {
        let did = ctx.to;
        if did == msg.origin {
            return Ok(());
        }
        let limit = (self.config.max_hops as usize).max(self.vnodes.len());
        if msg.hops as usize > limit {
            tracing::warn!("trace from {} stopped after {} hops", msg.origin, msg.hops);
            return Ok(());
        }
        let name = self.name_of(did);
        self.emit(RingEvent::TraceRing { name, key: did });
        self.continue_trace(did, TraceRing {
            origin: msg.origin,
            hops: msg.hops + 1,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use crate::dhash::StoredObject;
    use crate::dht::Did;
    use crate::swarm::Command;
    use crate::swarm::RingEvent;
    use crate::swarm::SwarmBuilder;

    #[test]
    fn test_leave_hands_objects_to_successor() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut swarm = SwarmBuilder::new(tx).hosts(2).bootstrap(0).build().unwrap();
        swarm.schedule(0, 0, Command::InsertVNode("A".into()));
        swarm.schedule(10, 1, Command::InsertVNode("B".into()));
        swarm.run_until(2000);

        let (a, b) = (Did::from_name("A"), Did::from_name("B"));
        let object = StoredObject::new(Did::from_name("foo"), b"bar".to_vec());
        swarm.vnode(b).unwrap().store.put(&object).unwrap();
        swarm.schedule(2000, 1, Command::RemoveVNode("B".into()));
        swarm.run_until(4000);

        assert!(swarm.vnode(b).is_none());
        let survivor = swarm.vnode(a).unwrap();
        assert!(survivor.ring.is_alone());
        assert_eq!(survivor.predecessor(), Some(a));
        assert_eq!(survivor.store.get(object.key).unwrap(), Some(object));

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|r| r.event)
            .collect();
        assert!(events.contains(&RingEvent::VNodeKeyOwnership {
            name: "A".into(),
            key: a,
            predecessor_key: a,
            old_predecessor_key: Some(b),
            predecessor_address: "10.1.1.1".parse().unwrap(),
            predecessor_port: 2000,
        }));
        assert!(!events
            .iter()
            .any(|e| matches!(e, RingEvent::VNodeFailure { .. })));
    }

    #[test]
    fn test_join_bootstraps_when_entry_is_gone() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut swarm = SwarmBuilder::new(tx).hosts(2).bootstrap(0).build().unwrap();
        swarm.schedule(0, 0, Command::InsertVNode("A".into()));
        swarm.schedule(10, 1, Command::InsertVNode("B".into()));
        // the entry point goes away while the lookup is in flight
        swarm.schedule(11, 0, Command::Crash);
        swarm.run_until(5000);

        let b = Did::from_name("B");
        let vnode = swarm.vnode(b).unwrap();
        assert!(vnode.ring.is_alone());
        assert_eq!(vnode.predecessor(), Some(b));
        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|r| r.event)
            .collect();
        assert!(events.contains(&RingEvent::JoinSuccess {
            name: "B".into(),
            key: b
        }));
    }
}
