use crate::dht::Did;
use crate::dht::TopoInfo;
use crate::dht::VNodeState;
use crate::error::Result;
use crate::message::types::CheckPredecessor;
use crate::message::types::HandoffObjects;
use crate::message::types::Message;
use crate::message::types::NotifyPredecessorSend;
use crate::message::types::QueryForTopoInfoReport;
use crate::message::types::QueryForTopoInfoSend;
use crate::message::types::SyncReplicas;
use crate::message::HandleMsg;
use crate::message::MessagePayload;
use crate::swarm::Swarm;
use crate::swarm::Task;

impl Swarm {
    /// Periodic stabilization of one vnode.
    pub(crate) fn stabilize(&mut self, did: Did, incarnation: u64) -> Result<()> {
        let interval = self.config.stabilize_interval_ms;
        let Some(vnode) = self.vnodes.get_mut(&did) else {
            return Ok(());
        };
        if vnode.incarnation != incarnation {
            return Ok(());
        }
        self.sched
            .schedule_after(interval, Task::Stabilize(did, incarnation));
        if vnode.state != VNodeState::Stable {
            return Ok(());
        }

        if vnode.ring.is_alone() {
            match vnode.ring.predecessor {
                Some(pred) if pred != did => vnode.ring.join(pred),
                Some(_) => return Ok(()),
                None => {
                    // every other vnode is gone
                    vnode.ring.bootstrap();
                    vnode.store.promote_backup()?;
                    let old = vnode.lost_predecessor.take();
                    tracing::info!("{} is alone on the ring", did);
                    self.emit_ownership(did, old);
                    return Ok(());
                }
            }
        }

        let successor = vnode.successor();
        let predecessor = vnode.predecessor();
        let objects = vnode.store.objects()?;
        self.send(
            did,
            successor,
            Message::QueryForTopoInfoSend(QueryForTopoInfoSend),
        );
        self.send(
            did,
            successor,
            Message::SyncReplicas(SyncReplicas { objects }),
        );
        if let Some(pred) = predecessor.filter(|p| *p != did) {
            self.send(did, pred, Message::CheckPredecessor(CheckPredecessor));
        }
        Ok(())
    }

    /// Periodic refresh of the next finger of one vnode.
    pub(crate) fn fix_fingers(&mut self, did: Did, incarnation: u64) -> Result<()> {
        let interval = self.config.fix_finger_interval_ms;
        let Some(vnode) = self.vnodes.get_mut(&did) else {
            return Ok(());
        };
        if vnode.incarnation != incarnation {
            return Ok(());
        }
        self.sched
            .schedule_after(interval, Task::FixFingers(did, incarnation));
        if vnode.state != VNodeState::Stable {
            return Ok(());
        }
        let index = vnode.ring.finger.next_fix_index();
        let host = vnode.host;
        self.fix_finger(did, host, index)
    }
}

impl HandleMsg<QueryForTopoInfoSend> for Swarm {
    fn handle(&mut self, ctx: &MessagePayload, _msg: &QueryForTopoInfoSend) -> Result<()> {
        let info = TopoInfo::from(&self.vnode_mut(ctx.to)?.ring);
        self.send(
            ctx.to,
            ctx.from,
            Message::QueryForTopoInfoReport(QueryForTopoInfoReport { info }),
        );
        Ok(())
    }
}

impl HandleMsg<QueryForTopoInfoReport> for Swarm {
    fn handle(&mut self, ctx: &MessagePayload, msg: &QueryForTopoInfoReport) -> Result<()> {
        let did = ctx.to;
        let vnode = self.vnode_mut(did)?;
        if vnode.state != VNodeState::Stable {
            return Ok(());
        }
        let successor = vnode.ring.stabilize(ctx.from, &msg.info);
        if successor != did {
            self.send(
                did,
                successor,
                Message::NotifyPredecessorSend(NotifyPredecessorSend { did }),
            );
        }
        Ok(())
    }
}

impl HandleMsg<NotifyPredecessorSend> for Swarm {
    fn handle(&mut self, ctx: &MessagePayload, msg: &NotifyPredecessorSend) -> Result<()> {
        let did = ctx.to;
        let handoff = self.next_id();
        let vnode = self.vnode_mut(did)?;
        if vnode.state != VNodeState::Stable {
            return Ok(());
        }
        let Some(old) = vnode.ring.notify(msg.did) else {
            return Ok(());
        };
        let lost = vnode.lost_predecessor.take();
        let old = old.or(lost);
        tracing::info!("{} accepts {} as predecessor", did, msg.did);

        let objects = vnode.store.outside(msg.did, did)?;
        if !objects.is_empty() {
            vnode
                .handoffs
                .insert(handoff, objects.iter().map(|o| o.key).collect());
        }
        self.emit_ownership(did, old);
        if !objects.is_empty() {
            self.send(
                did,
                msg.did,
                Message::HandoffObjects(HandoffObjects { handoff, objects }),
            );
        }
        Ok(())
    }
}

impl HandleMsg<CheckPredecessor> for Swarm {
    fn handle(&mut self, _ctx: &MessagePayload, _msg: &CheckPredecessor) -> Result<()> {
        Ok(())
    }
}
