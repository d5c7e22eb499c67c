use crate::error::Result;
use crate::message::types::HandoffAck;
use crate::message::types::HandoffObjects;
use crate::message::types::Message;
use crate::message::types::Replicate;
use crate::message::types::SyncReplicas;
use crate::message::HandleMsg;
use crate::message::MessagePayload;
use crate::swarm::Swarm;

impl HandleMsg<SyncReplicas> for Swarm {
    fn handle(&mut self, ctx: &MessagePayload, msg: &SyncReplicas) -> Result<()> {
        let vnode = self.vnode_mut(ctx.to)?;
        // only the predecessor's store is backed up
        if vnode.predecessor() != Some(ctx.from) {
            return Ok(());
        }
        vnode.store.replace_backup(&msg.objects)
    }
}

impl HandleMsg<Replicate> for Swarm {
    fn handle(&mut self, ctx: &MessagePayload, msg: &Replicate) -> Result<()> {
        let vnode = self.vnode_mut(ctx.to)?;
        if vnode.predecessor() != Some(ctx.from) {
            return Ok(());
        }
        vnode.store.replicate(&msg.object)
    }
}

impl HandleMsg<HandoffObjects> for Swarm {
    fn handle(&mut self, ctx: &MessagePayload, msg: &HandoffObjects) -> Result<()> {
        self.vnode_mut(ctx.to)?.store.install(&msg.objects)?;
        tracing::debug!("{} took {} objects from {}", ctx.to, msg.objects.len(), ctx.from);
        self.send(
            ctx.to,
            ctx.from,
            Message::HandoffAck(HandoffAck {
                handoff: msg.handoff,
            }),
        );
        Ok(())
    }
}

impl HandleMsg<HandoffAck> for Swarm {
    fn handle(&mut self, ctx: &MessagePayload, msg: &HandoffAck) -> Result<()> {
        let vnode = self.vnode_mut(ctx.to)?;
        if let Some(keys) = vnode.handoffs.remove(&msg.handoff) {
            vnode.store.demote(&keys)?;
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
    fn test_insert_is_replicated_on_successor() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut swarm = SwarmBuilder::new(tx).hosts(3).bootstrap(0).build().unwrap();
        swarm.schedule(0, 0, Command::InsertVNode("A".into()));
        swarm.schedule(10, 1, Command::InsertVNode("B".into()));
        swarm.schedule(2000, 2, Command::Insert("foo".into(), "bar".into()));
        swarm.run_until(2500);

        let key = Did::from_name("foo");
        let (owner, other) = {
            let a = swarm.vnode_by_name("A").unwrap();
            let b = swarm.vnode_by_name("B").unwrap();
            if a.contains(key) {
                (a, b)
            } else {
                (b, a)
            }
        };
        assert_eq!(owner.store.get(key).unwrap().unwrap().value, b"bar".to_vec());
        assert!(other.store.get(key).unwrap().is_none());
        assert_eq!(other.store.backup_objects().unwrap().len(), 1);

        let inserted: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|r| matches!(r.event, RingEvent::InsertSuccess { .. }))
            .collect();
        assert_eq!(inserted.len(), 1);
    }
}
