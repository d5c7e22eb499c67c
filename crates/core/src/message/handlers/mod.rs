#![warn(missing_docs)]
//! This module implemented message handler of the simulated ring.

use super::MessagePayload;
use crate::dht::Did;
use crate::dht::VNodeState;
use crate::error::Result;
use crate::message::types::Message;
use crate::message::FindSuccessorFailed;
use crate::message::FindSuccessorSend;
use crate::message::LeaveHandoff;
use crate::message::TraceRing;
use crate::swarm::Swarm;
use crate::swarm::Task;

/// Operator and Handler for routing
pub mod dht;
/// Operator and Handler for join and leave
pub mod membership;
/// Operator and handler for DHT stablization
pub mod stabilization;
/// Operator and Handler for Storage
pub mod storage;

/// Generic trait for handle message ,inspired by Actor-Model.
pub trait HandleMsg<T> {
    /// Message handler.
    fn handle(&mut self, ctx: &MessagePayload, msg: &T) -> Result<()>;
}

/// Replies a joining vnode waits for. Anything else is held back until it is stable.
fn is_join_reply(msg: &Message) -> bool {
    matches!(
        msg,
        Message::FindSuccessorReport(_)
            | Message::FindSuccessorFailed(_)
            | Message::TransferKeysReport(_)
            | Message::TransferKeysReject(_)
    )
}

impl Swarm {
    /// Dispatch a delivered message to its handler.
    pub(crate) fn handle_payload(&mut self, payload: MessagePayload) -> Result<()> {
        let Some(target) = self.vnodes.get(&payload.to) else {
            return Ok(());
        };
        if target.state == VNodeState::Joining && !is_join_reply(&payload.data) {
            tracing::trace!("hold {} for joining {}", payload.data.kind(), payload.to);
            self.sched
                .schedule_after(self.config.hop_latency_ms, Task::Deliver(payload));
            return Ok(());
        }

        tracing::debug!(
            "{} received {} from {}",
            payload.to,
            payload.data.kind(),
            payload.from
        );
        let res = match &payload.data {
            Message::FindSuccessorSend(msg) => self.handle(&payload, msg),
            Message::FindSuccessorReport(msg) => self.handle(&payload, msg),
            Message::FindSuccessorFailed(msg) => self.handle(&payload, msg),
            Message::QueryForTopoInfoSend(msg) => self.handle(&payload, msg),
            Message::QueryForTopoInfoReport(msg) => self.handle(&payload, msg),
            Message::NotifyPredecessorSend(msg) => self.handle(&payload, msg),
            Message::CheckPredecessor(msg) => self.handle(&payload, msg),
            Message::SyncReplicas(msg) => self.handle(&payload, msg),
            Message::Replicate(msg) => self.handle(&payload, msg),
            Message::TransferKeysSend(msg) => self.handle(&payload, msg),
            Message::TransferKeysReport(msg) => self.handle(&payload, msg),
            Message::TransferKeysReject(msg) => self.handle(&payload, msg),
            Message::HandoffObjects(msg) => self.handle(&payload, msg),
            Message::HandoffAck(msg) => self.handle(&payload, msg),
            Message::LeaveHandoff(msg) => self.handle(&payload, msg),
            Message::LeaveAck(msg) => self.handle(&payload, msg),
            Message::SetSuccessor(msg) => self.handle(&payload, msg),
            Message::TraceRing(msg) => self.handle(&payload, msg),
        };
        if let Err(e) = &res {
            tracing::error!("{} failed to handle {}: {}", payload.to, payload.data.kind(), e);
        }
        res
    }

    /// A message could not reach its target. The sender learns the target is gone and repairs
    /// whatever the message was for.
    pub(crate) fn handle_undeliverable(&mut self, payload: MessagePayload) -> Result<()> {
        let sender = payload.from;
        let dead = payload.to;
        let Some(host) = self.vnodes.get(&sender).map(|v| v.host) else {
            return Ok(());
        };
        if !self.network.is_online(host) {
            return Ok(());
        }

        tracing::info!("{} found {} unreachable", sender, dead);
        let vnode = self.vnode_mut(sender)?;
        let joining = vnode.state == VNodeState::Joining;
        if vnode.ring.remove(dead) {
            vnode.lost_predecessor = Some(dead);
            let promoted = vnode.store.promote_backup()?;
            tracing::info!("{} lost its predecessor, {} replicas promoted", sender, promoted);
        }
        if !joining {
            self.report_failure(dead);
        }

        match payload.data {
            Message::FindSuccessorSend(msg) if joining => self.retry_join(msg.txn, true),
            Message::FindSuccessorSend(mut msg) => {
                msg.retries += 1;
                msg.final_hop = false;
                if msg.retries > self.config.max_request_retries {
                    self.fail_route(sender, &msg);
                    Ok(())
                } else {
                    self.handle_find_successor(sender, msg)
                }
            }
            Message::TransferKeysSend(msg) => self.retry_join(msg.txn, true),
            Message::LeaveHandoff(msg) => self.resend_leave(sender, msg),
            Message::TraceRing(msg) => {
                self.continue_trace(sender, msg);
                Ok(())
            }
            data => {
                tracing::debug!("{} dropped after failed delivery", data.kind());
                Ok(())
            }
        }
    }

    /// Give up routing and tell the origin.
    pub(crate) fn fail_route(&mut self, at: Did, msg: &FindSuccessorSend) {
        tracing::info!(
            "{} gives up after {} hops, {} retries: {}",
            at,
            msg.hops,
            msg.retries,
            crate::error::Error::RoutingExhausted(msg.key)
        );
        self.send(
            at,
            msg.origin,
            Message::FindSuccessorFailed(FindSuccessorFailed {
                txn: msg.txn,
                key: msg.key,
            }),
        );
    }

    fn resend_leave(&mut self, sender: Did, msg: LeaveHandoff) -> Result<()> {
        let vnode = self.vnode_mut(sender)?;
        if vnode.state != VNodeState::Leaving {
            return Ok(());
        }
        if vnode.ring.is_alone() {
            return self.finish_leave(sender);
        }
        let successor = vnode.successor();
        self.send(sender, successor, Message::LeaveHandoff(msg));
        Ok(())
    }

    /// Forward a ring walk to the successor of `at`, unless the ring is a single vnode.
    pub(crate) fn continue_trace(&mut self, at: Did, msg: TraceRing) {
        let Some(successor) = self.vnode(at).map(|v| v.successor()) else {
            return;
        };
        if successor != at && successor != msg.origin {
            self.send(at, successor, Message::TraceRing(msg));
        }
    }
}
