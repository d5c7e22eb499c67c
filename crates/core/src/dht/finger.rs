#![warn(missing_docs)]
use derivative::Derivative;
use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;

/// Chord routing shortcuts of one vnode.
///
/// Slot `k` holds the node believed responsible for `owner + 2^k`. `None` stands for
/// "unknown, or the owner itself", so a lone vnode has an empty table.
#[derive(Derivative, Clone, Debug, Serialize, Deserialize)]
#[derivative(PartialEq)]
pub struct FingerTable {
    owner: Did,
    slots: Vec<Option<Did>>,
    /// Next slot refreshed by the periodic fix-up.
    #[derivative(PartialEq = "ignore")]
    pub(crate) cursor: usize,
}

impl FingerTable {
    /// A table of `size` empty slots for `owner`.
    pub fn new(owner: Did, size: usize) -> Self {
        Self {
            owner,
            slots: vec![None; size],
            cursor: 0,
        }
    }

    /// No slot is filled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of filled slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Closest filled slot.
    pub fn first(&self) -> Option<Did> {
        self.slots.iter().find_map(|s| *s)
    }

    /// Node held in slot `k`, if any.
    pub fn get(&self, k: usize) -> Option<Did> {
        self.slots.get(k).copied().flatten()
    }

    /// All slots, nearest first.
    pub fn list(&self) -> &[Option<Did>] {
        &self.slots
    }

    /// First id slot `k` is responsible for.
    pub fn start(&self, k: usize) -> Did {
        self.owner + Did::pow2(k)
    }

    /// Record the owner of `start(k)`, as learned by a lookup.
    pub fn set(&mut self, k: usize, did: Did) {
        let Some(slot) = self.slots.get_mut(k) else {
            tracing::error!("finger {} out of range", k);
            return;
        };
        *slot = (did != self.owner).then_some(did);
    }

    /// Slot to refresh next, moving the cursor on.
    pub fn next_fix_index(&mut self) -> usize {
        let k = self.cursor;
        self.cursor = (k + 1) % self.slots.len().max(1);
        k
    }

    /// Forget a node. The slots it held take the value of the slot right after them.
    pub fn remove(&mut self, did: Did) {
        let held = self.slots.iter().position(|s| *s == Some(did));
        let Some(from) = held else {
            return;
        };
        let to = self
            .slots
            .iter()
            .rposition(|s| *s == Some(did))
            .unwrap_or(from);
        let next = self.slots.get(to + 1).copied().flatten();
        self.slots[from..=to].fill(next);
    }

    /// Offer a node to every slot it serves better than the current holder.
    pub fn join(&mut self, did: Did) {
        if did == self.owner {
            return;
        }
        let candidate = did.bias(self.owner);
        let owner = self.owner;
        for (k, slot) in self.slots.iter_mut().enumerate() {
            // the candidate must not come before the start of slot k
            if candidate.pos() < Did::pow2(k) {
                continue;
            }
            match slot {
                Some(held) if held.bias(owner) <= candidate => {}
                _ => *slot = Some(did),
            }
        }
    }

    /// Farthest filled slot strictly inside `(owner, key)`, or the owner when there is none.
    pub fn closest_predecessor(&self, key: Did) -> Did {
        self.slots
            .iter()
            .rev()
            .flatten()
            .find(|d| d.is_between(self.owner, key))
            .copied()
            .unwrap_or(self.owner)
    }

    #[cfg(test)]
    fn fill(&mut self, entries: &[Option<Did>]) {
        self.slots = entries.to_vec();
    }
}
