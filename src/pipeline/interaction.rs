//! Single-reply prompts
//!
//! A request that needs one more message from its requester registers a
//! one-shot slot keyed by (chat, user) *before* sending the prompt. The next
//! plain message from that requester resolves the slot; the waiter gives up
//! after its timeout. Slots of different requesters never interact.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use teloxide::types::{ChatId, UserId};
use thiserror::Error;
use tokio::sync::oneshot;

/// Who a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Requester {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

impl Requester {
    pub fn new(chat_id: ChatId, user_id: UserId) -> Self {
        Self { chat_id, user_id }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplyError {
    #[error("a prompt is already waiting for this requester")]
    AlreadyPending,

    #[error("no reply within {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("prompt cancelled")]
    Cancelled,
}

struct Slot {
    id: u64,
    tx: oneshot::Sender<String>,
}

/// Registry of open prompts, cheap to clone and share between handlers.
#[derive(Clone, Default)]
pub struct PendingReplies {
    slots: Arc<DashMap<Requester, Slot>>,
    next_id: Arc<AtomicU64>,
}

impl PendingReplies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the slot for `requester`. Fails if one is already open.
    pub fn register(&self, requester: Requester) -> Result<ReplyWaiter, ReplyError> {
        match self.slots.entry(requester) {
            Entry::Occupied(_) => Err(ReplyError::AlreadyPending),
            Entry::Vacant(vacant) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = oneshot::channel();
                vacant.insert(Slot { id, tx });
                Ok(ReplyWaiter {
                    requester,
                    id,
                    rx,
                    slots: Arc::clone(&self.slots),
                })
            }
        }
    }

    pub fn is_pending(&self, requester: &Requester) -> bool {
        self.slots.contains_key(requester)
    }

    /// Hands `reply` (trimmed) to the waiting request.
    ///
    /// Returns `false` when nobody is waiting or the waiter already gave up.
    pub fn resolve(&self, requester: &Requester, reply: &str) -> bool {
        match self.slots.remove(requester) {
            Some((_, slot)) => slot.tx.send(reply.trim().to_string()).is_ok(),
            None => false,
        }
    }

    /// Closes the slot without a reply; the waiter sees `ReplyError::Cancelled`.
    pub fn cancel(&self, requester: &Requester) -> bool {
        self.slots.remove(requester).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Receiving half of a registered slot. Dropping it closes the slot.
pub struct ReplyWaiter {
    requester: Requester,
    id: u64,
    rx: oneshot::Receiver<String>,
    slots: Arc<DashMap<Requester, Slot>>,
}

impl ReplyWaiter {
    /// Waits for the reply for at most `timeout`.
    pub async fn wait(mut self, timeout: Duration) -> Result<String, ReplyError> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(ReplyError::Cancelled),
            Err(_) => Err(ReplyError::TimedOut(timeout)),
        }
    }
}

impl Drop for ReplyWaiter {
    fn drop(&mut self) {
        // Only our own slot; a newer registration for the same requester stays
        let id = self.id;
        self.slots.remove_if(&self.requester, |_, slot| slot.id == id);
    }
}
