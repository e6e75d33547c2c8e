//! Generic queue draining.
//!
//! A drain pops one item at a time from a channel and hands it to an
//! [`ItemHandler`]. The handler's [`ItemOutcome`] decides whether the item is
//! done, goes back on the channel, or stops the drain.

use async_trait::async_trait;
use tracing::{debug, warn};
use trustroot_core::Id;
use trustroot_store::{Direction, Queue, QueueExt};

use crate::config::InviteFailurePolicy;
use crate::error::{Result, TrustError};

/// Admin invitations, inbound to the organization and to the new admin.
pub const INVITE: &str = "invite";
/// Node registrations, inbound to the organization and to the node.
pub const REGISTRATION: &str = "registration";
/// Public CSRs, outbound from a node.
pub const CSRS: &str = "csrs";
/// Signed certificates, inbound to a node.
pub const CERTS: &str = "certs";

/// Dead-letter channel paired with `channel`.
pub fn dead_letter(channel: &str) -> String {
    format!("{channel}.dead")
}

/// Result of handling one item.
#[derive(Debug)]
pub enum ItemOutcome {
    /// Processed; the item is gone.
    Consumed,
    /// Not processed; the item is pushed back unchanged and the drain goes on.
    Requeue(TrustError),
    /// Not processed; the drain stops with this error.
    Fatal(TrustError),
}

/// Per-item processing step of a drain.
#[async_trait]
pub trait ItemHandler: Send {
    async fn handle(&mut self, item: &[u8]) -> ItemOutcome;
}

/// A channel to drain.
#[derive(Debug, Clone, Copy)]
pub struct Channel<'a> {
    pub owner: Id,
    pub name: &'a str,
    pub direction: Direction,
}

impl<'a> Channel<'a> {
    pub fn incoming(owner: Id, name: &'a str) -> Self {
        Self {
            owner,
            name,
            direction: Direction::Incoming,
        }
    }

    pub fn outgoing(owner: Id, name: &'a str) -> Self {
        Self {
            owner,
            name,
            direction: Direction::Outgoing,
        }
    }
}

/// Counts from one drain call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub consumed: usize,
    pub requeued: usize,
    pub dead_lettered: usize,
}

impl DrainReport {
    /// Items taken off the channel for good, processed or dead-lettered.
    pub fn removed(&self) -> usize {
        self.consumed + self.dead_lettered
    }
}

/// Drain a channel.
///
/// At most as many items as the channel held when the call began are taken
/// (fewer if `limit` is lower), so a requeued item is retried on the next call
/// rather than in this one. A `Fatal` outcome returns its error; the item that
/// produced it is not pushed back.
pub async fn drain<Q, H>(
    queue: &Q,
    channel: Channel<'_>,
    policy: InviteFailurePolicy,
    limit: Option<usize>,
    handler: &mut H,
) -> Result<DrainReport>
where
    Q: Queue + ?Sized,
    H: ItemHandler + ?Sized,
{
    let Channel {
        owner,
        name,
        direction,
    } = channel;

    let available = queue.size(direction, &owner, name).await?;
    let budget = limit.map_or(available, |limit| limit.min(available));
    let mut report = DrainReport::default();

    for _ in 0..budget {
        if queue.size(direction, &owner, name).await? == 0 {
            break;
        }
        let item = queue.pop(direction, &owner, name).await?;

        match handler.handle(&item).await {
            ItemOutcome::Consumed => report.consumed += 1,
            ItemOutcome::Requeue(err) => match policy {
                InviteFailurePolicy::Requeue => {
                    warn!(%owner, channel = name, error = %err, "requeueing item");
                    queue.push(direction, &owner, name, &item).await?;
                    report.requeued += 1;
                }
                InviteFailurePolicy::DeadLetter => {
                    warn!(%owner, channel = name, error = %err, "dead-lettering item");
                    queue
                        .push(direction, &owner, &dead_letter(name), &item)
                        .await?;
                    report.dead_lettered += 1;
                }
            },
            ItemOutcome::Fatal(err) => {
                warn!(%owner, channel = name, error = %err, "drain aborted");
                return Err(err);
            }
        }
    }

    debug!(%owner, channel = name, ?report, "drain finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustroot_store::MemoryStore;

    /// Consumes items starting with 1, requeues items starting with 0 and
    /// aborts on anything else.
    struct ByFirstByte {
        seen: Vec<Vec<u8>>,
    }

    #[async_trait]
    impl ItemHandler for ByFirstByte {
        async fn handle(&mut self, item: &[u8]) -> ItemOutcome {
            self.seen.push(item.to_vec());
            match item.first() {
                Some(1) => ItemOutcome::Consumed,
                Some(0) => ItemOutcome::Requeue(TrustError::Validation("bad".into())),
                _ => ItemOutcome::Fatal(TrustError::Validation("fatal".into())),
            }
        }
    }

    fn handler() -> ByFirstByte {
        ByFirstByte { seen: Vec::new() }
    }

    #[tokio::test]
    async fn test_empty_channel() {
        let store = MemoryStore::new();
        let report = drain(
            &store,
            Channel::incoming(Id::generate(), INVITE),
            InviteFailurePolicy::Requeue,
            None,
            &mut handler(),
        )
        .await
        .unwrap();
        assert_eq!(report, DrainReport::default());
    }

    #[tokio::test]
    async fn test_consumes_all() {
        let store = MemoryStore::new();
        let owner = Id::generate();
        for i in 0..3u8 {
            store.push_incoming(&owner, INVITE, &[1, i]).await.unwrap();
        }

        let mut h = handler();
        let report = drain(
            &store,
            Channel::incoming(owner, INVITE),
            InviteFailurePolicy::Requeue,
            None,
            &mut h,
        )
        .await
        .unwrap();
        assert_eq!(report.consumed, 3);
        assert_eq!(h.seen, vec![vec![1, 0], vec![1, 1], vec![1, 2]]);
        assert_eq!(store.incoming_size(&owner, INVITE).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_requeue_is_bounded_per_call() {
        let store = MemoryStore::new();
        let owner = Id::generate();
        store.push_incoming(&owner, INVITE, &[0]).await.unwrap();
        store.push_incoming(&owner, INVITE, &[1]).await.unwrap();

        let mut h = handler();
        let report = drain(
            &store,
            Channel::incoming(owner, INVITE),
            InviteFailurePolicy::Requeue,
            None,
            &mut h,
        )
        .await
        .unwrap();
        assert_eq!(report.consumed, 1);
        assert_eq!(report.requeued, 1);
        assert_eq!(h.seen.len(), 2);
        assert_eq!(store.pop_incoming(&owner, INVITE).await.unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_dead_letter_policy() {
        let store = MemoryStore::new();
        let owner = Id::generate();
        store.push_incoming(&owner, INVITE, &[0, 7]).await.unwrap();

        let report = drain(
            &store,
            Channel::incoming(owner, INVITE),
            InviteFailurePolicy::DeadLetter,
            None,
            &mut handler(),
        )
        .await
        .unwrap();
        assert_eq!(report.dead_lettered, 1);
        assert_eq!(store.incoming_size(&owner, INVITE).await.unwrap(), 0);
        assert_eq!(
            store.pop_incoming(&owner, &dead_letter(INVITE)).await.unwrap(),
            vec![0, 7]
        );
    }

    #[tokio::test]
    async fn test_fatal_stops_without_requeue() {
        let store = MemoryStore::new();
        let owner = Id::generate();
        store.push_incoming(&owner, CERTS, &[9]).await.unwrap();
        store.push_incoming(&owner, CERTS, &[1]).await.unwrap();

        let mut h = handler();
        let result = drain(
            &store,
            Channel::incoming(owner, CERTS),
            InviteFailurePolicy::Requeue,
            None,
            &mut h,
        )
        .await;
        assert!(matches!(result, Err(TrustError::Validation(_))));
        assert_eq!(h.seen.len(), 1);
        assert_eq!(store.incoming_size(&owner, CERTS).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_limit_and_outgoing() {
        let store = MemoryStore::new();
        let owner = Id::generate();
        for _ in 0..4 {
            store.push_outgoing(&owner, CSRS, &[1]).await.unwrap();
        }

        let report = drain(
            &store,
            Channel::outgoing(owner, CSRS),
            InviteFailurePolicy::Requeue,
            Some(3),
            &mut handler(),
        )
        .await
        .unwrap();
        assert_eq!(report.consumed, 3);
        assert_eq!(store.outgoing_size(&owner, CSRS).await.unwrap(), 1);
    }
}
