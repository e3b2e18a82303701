//! Change notification for live queries.
//!
//! Every cache table has its own broadcast channel. Repositories publish a
//! [`Change`] after each successful mutation (after commit for transactional
//! writes) and live queries re-run whenever their table changes.

use futures::stream::{self, Stream};
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

/// Cache tables that can be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Accounts,
    Announcements,
    Farms,
    Faqs,
}

impl Table {
    const ALL: [Table; 4] = [
        Table::Accounts,
        Table::Announcements,
        Table::Farms,
        Table::Faqs,
    ];
}

/// What happened to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Inserted,
    Updated,
    Deleted,
    Cleared,
    /// A scope was cleared and refilled in one transaction.
    Replaced,
}

/// Broadcast hub with one channel per table.
pub struct ChangeHub {
    channels: HashMap<Table, broadcast::Sender<Change>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        let channels = Table::ALL
            .into_iter()
            .map(|table| {
                // Buffer of 16 changes; slower observers see `Lagged` and
                // simply re-query.
                let (sender, _) = broadcast::channel(16);
                (table, sender)
            })
            .collect();
        Self { channels }
    }

    pub fn subscribe(&self, table: Table) -> broadcast::Receiver<Change> {
        self.channels[&table].subscribe()
    }

    pub fn publish(&self, table: Table, change: Change) {
        tracing::trace!(?table, ?change, "cache change");
        // No subscribers is not an error.
        let _ = self.channels[&table].send(change);
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a live query: emits `fetch()` immediately, then again after every
/// change notification. Bursts of notifications that arrive while a fetch
/// runs are coalesced into one re-query. The stream ends only when every
/// sender for the channel is gone; repository watches hold a [`Cache`]
/// (and so the hub) in their fetch closure, so they run until the stream
/// itself is dropped.
///
/// [`Cache`]: super::Cache
pub fn live_query<T, F, Fut>(
    receiver: broadcast::Receiver<Change>,
    fetch: F,
) -> impl Stream<Item = Result<T, sqlx::Error>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    stream::unfold(
        (receiver, fetch, true),
        |(mut receiver, mut fetch, first)| async move {
            if !first {
                match receiver.recv().await {
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => return None,
                }
                loop {
                    match receiver.try_recv() {
                        Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Closed) => break,
                    }
                }
            }
            let result = fetch().await;
            Some((result, (receiver, fetch, false)))
        },
    )
}
