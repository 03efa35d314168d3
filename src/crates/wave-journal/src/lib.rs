//! Append-only, per-execution event journal with live subscription.
//!
//! A closed, serde-tagged event enum plus per-subscriber buffering so a slow observer never
//! blocks the producer. Single-writer discipline: only [`Journal::append`] assigns sequence
//! numbers, so `(execution_id, sequence)` is always a strict total order without needing a
//! lock around the whole append path.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use wave_model::{Event, EventKind};

/// Per-subscriber buffer size. A subscriber that falls this far behind the producer misses
/// the oldest buffered events — `tokio::sync::broadcast`'s built-in lagged-receiver policy —
/// rather than ever blocking [`Journal::append`].
const SUBSCRIBER_BUFFER: usize = 1024;

/// One execution's append-only event log. Cheaply cloneable; every clone shares the same
/// underlying sequence counter and broadcast channel.
#[derive(Clone)]
pub struct Journal {
    execution_id: String,
    sequence: Arc<AtomicU64>,
    sender: broadcast::Sender<Event>,
    history: Arc<tokio::sync::RwLock<Vec<Event>>>,
}

impl Journal {
    pub fn new(execution_id: impl Into<String>) -> Self {
        let (sender, _rx) = broadcast::channel(SUBSCRIBER_BUFFER);
        Journal {
            execution_id: execution_id.into(),
            sequence: Arc::new(AtomicU64::new(0)),
            sender,
            history: Arc::new(tokio::sync::RwLock::new(Vec::new())),
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Appends `kind`, assigning it the next sequence number (starting at 1). Logged through
    /// `tracing` at the same time and broadcast to any live subscribers.
    pub async fn append(&self, kind: EventKind) -> Event {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let event = Event {
            execution_id: self.execution_id.clone(),
            sequence,
            kind,
            created_at: Utc::now(),
        };

        match &event.kind {
            EventKind::ExecutionFailed { error } => {
                tracing::warn!(execution_id = %self.execution_id, sequence, event = event.kind.name(), error = %error, "journal entry")
            }
            EventKind::ErrorOccurred { message } => {
                tracing::warn!(execution_id = %self.execution_id, sequence, event = event.kind.name(), message = %message, "journal entry")
            }
            EventKind::NodeFailed { node_id, message, .. } => {
                tracing::warn!(execution_id = %self.execution_id, sequence, event = event.kind.name(), node_id = %node_id, message = %message, "journal entry")
            }
            _ => tracing::debug!(execution_id = %self.execution_id, sequence, event = event.kind.name(), "journal entry"),
        }

        self.history.write().await.push(event.clone());
        // A send error just means there are currently no subscribers — the history vector is
        // the durable record regardless.
        let _ = self.sender.send(event.clone());
        event
    }

    /// The full ordered history so far. Used by the scheduler to compute the final
    /// `Execution.node_executions` summary and by tests asserting event ordering.
    pub async fn history(&self) -> Vec<Event> {
        self.history.read().await.clone()
    }

    /// Subscribes to the live tail. The stream terminates after the single terminal
    /// `execution.*` event is observed.
    pub fn subscribe(&self) -> JournalSubscription {
        JournalSubscription {
            receiver: self.sender.subscribe(),
        }
    }
}

/// A live subscription to one execution's journal.
pub struct JournalSubscription {
    receiver: broadcast::Receiver<Event>,
}

impl JournalSubscription {
    /// Awaits the next event. Returns `None` once the terminal execution event has been
    /// delivered and the channel closes, or if the sender is dropped. On lag (subscriber fell
    /// behind by more than [`SUBSCRIBER_BUFFER`] events) the oldest missed events are skipped
    /// rather than blocking the caller or the producer.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequence_numbers_start_at_one_and_increase() {
        let journal = Journal::new("exec-1");
        let e1 = journal.append(EventKind::ExecutionStarted).await;
        let e2 = journal
            .append(EventKind::WaveStarted { depth: 0, node_ids: vec!["a".into()] })
            .await;
        assert_eq!(e1.sequence, 1);
        assert_eq!(e2.sequence, 2);
    }

    #[tokio::test]
    async fn subscriber_receives_events_in_order() {
        let journal = Journal::new("exec-1");
        let mut sub = journal.subscribe();
        journal.append(EventKind::ExecutionStarted).await;
        journal.append(EventKind::ExecutionCompleted).await;

        let first = sub.next().await.unwrap();
        let second = sub.next().await.unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert!(second.kind.is_terminal());
    }

    #[tokio::test]
    async fn history_preserves_full_ordered_log() {
        let journal = Journal::new("exec-1");
        journal.append(EventKind::ExecutionStarted).await;
        journal.append(EventKind::ExecutionCompleted).await;
        let history = journal.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sequence, 1);
        assert_eq!(history[1].sequence, 2);
    }
}
