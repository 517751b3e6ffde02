//! Connection registry: one producer and any number of subscribers per
//! subject.
//!
//! All maps are sharded (`DashMap`), so connections for different subjects
//! rarely contend. A subject's subscriber list is only ever read or written
//! under its shard lock, which linearizes removal against
//! [`ConnectionRegistry::subscribers_of`]: a subscriber is either fully in a
//! snapshot or absent from it.

use dashmap::DashMap;
use shared_types::{ConnectionId, SubjectId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Serialized sample, shared by every subscriber of one broadcast.
pub type Frame = Arc<str>;

/// Registry side of a producer connection.
#[derive(Debug)]
pub struct ProducerHandle {
    connection_id: ConnectionId,
    displaced: oneshot::Sender<()>,
}

impl ProducerHandle {
    /// Create a handle and the receiver its session listens on for
    /// displacement.
    pub fn new(connection_id: ConnectionId) -> (Self, oneshot::Receiver<()>) {
        let (displaced, rx) = oneshot::channel();
        (
            Self {
                connection_id,
                displaced,
            },
            rx,
        )
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Tell the session it has been replaced. False if it already ended.
    pub fn displace(self) -> bool {
        self.displaced.send(()).is_ok()
    }
}

/// Why a frame could not be queued for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// Outbound queue full; the subscriber is too slow.
    Full,
    /// Session ended.
    Closed,
}

/// Registry side of a subscriber connection.
///
/// The registry holds the only senders; once the handle is removed and any
/// in-flight snapshot is dropped, the session's receiver yields `None`.
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    connection_id: ConnectionId,
    outbound: mpsc::Sender<Frame>,
}

impl SubscriberHandle {
    pub fn new(connection_id: ConnectionId, buffer: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (outbound, rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                connection_id,
                outbound,
            },
            rx,
        )
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Queue a frame without waiting.
    pub fn try_send(&self, frame: Frame) -> Result<(), SendFailure> {
        self.outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendFailure::Full,
            mpsc::error::TrySendError::Closed(_) => SendFailure::Closed,
        })
    }
}

/// Connection registry
#[derive(Default)]
pub struct ConnectionRegistry {
    /// Authoritative producer per subject
    producers: DashMap<SubjectId, ProducerHandle>,
    /// Subscribers per subject, unique by connection id
    subscribers: DashMap<SubjectId, Vec<SubscriberHandle>>,
    /// Subjects each subscriber connection watches
    by_connection: DashMap<ConnectionId, Vec<SubjectId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `handle` the subject's producer. Returns the displaced producer,
    /// if any; closing it is the caller's job.
    pub fn register_producer(
        &self,
        subject: SubjectId,
        handle: ProducerHandle,
    ) -> Option<ProducerHandle> {
        let connection_id = handle.connection_id;
        let displaced = self.producers.insert(subject.clone(), handle);
        debug!(
            subject_id = %subject,
            connection_id = %connection_id,
            replaced = displaced.is_some(),
            "Registered producer"
        );
        displaced
    }

    /// Remove the subject's producer only if it is still `connection_id`.
    pub fn remove_producer(&self, subject: &SubjectId, connection_id: ConnectionId) -> bool {
        self.producers
            .remove_if(subject, |_, handle| handle.connection_id == connection_id)
            .is_some()
    }

    /// Connection currently producing for `subject`.
    pub fn producer_of(&self, subject: &SubjectId) -> Option<ConnectionId> {
        self.producers.get(subject).map(|h| h.connection_id)
    }

    /// Add a subscriber. Idempotent per connection id; returns false if the
    /// connection was already subscribed.
    ///
    /// The reverse index is written while the subject's shard is still
    /// locked, so anyone who can see the handle in a snapshot can also remove
    /// it through [`ConnectionRegistry::remove_connection`]. Lock order is
    /// always `subscribers` then `by_connection`.
    pub fn register_subscriber(&self, subject: SubjectId, handle: SubscriberHandle) -> bool {
        let connection_id = handle.connection_id;
        let added = {
            let mut subs = self.subscribers.entry(subject.clone()).or_default();
            if subs.iter().any(|s| s.connection_id == connection_id) {
                false
            } else {
                self.by_connection
                    .entry(connection_id)
                    .or_default()
                    .push(subject.clone());
                subs.push(handle);
                true
            }
        };

        if added {
            debug!(
                subject_id = %subject,
                connection_id = %connection_id,
                "Registered subscriber"
            );
        }
        added
    }

    /// Remove one subscriber from one subject. No-op if absent.
    pub fn remove_subscriber(&self, subject: &SubjectId, connection_id: ConnectionId) -> bool {
        let removed = match self.subscribers.get_mut(subject) {
            Some(mut subs) => {
                let before = subs.len();
                subs.retain(|s| s.connection_id != connection_id);
                subs.len() != before
            }
            None => false,
        };
        self.subscribers.remove_if(subject, |_, subs| subs.is_empty());

        if removed {
            if let Some(mut subjects) = self.by_connection.get_mut(&connection_id) {
                subjects.retain(|s| s != subject);
            }
            self.by_connection
                .remove_if(&connection_id, |_, subjects| subjects.is_empty());
        }
        removed
    }

    /// Remove a subscriber connection from every subject it watches.
    pub fn remove_connection(&self, connection_id: ConnectionId) -> usize {
        let Some((_, subjects)) = self.by_connection.remove(&connection_id) else {
            return 0;
        };

        let mut removed = 0;
        for subject in &subjects {
            if let Some(mut subs) = self.subscribers.get_mut(subject) {
                let before = subs.len();
                subs.retain(|s| s.connection_id != connection_id);
                removed += before - subs.len();
            }
            self.subscribers.remove_if(subject, |_, subs| subs.is_empty());
        }

        debug!(
            connection_id = %connection_id,
            subjects = subjects.len(),
            "Removed subscriber connection"
        );
        removed
    }

    /// Snapshot of the subject's current subscribers.
    pub fn subscribers_of(&self, subject: &SubjectId) -> Vec<SubscriberHandle> {
        self.subscribers
            .get(subject)
            .map(|subs| subs.clone())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, subject: &SubjectId) -> usize {
        self.subscribers.get(subject).map(|s| s.len()).unwrap_or(0)
    }

    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    /// Subjects with at least one subscriber
    pub fn watched_subjects(&self) -> usize {
        self.subscribers.len()
    }
}
