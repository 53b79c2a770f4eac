// crates/plugstore-service/src/bus.rs
// ============================================================================
// Module: Message Bus
// Description: Request/reply bus abstraction and its in-process transport.
// Purpose: Carry raw request bytes to the service and reply bytes back.
// Dependencies: async-trait, thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! Callers see a [`MessageBus`] with request/reply semantics. The in-process
//! transport is a bounded `tokio` queue; each request carries a one-shot
//! reply channel, so replies never need correlation ids. The service side
//! drains a single [`BusSubscription`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::trace;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default queue depth for the in-process bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Bus delivery failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// No subscriber is draining the bus.
    #[error("message bus is closed")]
    Closed,
    /// The subscriber dropped the request without replying.
    #[error("no reply received for subject `{0}`")]
    NoReply(String),
}

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Reply side of a bus request.
#[derive(Debug)]
pub struct ReplyTo(Option<oneshot::Sender<Vec<u8>>>);

impl ReplyTo {
    /// Returns true when the publisher is waiting for a reply.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        self.0.is_some()
    }

    /// Sends reply bytes; returns false when nobody is listening.
    pub fn send(self, bytes: Vec<u8>) -> bool {
        self.0.is_some_and(|sender| sender.send(bytes).is_ok())
    }
}

/// Message delivered to the subscriber.
#[derive(Debug)]
pub struct BusRequest {
    /// Full request subject.
    pub subject: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Reply channel.
    reply: ReplyTo,
}

impl BusRequest {
    /// Splits the message into subject, payload, and reply channel.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<u8>, ReplyTo) {
        (self.subject, self.payload, self.reply)
    }
}

// ============================================================================
// SECTION: Bus Trait
// ============================================================================

/// Request/reply message bus.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Sends a request and waits for its reply bytes.
    ///
    /// # Errors
    ///
    /// Returns [`BusError`] when the request cannot be delivered or is
    /// dropped without a reply.
    async fn request(&self, subject: &str, payload: Vec<u8>) -> Result<Vec<u8>, BusError>;

    /// Sends a message without waiting for a reply.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Closed`] when the request cannot be delivered.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError>;
}

// ============================================================================
// SECTION: In-Process Bus
// ============================================================================

/// Bounded in-process bus backed by a `tokio` channel.
#[derive(Debug, Clone)]
pub struct InProcessBus {
    /// Sending half shared by all publishers.
    sender: mpsc::Sender<BusRequest>,
}

/// Receiving half of an [`InProcessBus`].
#[derive(Debug)]
pub struct BusSubscription {
    /// Queue of pending requests.
    receiver: mpsc::Receiver<BusRequest>,
}

impl InProcessBus {
    /// Creates a bus with the default capacity.
    #[must_use]
    pub fn channel() -> (Self, BusSubscription) {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a bus holding at most `capacity` undelivered requests.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, BusSubscription) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        debug!(capacity, "in-process bus created");
        (
            Self {
                sender,
            },
            BusSubscription {
                receiver,
            },
        )
    }

    /// Enqueues a request, waiting for queue space.
    async fn enqueue(&self, subject: &str, payload: Vec<u8>, reply: ReplyTo) -> Result<(), BusError> {
        trace!(subject, bytes = payload.len(), "bus message queued");
        self.sender
            .send(BusRequest {
                subject: subject.to_string(),
                payload,
                reply,
            })
            .await
            .map_err(|_| BusError::Closed)
    }
}

#[async_trait]
impl MessageBus for InProcessBus {
    async fn request(&self, subject: &str, payload: Vec<u8>) -> Result<Vec<u8>, BusError> {
        let (sender, receiver) = oneshot::channel();
        self.enqueue(subject, payload, ReplyTo(Some(sender))).await?;
        receiver.await.map_err(|_| BusError::NoReply(subject.to_string()))
    }

    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.enqueue(subject, payload, ReplyTo(None)).await
    }
}

impl BusSubscription {
    /// Waits for the next request; `None` once every publisher is dropped.
    pub async fn recv(&mut self) -> Option<BusRequest> {
        self.receiver.recv().await
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    //! Delivery checks for the in-process bus.
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    #[tokio::test]
    async fn request_receives_the_subscriber_reply() {
        let (bus, mut subscription) = InProcessBus::with_capacity(4);
        let responder = tokio::spawn(async move {
            let (subject, payload, reply) = subscription.recv().await.unwrap().into_parts();
            assert_eq!(subject, "db.echo.select");
            assert!(reply.send(payload));
        });
        let reply = bus.request("db.echo.select", b"{}".to_vec()).await.unwrap();
        assert_eq!(reply, b"{}".to_vec());
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn dropped_request_reports_no_reply() {
        let (bus, mut subscription) = InProcessBus::with_capacity(4);
        tokio::spawn(async move {
            drop(subscription.recv().await);
        });
        let err = bus.request("db.echo.select", Vec::new()).await.unwrap_err();
        assert_eq!(err, BusError::NoReply("db.echo.select".to_string()));
    }

    #[tokio::test]
    async fn closed_bus_rejects_requests() {
        let (bus, subscription) = InProcessBus::channel();
        drop(subscription);
        assert_eq!(bus.publish("db.echo.insert", Vec::new()).await, Err(BusError::Closed));
    }

    #[tokio::test]
    async fn published_messages_expect_no_reply() {
        let (bus, mut subscription) = InProcessBus::channel();
        bus.publish("db.echo.insert", Vec::new()).await.unwrap();
        let (_, _, reply) = subscription.recv().await.unwrap().into_parts();
        assert!(!reply.is_expected());
    }
}
