use std::sync::Arc;

/// What happened to an event handed to a publisher.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Publishing is turned off; nothing was attempted.
    Disabled,
    /// The sink accepted the message.
    Delivered,
    /// Delivery failed and the failure was swallowed (lenient mode).
    Dropped,
}

/// Publishes integration events to an external consumer.
///
/// Implementations decide their own failure policy: an `Err` means the caller
/// must treat the failure as its own (strict delivery).
pub trait EventPublisher<E>: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn publish(&self, event: &E) -> Result<Delivery, Self::Error>;
}

impl<E, P> EventPublisher<E> for Arc<P>
where
    P: EventPublisher<E> + ?Sized,
{
    type Error = P::Error;

    fn publish(&self, event: &E) -> Result<Delivery, Self::Error> {
        (**self).publish(event)
    }
}
