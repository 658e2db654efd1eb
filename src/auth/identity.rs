//! Identity supplied by the external auth provider.
//!
//! The portal never authenticates anyone itself. It consumes an [`Identity`]
//! from an [`IdentityProvider`] and follows sign-in/sign-out through a
//! subscription. Dropping the [`IdentitySubscription`] unsubscribes.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}

pub trait IdentityProvider: Send + Sync {
    /// The identity signed in right now, if any.
    fn current(&self) -> Option<Identity>;

    /// Follow identity changes until the subscription is dropped.
    fn subscribe(&self) -> IdentitySubscription;
}

/// Live feed of identity changes.
pub struct IdentitySubscription {
    rx: watch::Receiver<Option<Identity>>,
}

impl IdentitySubscription {
    /// Wait for the next change. Returns `None` once the provider is gone.
    pub async fn changed(&mut self) -> Option<Option<Identity>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn current(&self) -> Option<Identity> {
        self.rx.borrow().clone()
    }
}

/// In-process provider: whoever holds the hub publishes sign-in and
/// sign-out, every subscriber sees the latest value.
pub struct IdentityHub {
    tx: watch::Sender<Option<Identity>>,
}

impl Default for IdentityHub {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityHub {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn sign_in(&self, identity: Identity) {
        log::info!("Identity signed in: {}", identity.id);
        self.tx.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        if self.tx.send_replace(None).is_some() {
            log::info!("Identity signed out");
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl IdentityProvider for IdentityHub {
    fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> IdentitySubscription {
        IdentitySubscription {
            rx: self.tx.subscribe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_changes() {
        let hub = IdentityHub::new();
        let mut sub = hub.subscribe();
        assert_eq!(sub.current(), None);

        hub.sign_in(Identity::new("u1", "u1@example.com"));
        assert_eq!(sub.changed().await, Some(Some(Identity::new("u1", "u1@example.com"))));

        hub.sign_out();
        assert_eq!(sub.changed().await, Some(None));
        assert_eq!(hub.current(), None);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let hub = IdentityHub::new();
        let a = hub.subscribe();
        let b = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);
        drop(a);
        assert_eq!(hub.subscriber_count(), 1);
        drop(b);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscription_ends_with_provider() {
        let hub = IdentityHub::new();
        let mut sub = hub.subscribe();
        drop(hub);
        assert_eq!(sub.changed().await, None);
    }
}
