//! Storage change notifications.
//!
//! Every successful `set` on a storage backend emits one [`StoreChange`]
//! naming the keys it wrote. Downstream consumers (menu synchronizer, UI
//! refresh) subscribe independently through the [`ChangeBus`].

use tokio::sync::broadcast;

use crate::defaults;

/// The set of keys written by one storage `set` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub keys: Vec<String>,
}

impl StoreChange {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        keys.sort();
        keys.dedup();
        Self { keys }
    }

    pub fn touches(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn touches_prefix(&self, prefix: &str) -> bool {
        self.keys.iter().any(|k| k.starts_with(prefix))
    }

    /// Whether this change can alter the trigger surface: identity, project
    /// list, or any per-identity default-project preference.
    pub fn affects_menu(&self) -> bool {
        self.touches(defaults::PROJECTS_KEY)
            || self.touches(defaults::IDENTITY_KEY)
            || self.touches_prefix(defaults::DEFAULT_PROJECT_KEY_PREFIX)
    }
}

/// Broadcast fan-out of storage changes.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<StoreChange>,
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit a change. Having no subscribers is not an error.
    pub fn emit(&self, change: StoreChange) {
        let _ = self.tx.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(defaults::EVENT_BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_change_dedups_keys() {
        let change = StoreChange::new(["clips", "projects", "clips"]);
        assert_eq!(change.keys, vec!["clips", "projects"]);
    }

    #[test]
    fn test_affects_menu() {
        assert!(StoreChange::new(["projects"]).affects_menu());
        assert!(StoreChange::new(["authUser"]).affects_menu());
        assert!(StoreChange::new(["lastActiveProjectId_u1"]).affects_menu());
        assert!(!StoreChange::new(["clips"]).affects_menu());
        assert!(!StoreChange::new(["openaiKey"]).affects_menu());
    }

    #[tokio::test]
    async fn test_bus_delivers_to_subscribers() {
        let bus = ChangeBus::default();
        let mut rx = bus.subscribe();
        bus.emit(StoreChange::new(["clips"]));
        let got = rx.recv().await.unwrap();
        assert!(got.touches("clips"));
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = ChangeBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(StoreChange::new(["clips"]));
    }
}
