//! Sharing one [`Discovery`] between the event loop and plugin callbacks.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

use crate::config::DiscoveryConfig;
use crate::proto::Discovery;
use shared::error::Result;

/// A cloneable handle to a single engine behind one coarse lock.
///
/// Radio and plugin callbacks arrive on their own contexts. Each takes the
/// lock, feeds the engine and drops the guard, which wakes the primary event
/// loop waiting in [`notified`](Self::notified) so it drains the output
/// queues promptly.
#[derive(Clone)]
pub struct SharedDiscovery {
    inner: Arc<Mutex<Discovery>>,
    notify: Arc<Notify>,
}

impl SharedDiscovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self::from_discovery(Discovery::new(config))
    }

    pub fn from_discovery(discovery: Discovery) -> Self {
        Self {
            inner: Arc::new(Mutex::new(discovery)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Locks the engine.
    ///
    /// # Errors
    ///
    /// [`Error::PoisonError`](shared::error::Error::PoisonError) when another
    /// holder panicked.
    pub fn lock(&self) -> Result<DiscoveryGuard<'_>> {
        let guard = self.inner.lock()?;
        Ok(DiscoveryGuard {
            guard,
            notify: &self.notify,
        })
    }

    /// Waits until some holder of the lock has released it.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

/// Exclusive access to the engine. Signals the event loop when dropped.
pub struct DiscoveryGuard<'a> {
    guard: MutexGuard<'a, Discovery>,
    notify: &'a Notify,
}

impl Deref for DiscoveryGuard<'_> {
    type Target = Discovery;

    fn deref(&self) -> &Discovery {
        &self.guard
    }
}

impl DerefMut for DiscoveryGuard<'_> {
    fn deref_mut(&mut self) -> &mut Discovery {
        &mut self.guard
    }
}

impl Drop for DiscoveryGuard<'_> {
    fn drop(&mut self) {
        // notify_one stores a permit, so a release before the loop starts
        // waiting is not lost.
        self.notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sansio::Protocol;
    use shared::error::Error;

    use super::*;
    use crate::proto::{BrowseRequest, RadioCommand};
    use crate::transport::{InterfaceId, ServiceFlags};

    #[tokio::test]
    async fn test_release_wakes_event_loop() -> Result<()> {
        let handle = SharedDiscovery::new(DiscoveryConfig::default());

        let plugin = handle.clone();
        let task = tokio::spawn(async move {
            let mut discovery = plugin.lock()?;
            discovery.start_browse(BrowseRequest {
                service_type: "_ipp._tcp.local.".to_owned(),
                handle: 1,
                interface: InterfaceId::Ble,
                flags: ServiceFlags::NONE,
            })?;
            Ok::<(), Error>(())
        });

        tokio::time::timeout(Duration::from_secs(5), handle.notified())
            .await
            .expect("event loop woken");
        task.await.expect("task joined")?;

        let mut discovery = handle.lock()?;
        assert_eq!(discovery.request_count(), 1);
        assert!(matches!(
            discovery.poll_write(),
            Some(RadioCommand::PublishBeacon { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_poisoned_lock_is_reported() {
        let handle = SharedDiscovery::new(DiscoveryConfig::default());
        let holder = handle.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(matches!(handle.lock(), Err(Error::PoisonError(_))));
    }
}
