use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Per-identity admission control bounding simultaneous synthesis calls.
///
/// State lives in process memory for the process lifetime; nothing is
/// persisted or shared across processes. The gate is an explicit service
/// object: construct one at startup and hand it to the synthesis service.
///
/// `acquire` never errors, it only waits. Release is tied to dropping the
/// returned [`GatePermit`], so every exit path of the protected operation
/// releases exactly once.
#[derive(Clone, Default)]
pub struct ConcurrencyGate {
    inner: Arc<GateInner>,
}

#[derive(Default)]
struct GateInner {
    entries: Mutex<HashMap<String, GateEntry>>,
}

struct GateEntry {
    in_flight: usize,
    waiting: usize,
    notify: Arc<Notify>,
}

impl GateEntry {
    fn new() -> Self {
        Self {
            in_flight: 0,
            waiting: 0,
            notify: Arc::new(Notify::new()),
        }
    }
}

impl ConcurrencyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until the identity's in-flight count is below `limit`, then
    /// claim a slot. The limit is re-read by the caller on every acquire, so
    /// it may differ between calls for the same identity.
    pub async fn acquire(&self, identity: &str, limit: usize) -> GatePermit {
        let limit = limit.max(1);
        loop {
            let notify = {
                let mut entries = self.inner.entries.lock().expect("gate mutex poisoned");
                let entry = entries
                    .entry(identity.to_string())
                    .or_insert_with(GateEntry::new);
                if entry.in_flight < limit {
                    entry.in_flight += 1;
                    return GatePermit {
                        inner: Arc::clone(&self.inner),
                        identity: identity.to_string(),
                    };
                }
                entry.waiting += 1;
                entry.notify.clone()
            };

            // The guard keeps the waiter count honest even if this future is
            // dropped mid-wait (request timeout or disconnect).
            let waiting_guard = WaitingGuard {
                inner: &self.inner,
                identity,
            };

            // Register interest before re-checking so a release between the
            // unlock above and the await below is not missed.
            let notified = notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            notified.await;

            drop(waiting_guard);
        }
    }

    /// Current in-flight count for an identity (diagnostics and tests).
    pub fn in_flight(&self, identity: &str) -> usize {
        let entries = self.inner.entries.lock().expect("gate mutex poisoned");
        entries.get(identity).map(|e| e.in_flight).unwrap_or(0)
    }
}

impl GateInner {
    fn release(&self, identity: &str) {
        let mut entries = self.entries.lock().expect("gate mutex poisoned");
        if let Some(entry) = entries.get_mut(identity) {
            entry.in_flight = entry.in_flight.saturating_sub(1);
            if entry.in_flight == 0 && entry.waiting == 0 {
                entries.remove(identity);
            } else {
                entry.notify.notify_waiters();
            }
        }
    }

    fn drop_waiter(&self, identity: &str) {
        let mut entries = self.entries.lock().expect("gate mutex poisoned");
        if let Some(entry) = entries.get_mut(identity) {
            entry.waiting = entry.waiting.saturating_sub(1);
            if entry.in_flight == 0 && entry.waiting == 0 {
                entries.remove(identity);
            }
        }
    }
}

struct WaitingGuard<'a> {
    inner: &'a GateInner,
    identity: &'a str,
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.inner.drop_waiter(self.identity);
    }
}

/// A claimed slot. Dropping it releases the slot and wakes waiters.
pub struct GatePermit {
    inner: Arc<GateInner>,
    identity: String,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.inner.release(&self.identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn single_slot_blocks_second_acquire_until_release() {
        let gate = ConcurrencyGate::new();

        let first = gate.acquire("anonymous", 1).await;
        assert_eq!(gate.in_flight("anonymous"), 1);

        // Second acquire must not resolve while the first permit is held
        let second = timeout(Duration::from_millis(50), gate.acquire("anonymous", 1)).await;
        assert!(second.is_err(), "second acquire resolved while slot held");

        drop(first);

        let second = timeout(Duration::from_millis(500), gate.acquire("anonymous", 1))
            .await
            .expect("acquire should resolve after release");
        assert_eq!(gate.in_flight("anonymous"), 1);
        drop(second);
    }

    #[tokio::test]
    async fn vip_limit_admits_six_then_blocks() {
        let gate = ConcurrencyGate::new();

        let mut permits = Vec::new();
        for _ in 0..6 {
            let permit = timeout(Duration::from_millis(100), gate.acquire("vip@example.com", 6))
                .await
                .expect("acquire within limit should resolve immediately");
            permits.push(permit);
        }
        assert_eq!(gate.in_flight("vip@example.com"), 6);

        let seventh = timeout(Duration::from_millis(50), gate.acquire("vip@example.com", 6)).await;
        assert!(seventh.is_err(), "seventh acquire resolved over the limit");

        permits.pop();

        let seventh = timeout(Duration::from_millis(500), gate.acquire("vip@example.com", 6))
            .await
            .expect("acquire should resolve after a release");
        drop(seventh);
        drop(permits);
    }

    #[tokio::test]
    async fn identities_do_not_interfere() {
        let gate = ConcurrencyGate::new();

        let _a = gate.acquire("a@example.com", 1).await;
        let b = timeout(Duration::from_millis(100), gate.acquire("b@example.com", 1))
            .await
            .expect("different identity should not be blocked");
        drop(b);
    }

    #[tokio::test]
    async fn permit_drop_releases_on_error_paths() {
        let gate = ConcurrencyGate::new();

        {
            let _permit = gate.acquire("anonymous", 1).await;
            // Simulates the protected operation failing; the permit drops
            // with the scope.
        }
        assert_eq!(gate.in_flight("anonymous"), 0);

        // Slot is immediately available again
        let permit = timeout(Duration::from_millis(100), gate.acquire("anonymous", 1))
            .await
            .expect("slot should be free after scope exit");
        drop(permit);
    }

    #[tokio::test]
    async fn idle_entries_are_removed() {
        let gate = ConcurrencyGate::new();

        let permit = gate.acquire("transient@example.com", 3).await;
        drop(permit);

        let entries = gate.inner.entries.lock().unwrap();
        assert!(!entries.contains_key("transient@example.com"));
    }

    #[tokio::test]
    async fn cancelled_waiter_leaves_no_residue() {
        let gate = ConcurrencyGate::new();

        let permit = gate.acquire("anonymous", 1).await;
        // Waiter is abandoned by the timeout
        let _ = timeout(Duration::from_millis(50), gate.acquire("anonymous", 1)).await;
        drop(permit);

        let entries = gate.inner.entries.lock().unwrap();
        assert!(!entries.contains_key("anonymous"));
    }

    #[tokio::test]
    async fn queued_waiters_drain_in_turn() {
        let gate = ConcurrencyGate::new();
        let gate2 = gate.clone();

        let first = gate.acquire("anonymous", 1).await;

        let waiter = tokio::spawn(async move {
            let _permit = gate2.acquire("anonymous", 1).await;
        });

        // Give the waiter time to queue, then release
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(first);

        timeout(Duration::from_millis(500), waiter)
            .await
            .expect("waiter should complete after release")
            .unwrap();
        assert_eq!(gate.in_flight("anonymous"), 0);
    }
}
