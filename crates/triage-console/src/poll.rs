//! Periodic refresh of searches and group nodes.
//!
//! Each polled thing is registered under a [`PollKey`]. Starting a key replaces whatever
//! was polling under it, so there is at most one subscription per key. Poll tasks never
//! touch console state: they send [`PollEvent`]s over a channel the console drains, and
//! [`Poller::is_current`] tells the console whether an event still belongs to a live
//! subscription.

use std::{collections::HashMap, future::Future, time::Duration};

use tokio::{
    sync::mpsc::UnboundedSender,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use triage_query::GroupPath;

/// What a subscription refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PollKey {
    /// The flat search or the top-level aggregation.
    TopLevel,
    /// The alerts of one group node.
    Node(GroupPath),
}

/// A result produced by a poll task.
#[derive(Debug)]
pub struct PollEvent<T> {
    /// Key the subscription was registered under.
    pub key: PollKey,
    /// Subscription that produced the event.
    pub subscription: u64,
    /// What the fetch returned.
    pub payload: T,
}

/// A running subscription.
#[derive(Debug)]
struct PollHandle {
    /// Stops the task.
    token: CancellationToken,
    /// Identifies the subscription in events.
    subscription: u64,
    /// The spawned task.
    task: JoinHandle<()>,
}

/// Registry of periodic fetches.
#[derive(Debug)]
pub struct Poller<T> {
    /// Time between fetches for subscriptions started from now on.
    interval: Duration,
    /// Whether new subscriptions are refused.
    paused: bool,
    /// Last subscription id handed out.
    last_subscription: u64,
    /// Live subscriptions.
    handles: HashMap<PollKey, PollHandle>,
    /// Where poll tasks deliver results.
    events: UnboundedSender<PollEvent<T>>,
}

impl<T: Send + 'static> Poller<T> {
    /// Creates a poller delivering events to `events`.
    pub fn new(interval: Duration, events: UnboundedSender<PollEvent<T>>) -> Self {
        Self {
            interval,
            paused: false,
            last_subscription: 0,
            handles: HashMap::new(),
            events,
        }
    }

    /// Polls `fetch` under `key`, replacing any subscription already there.
    ///
    /// The first fetch happens one interval from now. Every result, failures included, is
    /// delivered as an event and the timer keeps going. Must be called from within a tokio
    /// runtime. Returns the new subscription id, or `None` while paused.
    pub fn start<F, Fut>(&mut self, key: PollKey, fetch: F) -> Option<u64>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        if self.paused {
            debug!(?key, "poller paused, not starting");
            return None;
        }
        self.stop(&key);

        self.last_subscription += 1;
        let subscription = self.last_subscription;
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let events = self.events.clone();
        let interval = self.interval;
        let task_key = key.clone();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let payload = tokio::select! {
                    () = cancelled.cancelled() => break,
                    payload = fetch() => payload,
                };
                let event = PollEvent {
                    key: task_key.clone(),
                    subscription,
                    payload,
                };
                if events.send(event).is_err() {
                    break;
                }
            }
        });

        debug!(?key, subscription, ?interval, "polling started");
        self.handles.insert(
            key,
            PollHandle {
                token,
                subscription,
                task,
            },
        );
        Some(subscription)
    }

    /// Stops polling `key`. Returns whether anything was polling.
    pub fn stop(&mut self, key: &PollKey) -> bool {
        match self.handles.remove(key) {
            Some(handle) => {
                handle.token.cancel();
                debug!(?key, subscription = handle.subscription, "polling stopped");
                true
            }
            None => false,
        }
    }

    /// Stops every subscription.
    pub fn stop_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.token.cancel();
        }
    }

    /// Stops every subscription whose key fails `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&PollKey) -> bool) {
        self.handles.retain(|key, handle| {
            let kept = keep(key);
            if !kept {
                handle.token.cancel();
            }
            kept
        });
    }

    /// Pausing stops everything and refuses new subscriptions until resumed.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        if paused {
            self.stop_all();
        }
    }

    /// Whether new subscriptions are refused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Changes the interval of subscriptions started from now on.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Interval of new subscriptions.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether `subscription` is the live subscription under `key`.
    pub fn is_current(&self, key: &PollKey, subscription: u64) -> bool {
        self.handles
            .get(key)
            .is_some_and(|handle| handle.subscription == subscription)
    }

    /// Whether something is polling under `key`.
    pub fn is_active(&self, key: &PollKey) -> bool {
        self.handles
            .get(key)
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Keys with a live subscription.
    pub fn keys(&self) -> Vec<&PollKey> {
        self.handles.keys().collect()
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        for handle in self.handles.values() {
            handle.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        future::{Ready, ready},
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;

    const INTERVAL: Duration = Duration::from_secs(10);

    fn poller() -> (Poller<usize>, UnboundedReceiver<PollEvent<usize>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Poller::new(INTERVAL, tx), rx)
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Ready<usize> + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let shared = Arc::clone(&count);
        let fetch = move || ready(shared.fetch_add(1, Ordering::SeqCst) + 1);
        (count, fetch)
    }

    fn node(key: &str) -> PollKey {
        PollKey::Node(GroupPath::root().child("source:type", key))
    }

    #[tokio::test(start_paused = true)]
    async fn first_fetch_waits_one_interval() {
        let (mut poller, mut rx) = poller();
        let (_, fetch) = counter();
        let started = Instant::now();

        let subscription = poller.start(PollKey::TopLevel, fetch).unwrap();
        let event = rx.recv().await.unwrap();

        assert_eq!(event.key, PollKey::TopLevel);
        assert_eq!(event.subscription, subscription);
        assert_eq!(event.payload, 1);
        assert!(started.elapsed() >= INTERVAL);
        assert!(poller.is_current(&PollKey::TopLevel, subscription));
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_polling_every_interval() {
        let (mut poller, mut rx) = poller();
        let (_, fetch) = counter();
        poller.start(PollKey::TopLevel, fetch).unwrap();

        let payloads = [
            rx.recv().await.unwrap().payload,
            rx.recv().await.unwrap().payload,
            rx.recv().await.unwrap().payload,
        ];
        assert_eq!(payloads, [1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_a_key_replaces_its_subscription() {
        let (mut poller, mut rx) = poller();
        let (first_count, first) = counter();
        let (_, second) = counter();

        let old = poller.start(node("bro"), first).unwrap();
        let new = poller.start(node("bro"), second).unwrap();

        assert_ne!(old, new);
        assert!(!poller.is_current(&node("bro"), old));
        assert_eq!(poller.keys().len(), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.subscription, new);
        time::sleep(INTERVAL * 3).await;
        assert_eq!(first_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_the_task() {
        let (mut poller, mut rx) = poller();
        let (count, fetch) = counter();
        poller.start(node("bro"), fetch).unwrap();

        assert!(poller.stop(&node("bro")));
        assert!(!poller.stop(&node("bro")));
        assert!(!poller.is_active(&node("bro")));

        time::sleep(INTERVAL * 3).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_everything_and_blocks_starts() {
        let (mut poller, _rx) = poller();
        let (_, a) = counter();
        let (_, b) = counter();
        let (_, c) = counter();
        poller.start(PollKey::TopLevel, a).unwrap();
        poller.start(node("bro"), b).unwrap();

        poller.set_paused(true);

        assert!(poller.keys().is_empty());
        assert!(poller.start(PollKey::TopLevel, c).is_none());

        poller.set_paused(false);
        let (_, d) = counter();
        assert!(poller.start(PollKey::TopLevel, d).is_some());
        assert!(poller.is_active(&PollKey::TopLevel));
    }

    #[tokio::test(start_paused = true)]
    async fn retain_keeps_matching_keys() {
        let (mut poller, _rx) = poller();
        for key in ["bro", "snort"] {
            let (_, fetch) = counter();
            poller.start(node(key), fetch).unwrap();
        }
        let (_, fetch) = counter();
        poller.start(PollKey::TopLevel, fetch).unwrap();

        poller.retain(|key| *key == PollKey::TopLevel || *key == node("snort"));

        assert!(poller.is_active(&node("snort")));
        assert!(!poller.is_active(&node("bro")));
        assert_eq!(poller.keys().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_change_applies_to_new_subscriptions() {
        let (mut poller, mut rx) = poller();
        poller.set_interval(Duration::from_secs(1));
        let (_, fetch) = counter();
        let started = Instant::now();

        poller.start(PollKey::TopLevel, fetch).unwrap();
        rx.recv().await.unwrap();

        assert!(started.elapsed() < INTERVAL);
        assert_eq!(poller.interval(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_poller_cancels_tasks() {
        let (mut poller, _rx) = poller();
        let (count, fetch) = counter();
        poller.start(PollKey::TopLevel, fetch).unwrap();

        drop(poller);
        time::sleep(INTERVAL * 3).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
