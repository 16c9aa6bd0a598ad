//! Event multiplexer over a single inbound stream.
//!
//! Every live subscription has a filter and a delivery lane: one-shot
//! (resolves once, then leaves the table) or stream (stays until dropped).
//! A published event reaches every matching subscription.
//!
//! One-shot waits may race a deadline. Each wait owns a single resolved
//! flag; whichever side (event or timer) flips it first wins, and the other
//! side backs off. Nothing else is shared between the two paths.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use {
    tokio::{
        sync::{mpsc, oneshot},
        time::{Instant, sleep_until},
    },
    tracing::trace,
};

type Filter<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

enum Delivery<E> {
    Once {
        resolved: Arc<AtomicBool>,
        tx: Option<oneshot::Sender<E>>,
    },
    Stream(mpsc::UnboundedSender<E>),
}

struct Subscription<E> {
    filter: Filter<E>,
    delivery: Delivery<E>,
}

/// How a time-bounded wait ended. Exactly one of the two is ever produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<E> {
    Matched(E),
    TimedOut,
}

pub struct EventBus<E> {
    next_id: AtomicU64,
    subscriptions: Mutex<HashMap<u64, Subscription<E>>>,
}

impl<E> EventBus<E> {
    /// Live subscriptions, one-shot and stream.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn insert(&self, filter: Filter<E>, delivery: Delivery<E>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Subscription { filter, delivery });
        id
    }

    fn unsubscribe(&self, id: u64) {
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }
}

impl<E> EventBus<E>
where
    E: Clone + Send + 'static,
{
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            subscriptions: Mutex::new(HashMap::new()),
        })
    }

    /// Deliver `event` to every matching subscription. Returns how many
    /// received it.
    pub fn publish(&self, event: &E) -> usize {
        let mut delivered = 0;
        let mut subscriptions = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        subscriptions.retain(|_, sub| {
            if !(sub.filter)(event) {
                return true;
            }
            match &mut sub.delivery {
                Delivery::Once { resolved, tx } => {
                    // Lost to the timer: drop the entry without delivering.
                    if resolved
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                        && let Some(tx) = tx.take()
                        && tx.send(event.clone()).is_ok()
                    {
                        delivered += 1;
                    }
                    false
                },
                Delivery::Stream(tx) => {
                    if tx.send(event.clone()).is_ok() {
                        delivered += 1;
                        true
                    } else {
                        false
                    }
                },
            }
        });
        trace!(delivered, live = subscriptions.len(), "event published");
        delivered
    }

    /// Register a one-shot wait for the first event matching `filter`.
    ///
    /// The subscription is live as soon as this returns, so events published
    /// afterwards are never missed even if the wait is polled later.
    pub fn wait_for(
        self: &Arc<Self>,
        filter: impl Fn(&E) -> bool + Send + Sync + 'static,
    ) -> PendingWait<E> {
        let resolved = Arc::new(AtomicBool::new(false));
        let (tx, rx) = oneshot::channel();
        let id = self.insert(Box::new(filter), Delivery::Once {
            resolved: Arc::clone(&resolved),
            tx: Some(tx),
        });
        PendingWait {
            id,
            bus: Arc::clone(self),
            resolved,
            rx,
        }
    }

    /// Register a repeating subscription.
    pub fn subscribe(
        self: &Arc<Self>,
        filter: impl Fn(&E) -> bool + Send + Sync + 'static,
    ) -> EventStream<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.insert(Box::new(filter), Delivery::Stream(tx));
        EventStream {
            id,
            bus: Arc::clone(self),
            rx,
        }
    }
}

/// A registered one-shot wait. Dropping it unsubscribes.
pub struct PendingWait<E> {
    id: u64,
    bus: Arc<EventBus<E>>,
    resolved: Arc<AtomicBool>,
    rx: oneshot::Receiver<E>,
}

impl<E> PendingWait<E> {
    /// Wait with no deadline. `None` only if the bus dropped the entry.
    pub async fn wait(mut self) -> Option<E> {
        (&mut self.rx).await.ok()
    }

    /// Race the first matching event against `deadline`.
    pub async fn until(mut self, deadline: Instant) -> WaitOutcome<E> {
        let received = tokio::select! {
            biased;
            received = &mut self.rx => Some(received),
            () = sleep_until(deadline) => None,
        };
        match received {
            Some(Ok(event)) => WaitOutcome::Matched(event),
            Some(Err(_)) => {
                sleep_until(deadline).await;
                self.resolved.store(true, Ordering::Release);
                WaitOutcome::TimedOut
            },
            None => {
                if self
                    .resolved
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    return WaitOutcome::TimedOut;
                }
                // The event side flipped the flag first; its value is
                // already in the channel.
                match (&mut self.rx).await {
                    Ok(event) => WaitOutcome::Matched(event),
                    Err(_) => WaitOutcome::TimedOut,
                }
            },
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }
}

impl<E> Drop for PendingWait<E> {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

/// A repeating subscription. Dropping it unsubscribes.
pub struct EventStream<E> {
    id: u64,
    bus: Arc<EventBus<E>>,
    rx: mpsc::UnboundedReceiver<E>,
}

impl<E> EventStream<E> {
    pub async fn recv(&mut self) -> Option<E> {
        self.rx.recv().await
    }
}

impl<E> Drop for EventStream<E> {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::time::Duration};

    #[tokio::test]
    async fn one_shot_resolves_once_and_leaves_the_table() {
        let bus = EventBus::<u32>::new();
        let wait = bus.wait_for(|e| *e > 10);
        assert_eq!(bus.subscription_count(), 1);

        assert_eq!(bus.publish(&5), 0);
        assert_eq!(bus.publish(&11), 1);
        assert_eq!(bus.publish(&12), 0);
        assert_eq!(bus.subscription_count(), 0);

        assert_eq!(wait.wait().await, Some(11));
    }

    #[tokio::test]
    async fn every_matching_subscription_receives_the_event() {
        let bus = EventBus::<u32>::new();
        let a = bus.wait_for(|e| *e == 1);
        let b = bus.wait_for(|e| *e == 1);
        let mut stream = bus.subscribe(|e| e % 2 == 1);

        assert_eq!(bus.publish(&1), 3);
        assert_eq!(bus.publish(&3), 1);
        assert_eq!(a.wait().await, Some(1));
        assert_eq!(b.wait().await, Some(1));
        assert_eq!(stream.recv().await, Some(1));
        assert_eq!(stream.recv().await, Some(3));
        assert_eq!(bus.subscription_count(), 1);
    }

    #[tokio::test]
    async fn dropping_handles_unsubscribes() {
        let bus = EventBus::<u32>::new();
        let wait = bus.wait_for(|_| true);
        let stream = bus.subscribe(|_| true);
        assert_eq!(bus.subscription_count(), 2);
        drop(wait);
        drop(stream);
        assert_eq!(bus.subscription_count(), 0);
        assert_eq!(bus.publish(&1), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_wins_when_nothing_matches() {
        let bus = EventBus::<u32>::new();
        let wait = bus.wait_for(|e| *e == 7);
        let deadline = Instant::now() + Duration::from_secs(30);
        assert_eq!(wait.until(deadline).await, WaitOutcome::TimedOut);
        assert_eq!(bus.subscription_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_race_has_exactly_one_winner() {
        let bus = EventBus::<u32>::new();
        for trial in 0..50_u32 {
            for before_deadline in [true, false] {
                let wait = bus.wait_for(move |e| *e == trial);
                let deadline = Instant::now() + Duration::from_secs(30);
                let waiter = tokio::spawn(wait.until(deadline));

                let fire_at = if before_deadline {
                    deadline - Duration::from_millis(1)
                } else {
                    deadline + Duration::from_millis(1)
                };
                sleep_until(fire_at).await;
                let delivered = bus.publish(&trial);

                match waiter.await.unwrap() {
                    WaitOutcome::Matched(event) => {
                        assert!(before_deadline, "trial {trial}: late event matched");
                        assert_eq!(event, trial);
                        assert_eq!(delivered, 1);
                    },
                    WaitOutcome::TimedOut => {
                        assert!(!before_deadline, "trial {trial}: early event timed out");
                        assert_eq!(delivered, 0);
                    },
                }
                assert_eq!(bus.subscription_count(), 0);
            }
        }
    }

    #[tokio::test]
    async fn flag_is_set_after_resolution() {
        let bus = EventBus::<u32>::new();
        let wait = bus.wait_for(|_| true);
        assert!(!wait.is_resolved());
        bus.publish(&1);
        assert!(wait.is_resolved());
    }
}
