//! # Dispatcher: poll loop driving one handler from one queue.
//!
//! Runs continuously against one [`DurableQueue`] until cancelled:
//!
//! ```text
//! loop {
//!   ├─► receive(batch_size, wait_time)      (long-poll, cancellable)
//!   └─► for each leased message:
//!         ├─► acquire semaphore permit       (concurrency ceiling)
//!         ├─► publish MessageLeased / MessageRedelivered
//!         ├─► invoke handler (panics caught)
//!         │     ├─ Ok  ─► delete(token) ─► publish MessageDeleted
//!         │     └─ Err ─► abandon        ─► publish HandlerFailed
//!         └─► release permit
//! }
//! ```
//!
//! ## Rules
//! - Invocations run concurrently, bounded by the configured ceiling
//!   (`max_concurrent = 0` means unlimited).
//! - Concurrent invocations operate on independent leases; the queue's
//!   leasing rule guarantees they never contend on a single message.
//! - A failed or panicked handler leaves its message un-deleted; lease
//!   expiry redelivers it with an incremented receive count. The fixed
//!   visibility timeout is the only backoff.
//! - Lease expiry is not a cancellation signal: a still-running handler is
//!   not interrupted when its lease lapses, so a late success can coincide
//!   with redelivery — handlers must be idempotent.
//! - On shutdown, messages leased but not yet invoked simply lapse back to
//!   visible; in-flight invocations are drained before `run` returns.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::dispatch::handler::{Delivery, HandlerRef};
use crate::error::HandlerError;
use crate::queue::{DurableQueue, LeasedMessage};
use crate::telemetry::{Bus, PipelineEvent, PipelineEventKind};

/// Poll/invoke/settle loop for one queue and one handler.
///
/// ## Example
/// ```
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use bigfan::{Bus, Config, Delivery, Dispatcher, DurableQueue, HandlerError, HandlerFn};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queue = DurableQueue::new("created-queue", Duration::from_secs(300));
/// let handler = HandlerFn::arc("acker", |_d: Delivery| async move {
///     Ok::<_, HandlerError>(())
/// });
///
/// let dispatcher = Dispatcher::new(queue, handler, &Config::default(), Bus::default());
/// let ctx = CancellationToken::new();
/// let handle = dispatcher.spawn(ctx.clone());
///
/// ctx.cancel();
/// handle.await.unwrap();
/// # }
/// ```
pub struct Dispatcher {
    queue: Arc<DurableQueue>,
    handler: HandlerRef,
    bus: Bus,
    batch_size: usize,
    wait_time: std::time::Duration,
    semaphore: Option<Arc<Semaphore>>,
}

impl Dispatcher {
    /// Creates a dispatcher over one queue and one handler.
    ///
    /// Takes `batch_size`, `wait_time`, and `max_concurrent` from `cfg`;
    /// `max_concurrent = 0` disables the ceiling.
    pub fn new(queue: Arc<DurableQueue>, handler: HandlerRef, cfg: &Config, bus: Bus) -> Self {
        let semaphore =
            (cfg.max_concurrent > 0).then(|| Arc::new(Semaphore::new(cfg.max_concurrent)));
        Self {
            queue,
            handler,
            bus,
            batch_size: cfg.batch_size.max(1),
            wait_time: cfg.wait_time,
            semaphore,
        }
    }

    /// Spawns [`Dispatcher::run`] on the runtime.
    pub fn spawn(self, ctx: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run(ctx).await })
    }

    /// Runs the poll loop until `ctx` is cancelled.
    ///
    /// Cancellation is checked at safe points (between polls and before
    /// each invocation); in-flight handler invocations are awaited before
    /// returning, while leased-but-uninvoked messages are left to lapse
    /// back to visible.
    pub async fn run(&self, ctx: CancellationToken) {
        let mut invocations: JoinSet<()> = JoinSet::new();

        'poll: while !ctx.is_cancelled() {
            let batch = tokio::select! {
                _ = ctx.cancelled() => break 'poll,
                batch = self.queue.receive(self.batch_size, self.wait_time) => batch,
            };

            for message in batch {
                let permit = match &self.semaphore {
                    Some(sem) => {
                        let acquired = tokio::select! {
                            _ = ctx.cancelled() => break 'poll,
                            permit = Arc::clone(sem).acquire_owned() => permit,
                        };
                        match acquired {
                            Ok(permit) => Some(permit),
                            // Closed semaphore means shutdown in progress.
                            Err(_) => break 'poll,
                        }
                    }
                    None => None,
                };
                self.spawn_invocation(&mut invocations, message, permit);
            }

            // Reap finished invocations so the set never grows unbounded.
            while invocations.try_join_next().is_some() {}
        }

        while invocations.join_next().await.is_some() {}
    }

    /// Spawns one handler invocation holding its permit for the duration.
    fn spawn_invocation(
        &self,
        invocations: &mut JoinSet<()>,
        message: LeasedMessage,
        permit: Option<tokio::sync::OwnedSemaphorePermit>,
    ) {
        let queue = Arc::clone(&self.queue);
        let handler = Arc::clone(&self.handler);
        let bus = self.bus.clone();

        invocations.spawn(async move {
            let _permit = permit;

            let kind = if message.is_redelivery() {
                PipelineEventKind::MessageRedelivered
            } else {
                PipelineEventKind::MessageLeased
            };
            bus.publish(
                PipelineEvent::now(kind)
                    .with_queue(queue.name())
                    .with_message(&message.event_id)
                    .with_receive_count(message.receive_count),
            );

            let delivery = Delivery {
                body: message.body.clone(),
                receive_count: message.receive_count,
            };
            let outcome = std::panic::AssertUnwindSafe(handler.handle(delivery))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic_err| {
                    Err(HandlerError::Panic {
                        error: panic_text(panic_err.as_ref()),
                    })
                });

            match outcome {
                Ok(()) => {
                    // A false delete means the lease lapsed mid-invocation;
                    // the message will be processed again (at-least-once).
                    if queue.delete(&message.token).await {
                        bus.publish(
                            PipelineEvent::now(PipelineEventKind::MessageDeleted)
                                .with_queue(queue.name())
                                .with_message(&message.event_id)
                                .with_receive_count(message.receive_count),
                        );
                    }
                }
                Err(err) => {
                    bus.publish(
                        PipelineEvent::now(PipelineEventKind::HandlerFailed)
                            .with_queue(queue.name())
                            .with_message(&message.event_id)
                            .with_receive_count(message.receive_count)
                            .with_error(err.as_message()),
                    );
                }
            }
        });
    }
}

/// Renders a panic payload as text.
fn panic_text(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handler::HandlerFn;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time;

    const VIS: Duration = Duration::from_secs(30);

    fn test_config() -> Config {
        Config {
            visibility_timeout: VIS,
            batch_size: 10,
            wait_time: Duration::from_millis(100),
            max_concurrent: 0,
            bus_capacity: 64,
        }
    }

    async fn wait_until_empty(queue: &Arc<DurableQueue>) {
        // Paused-clock tests: sleeps auto-advance, so this terminates fast
        // even when a retry has to sit out a full visibility timeout.
        for _ in 0..200 {
            if queue.is_empty().await {
                return;
            }
            time::sleep(Duration::from_millis(500)).await;
        }
        panic!("queue did not drain: {} left", queue.len().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_deletes_message() {
        let queue = DurableQueue::new("q", VIS);
        queue
            .enqueue("ev-1".into(), Bytes::from_static(b"a"))
            .await
            .unwrap();

        let handled = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&handled);
        let handler = HandlerFn::arc("acker", move |_d: Delivery| {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let ctx = CancellationToken::new();
        let handle = Dispatcher::new(Arc::clone(&queue), handler, &test_config(), Bus::default())
            .spawn(ctx.clone());

        wait_until_empty(&queue).await;
        ctx.cancel();
        handle.await.unwrap();

        assert_eq!(handled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_then_success_processes_exactly_once_terminally() {
        let queue = DurableQueue::new("q", VIS);
        queue
            .enqueue("ev-1".into(), Bytes::from_static(b"a"))
            .await
            .unwrap();

        let successes = Arc::new(AtomicUsize::new(0));
        let attempts = Arc::new(AtomicUsize::new(0));
        let (s, a) = (Arc::clone(&successes), Arc::clone(&attempts));
        let handler = HandlerFn::arc("flaky", move |_d: Delivery| {
            let (s, a) = (Arc::clone(&s), Arc::clone(&a));
            async move {
                if a.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(HandlerError::fail("first attempt always fails"));
                }
                s.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let ctx = CancellationToken::new();
        let handle = Dispatcher::new(Arc::clone(&queue), handler, &test_config(), Bus::default())
            .spawn(ctx.clone());

        wait_until_empty(&queue).await;
        ctx.cancel();
        handle.await.unwrap();

        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert!(attempts.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_is_treated_as_failure() {
        let queue = DurableQueue::new("q", VIS);
        queue
            .enqueue("ev-1".into(), Bytes::from_static(b"a"))
            .await
            .unwrap();

        let attempts = Arc::new(AtomicUsize::new(0));
        let a = Arc::clone(&attempts);
        let handler = HandlerFn::arc("panicky", move |_d: Delivery| {
            let a = Arc::clone(&a);
            async move {
                if a.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("boom");
                }
                Ok(())
            }
        });

        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let ctx = CancellationToken::new();
        let handle = Dispatcher::new(Arc::clone(&queue), handler, &test_config(), bus)
            .spawn(ctx.clone());

        wait_until_empty(&queue).await;
        ctx.cancel();
        handle.await.unwrap();

        // The panic surfaced as a HandlerFailed telemetry event.
        let mut saw_handler_failed = false;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == PipelineEventKind::HandlerFailed {
                assert!(ev.error.as_deref().unwrap_or_default().contains("boom"));
                saw_handler_failed = true;
            }
        }
        assert!(saw_handler_failed);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_ceiling_is_respected() {
        let queue = DurableQueue::new("q", VIS);
        for i in 0..8 {
            queue
                .enqueue(format!("ev-{i}"), Bytes::from_static(b"a"))
                .await
                .unwrap();
        }

        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (cur, pk) = (Arc::clone(&current), Arc::clone(&peak));
        let handler = HandlerFn::arc("slow", move |_d: Delivery| {
            let (cur, pk) = (Arc::clone(&cur), Arc::clone(&pk));
            async move {
                let now = cur.fetch_add(1, Ordering::SeqCst) + 1;
                pk.fetch_max(now, Ordering::SeqCst);
                time::sleep(Duration::from_millis(200)).await;
                cur.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let mut cfg = test_config();
        cfg.max_concurrent = 2;

        let ctx = CancellationToken::new();
        let handle = Dispatcher::new(Arc::clone(&queue), handler, &cfg, Bus::default())
            .spawn(ctx.clone());

        wait_until_empty(&queue).await;
        ctx.cancel();
        handle.await.unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 2, "peak={}", peak.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_redelivery_event_carries_receive_count() {
        let queue = DurableQueue::new("q", VIS);
        queue
            .enqueue("ev-1".into(), Bytes::from_static(b"a"))
            .await
            .unwrap();

        let attempts = Arc::new(AtomicUsize::new(0));
        let a = Arc::clone(&attempts);
        let handler = HandlerFn::arc("flaky", move |d: Delivery| {
            let a = Arc::clone(&a);
            async move {
                if a.fetch_add(1, Ordering::SeqCst) == 0 {
                    assert!(!d.is_redelivery());
                    return Err(HandlerError::fail("retry me"));
                }
                assert!(d.is_redelivery());
                Ok(())
            }
        });

        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let ctx = CancellationToken::new();
        let handle = Dispatcher::new(Arc::clone(&queue), handler, &test_config(), bus)
            .spawn(ctx.clone());

        wait_until_empty(&queue).await;
        ctx.cancel();
        handle.await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push((ev.kind, ev.receive_count));
        }
        assert!(kinds.contains(&(PipelineEventKind::MessageLeased, Some(1))));
        assert!(kinds.contains(&(PipelineEventKind::HandlerFailed, Some(1))));
        assert!(kinds.contains(&(PipelineEventKind::MessageRedelivered, Some(2))));
        assert!(kinds.contains(&(PipelineEventKind::MessageDeleted, Some(2))));
    }
}
