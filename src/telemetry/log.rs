//! Stdout log sink for pipeline telemetry.

use async_trait::async_trait;

use super::event::{PipelineEvent, PipelineEventKind};
use super::subscribe::Subscribe;

/// Base subscriber that logs pipeline events to stdout.
///
/// Useful for demos and debugging; production deployments plug their own
/// [`Subscribe`] implementations instead.
#[derive(Default)]
pub struct LogSubscriber;

#[async_trait]
impl Subscribe for LogSubscriber {
    async fn on_event(&self, e: &PipelineEvent) {
        match e.kind {
            PipelineEventKind::EventPublished => {
                println!("[published] topic={:?} id={:?}", e.topic, e.message_id);
            }
            PipelineEventKind::EventUnmatched => {
                println!(
                    "[unmatched] topic={:?} id={:?} (dropped)",
                    e.topic, e.message_id
                );
            }
            PipelineEventKind::EventDelivered => {
                println!(
                    "[delivered] sub={:?} queue={:?} id={:?}",
                    e.subscription, e.queue, e.message_id
                );
            }
            PipelineEventKind::DeliveryFailed => {
                println!(
                    "[delivery-failed] sub={:?} queue={:?} id={:?} err={:?}",
                    e.subscription, e.queue, e.message_id, e.error
                );
            }
            PipelineEventKind::MessageLeased => {
                println!(
                    "[leased] queue={:?} id={:?} receive_count={:?}",
                    e.queue, e.message_id, e.receive_count
                );
            }
            PipelineEventKind::MessageRedelivered => {
                println!(
                    "[redelivered] queue={:?} id={:?} receive_count={:?}",
                    e.queue, e.message_id, e.receive_count
                );
            }
            PipelineEventKind::MessageDeleted => {
                println!(
                    "[deleted] queue={:?} id={:?} receive_count={:?}",
                    e.queue, e.message_id, e.receive_count
                );
            }
            PipelineEventKind::HandlerFailed => {
                println!(
                    "[handler-failed] queue={:?} id={:?} receive_count={:?} err={:?}",
                    e.queue, e.message_id, e.receive_count, e.error
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
