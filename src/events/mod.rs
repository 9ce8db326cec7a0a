pub mod types;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

pub use types::AppEvent;

pub type Subscription = mpsc::UnboundedReceiver<AppEvent>;

/// Fire-and-forget fan-out. The desktop shell subscribes once and
/// forwards every event to the webview; tests subscribe directly.
/// Queues are unbounded so a slow consumer falls behind instead of
/// losing output lines.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<AppEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: AppEvent) {
        tracing::trace!(channel = event.channel(), "emit");
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        // No subscribers just means no window is listening yet.
        match subscribers.split_last() {
            None => tracing::debug!("event dropped, no subscribers"),
            Some((last, rest)) => {
                for tx in rest {
                    let _ = tx.send(event.clone());
                }
                let _ = last.send(event);
            }
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn setup_progress(&self, message: impl Into<String>) {
        self.emit(AppEvent::SetupProgress(types::SetupProgress {
            message: message.into(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.setup_progress("one");
        bus.setup_progress("two");

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.channel(), "setup:progress");
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::json!({"message": "one"})
        );
        assert_eq!(
            serde_json::to_value(&second).unwrap(),
            serde_json::json!({"message": "two"})
        );
    }

    #[tokio::test]
    async fn test_slow_subscriber_loses_nothing() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        for i in 0..5000 {
            bus.setup_progress(format!("line {}", i));
        }
        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 5000);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);
        bus.setup_progress("after drop");
        assert!(bus.subscribers.lock().is_empty());
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.setup_progress("nobody listening");
    }

    #[test]
    fn test_task_payload_is_camel_case() {
        let event = AppEvent::TaskOutput(types::TaskOutput {
            project_id: "p".into(),
            task_id: "t".into(),
            output: "hello".into(),
        });
        assert_eq!(event.channel(), "task:output");
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"projectId": "p", "taskId": "t", "output": "hello"})
        );
    }
}
