//! Model subscriber trait

use crate::events::ModelEvent;

/// Trait for components that need to respond to model changes
///
/// Subscribers are held weakly; dropping the last `Arc` unsubscribes.
pub trait ModelSubscriber: Send + Sync {
    /// Called once per model event, on the model thread
    fn on_model_event(&self, event: &ModelEvent);
}

/// Helper struct for creating subscribers from closures
pub struct FnSubscriber<F> {
    handler: F,
}

impl<F> ModelSubscriber for FnSubscriber<F>
where
    F: Fn(&ModelEvent) + Send + Sync,
{
    fn on_model_event(&self, event: &ModelEvent) {
        (self.handler)(event);
    }
}

/// Create a subscriber from a closure
pub fn subscriber_from_fn<F>(f: F) -> FnSubscriber<F>
where
    F: Fn(&ModelEvent) + Send + Sync + 'static,
{
    FnSubscriber { handler: f }
}
