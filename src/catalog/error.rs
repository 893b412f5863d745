//! Catalog errors.

use crate::event::EventType;
use crate::function::FunctionId;
use crate::subscription::SubscriptionId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("Event Type \"{0}\" not found.")]
    EventTypeNotFound(EventType),

    #[error("Event Type \"{0}\" already exists.")]
    EventTypeAlreadyExists(EventType),

    #[error("Event Type \"{0}\" cannot be deleted because there are subscriptions using it.")]
    EventTypeHasSubscriptions(EventType),

    #[error("Function \"{0}\" not found.")]
    FunctionNotFound(FunctionId),

    #[error("Function \"{0}\" already registered.")]
    FunctionAlreadyRegistered(FunctionId),

    #[error("Function \"{0}\" cannot be deleted because it's subscribed to a least one event.")]
    FunctionHasSubscriptions(FunctionId),

    #[error("Subscription \"{0}\" not found.")]
    SubscriptionNotFound(SubscriptionId),

    #[error("Subscription \"{0}\" already exists.")]
    SubscriptionAlreadyExists(SubscriptionId),

    #[error("Invalid update. '{0}' of existing subscription cannot be updated.")]
    InvalidSubscriptionUpdate(&'static str),

    #[error("Subscription path conflict: {0}")]
    PathConflict(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
