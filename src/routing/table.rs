//! Compiled lookup structures for event delivery.
//!
//! Rebuilt from the full subscription set on every catalog change and
//! published as an immutable snapshot, so lookups take no locks.

use std::collections::HashMap;

use super::tree::{Params, PathTree, RouteError};
use crate::event::EventType;
use crate::function::FunctionId;
use crate::subscription::{Cors, Subscription, SubscriptionType};

/// Function and CORS settings behind a sync route.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncTarget {
    pub function_id: FunctionId,
    pub cors: Option<Cors>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AsyncKey {
    space: String,
    path: String,
    event_type: EventType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SyncKey {
    space: String,
    method: String,
    event_type: EventType,
}

#[derive(Debug, Default)]
pub struct RoutingTable {
    subscribers: HashMap<AsyncKey, Vec<FunctionId>>,
    sync_routes: HashMap<SyncKey, PathTree<SyncTarget>>,
}

impl RoutingTable {
    /// Compile subscriptions into a table. Conflicting sync routes are skipped.
    pub fn build<'a>(subscriptions: impl IntoIterator<Item = &'a Subscription>) -> Self {
        let mut table = Self::default();
        for sub in subscriptions {
            if let Err(e) = table.insert(sub) {
                tracing::warn!(
                    subscription_id = %sub.subscription_id,
                    error = %e,
                    "Skipping conflicting subscription"
                );
            }
        }

        for functions in table.subscribers.values_mut() {
            functions.sort();
            functions.dedup();
        }
        table
    }

    fn insert(&mut self, sub: &Subscription) -> Result<(), RouteError> {
        match sub.kind {
            SubscriptionType::Async => {
                self.subscribers
                    .entry(AsyncKey {
                        space: sub.space.clone(),
                        path: sub.path.clone(),
                        event_type: sub.event_type.clone(),
                    })
                    .or_default()
                    .push(sub.function_id.clone());
                Ok(())
            }
            SubscriptionType::Sync => self
                .sync_routes
                .entry(SyncKey {
                    space: sub.space.clone(),
                    method: sub.method.clone().unwrap_or_default(),
                    event_type: sub.event_type.clone(),
                })
                .or_default()
                .add_route(
                    &sub.path,
                    SyncTarget {
                        function_id: sub.function_id.clone(),
                        cors: sub.cors.clone(),
                    },
                ),
        }
    }

    /// Functions subscribed asynchronously to an event type on a path.
    pub fn subscribers(&self, space: &str, path: &str, event_type: &EventType) -> &[FunctionId] {
        let key = AsyncKey {
            space: space.to_string(),
            path: path.to_string(),
            event_type: event_type.clone(),
        };
        self.subscribers.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Sync target for a method and path, with captured path params.
    pub fn sync_target(
        &self,
        space: &str,
        method: &str,
        path: &str,
        event_type: &EventType,
    ) -> Option<(&SyncTarget, Params)> {
        let key = SyncKey {
            space: space.to_string(),
            method: method.to_ascii_uppercase(),
            event_type: event_type.clone(),
        };
        self.sync_routes.get(&key)?.resolve(path)
    }
}

/// Check whether a new sync subscription would collide with existing ones.
pub fn check_path_conflict<'a>(
    existing: impl IntoIterator<Item = &'a Subscription>,
    candidate: &Subscription,
) -> Result<(), RouteError> {
    let mut tree = PathTree::new();
    for sub in existing {
        if sub.kind == SubscriptionType::Sync
            && sub.space == candidate.space
            && sub.method == candidate.method
            && sub.event_type == candidate.event_type
        {
            tree.add_route(&sub.path, ())?;
        }
    }
    tree.add_route(&candidate.path, ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(mut sub: Subscription) -> Subscription {
        sub.normalize().unwrap();
        sub
    }

    #[test]
    fn test_async_lookup_by_space_path_and_type() {
        let subs = vec![
            normalized(Subscription::new_async("default", "user.created", "crm")),
            normalized(Subscription::new_async("default", "user.created", "mailer")),
            normalized(Subscription::new_async("other", "user.created", "crm")),
        ];
        let table = RoutingTable::build(&subs);

        let found = table.subscribers("default", "/", &"user.created".into());
        assert_eq!(found, &[FunctionId::new("crm"), FunctionId::new("mailer")]);
        assert!(table.subscribers("default", "/users", &"user.created".into()).is_empty());
        assert!(table.subscribers("default", "/", &"user.deleted".into()).is_empty());
    }

    #[test]
    fn test_sync_lookup_with_params() {
        let subs = vec![normalized(Subscription::new_sync(
            "default",
            "http.request",
            "users-get",
            "GET",
            "/users/:id",
        ))];
        let table = RoutingTable::build(&subs);

        let (target, params) = table
            .sync_target("default", "get", "/users/42", &EventType::http_request())
            .unwrap();
        assert_eq!(target.function_id.as_str(), "users-get");
        assert_eq!(params["id"], "42");
        assert!(table
            .sync_target("default", "POST", "/users/42", &EventType::http_request())
            .is_none());
    }

    #[test]
    fn test_path_conflict_detection() {
        let existing = vec![normalized(Subscription::new_sync(
            "default",
            "http.request",
            "users-get",
            "GET",
            "/users/:id",
        ))];

        let clash = normalized(Subscription::new_sync("default", "http.request", "x", "GET", "/users/:name"));
        assert!(check_path_conflict(&existing, &clash).is_err());

        let other_method = normalized(Subscription::new_sync("default", "http.request", "x", "DELETE", "/users/:name"));
        assert!(check_path_conflict(&existing, &other_method).is_ok());
    }
}
