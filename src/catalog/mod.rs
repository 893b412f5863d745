//! Configuration store for event types, functions and subscriptions.
//!
//! # Data Flow
//! ```text
//! Config API / config file seed
//!     → Catalog (validate, referential checks)
//!     → DashMap per entity, keyed by (space, id)
//!     → RoutingTable rebuilt and swapped in (ArcSwap)
//!     → router and dispatcher read the snapshot lock-free
//! ```
//!
//! # Design Decisions
//! - Writes are serialized by a single mutex so referential checks and the
//!   routing rebuild see a consistent view
//! - Reads never take the write mutex

pub mod error;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::event::EventType;
use crate::function::{is_identifier, Function, FunctionId, Provider};
use crate::routing::table::check_path_conflict;
use crate::routing::RoutingTable;
use crate::subscription::{Subscription, SubscriptionId};

pub use error::CatalogError;

/// A registered event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTypeDefinition {
    #[serde(default)]
    pub space: String,
    pub name: EventType,
}

/// Entities to register at startup or on config reload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub event_types: Vec<EventTypeDefinition>,
    pub functions: Vec<Function>,
    pub subscriptions: Vec<Subscription>,
}

/// Entity counts across all spaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub event_types: usize,
    pub functions: usize,
    pub subscriptions: usize,
}

type Key<T> = (String, T);

#[derive(Default)]
pub struct Catalog {
    event_types: DashMap<Key<EventType>, EventTypeDefinition>,
    functions: DashMap<Key<FunctionId>, Function>,
    subscriptions: DashMap<Key<SubscriptionId>, Subscription>,
    routes: ArcSwap<RoutingTable>,
    writes: Mutex<()>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current routing snapshot.
    pub fn routes(&self) -> Arc<RoutingTable> {
        self.routes.load_full()
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            event_types: self.event_types.len(),
            functions: self.functions.len(),
            subscriptions: self.subscriptions.len(),
        }
    }

    // --- Event types ---

    pub fn create_event_type(&self, def: EventTypeDefinition) -> Result<EventTypeDefinition, CatalogError> {
        validate_space(&def.space)?;
        if def.name.as_str().is_empty() {
            return Err(CatalogError::Validation("event type name is required".into()));
        }
        if def.name.is_system() {
            return Err(CatalogError::Validation(format!(
                "event type {:?} uses the reserved system prefix",
                def.name.as_str()
            )));
        }

        let _guard = self.write_lock();
        let key = (def.space.clone(), def.name.clone());
        if self.event_types.contains_key(&key) {
            return Err(CatalogError::EventTypeAlreadyExists(def.name));
        }
        self.event_types.insert(key, def.clone());

        tracing::debug!(space = %def.space, name = %def.name, "Event type created");
        Ok(def)
    }

    pub fn get_event_type(&self, space: &str, name: &EventType) -> Result<EventTypeDefinition, CatalogError> {
        self.event_types
            .get(&(space.to_string(), name.clone()))
            .map(|r| r.value().clone())
            .ok_or_else(|| CatalogError::EventTypeNotFound(name.clone()))
    }

    pub fn list_event_types(&self, space: &str) -> Vec<EventTypeDefinition> {
        let mut list: Vec<_> = self
            .event_types
            .iter()
            .filter(|r| r.key().0 == space)
            .map(|r| r.value().clone())
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    pub fn delete_event_type(&self, space: &str, name: &EventType) -> Result<(), CatalogError> {
        let _guard = self.write_lock();
        self.get_event_type(space, name)?;

        let in_use = self
            .subscriptions
            .iter()
            .any(|r| r.value().space == space && &r.value().event_type == name);
        if in_use {
            return Err(CatalogError::EventTypeHasSubscriptions(name.clone()));
        }

        self.event_types.remove(&(space.to_string(), name.clone()));
        tracing::debug!(space = %space, name = %name, "Event type deleted");
        Ok(())
    }

    // --- Functions ---

    pub fn register_function(&self, function: Function) -> Result<Function, CatalogError> {
        validate_function(&function)?;

        let _guard = self.write_lock();
        let key = (function.space.clone(), function.function_id.clone());
        if self.functions.contains_key(&key) {
            return Err(CatalogError::FunctionAlreadyRegistered(function.function_id));
        }
        self.functions.insert(key, function.clone());

        tracing::debug!(
            space = %function.space,
            function_id = %function.function_id,
            "Function registered"
        );
        Ok(function)
    }

    pub fn get_function(&self, space: &str, id: &FunctionId) -> Result<Function, CatalogError> {
        self.functions
            .get(&(space.to_string(), id.clone()))
            .map(|r| r.value().clone())
            .ok_or_else(|| CatalogError::FunctionNotFound(id.clone()))
    }

    pub fn list_functions(&self, space: &str) -> Vec<Function> {
        let mut list: Vec<_> = self
            .functions
            .iter()
            .filter(|r| r.key().0 == space)
            .map(|r| r.value().clone())
            .collect();
        list.sort_by(|a, b| a.function_id.cmp(&b.function_id));
        list
    }

    /// Replace the provider of an existing function.
    pub fn update_function(&self, space: &str, id: &FunctionId, provider: Provider) -> Result<Function, CatalogError> {
        let updated = Function {
            space: space.to_string(),
            function_id: id.clone(),
            provider,
        };
        validate_function(&updated)?;

        let _guard = self.write_lock();
        let key = (space.to_string(), id.clone());
        if !self.functions.contains_key(&key) {
            return Err(CatalogError::FunctionNotFound(id.clone()));
        }
        self.functions.insert(key, updated.clone());

        tracing::debug!(space = %space, function_id = %id, "Function updated");
        Ok(updated)
    }

    pub fn delete_function(&self, space: &str, id: &FunctionId) -> Result<(), CatalogError> {
        let _guard = self.write_lock();
        self.get_function(space, id)?;

        let in_use = self
            .subscriptions
            .iter()
            .any(|r| r.value().space == space && &r.value().function_id == id);
        if in_use {
            return Err(CatalogError::FunctionHasSubscriptions(id.clone()));
        }

        self.functions.remove(&(space.to_string(), id.clone()));
        tracing::debug!(space = %space, function_id = %id, "Function deleted");
        Ok(())
    }

    // --- Subscriptions ---

    pub fn create_subscription(&self, mut sub: Subscription) -> Result<Subscription, CatalogError> {
        validate_space(&sub.space)?;
        sub.normalize().map_err(CatalogError::Validation)?;

        let _guard = self.write_lock();
        let key = (sub.space.clone(), sub.subscription_id.clone());
        if self.subscriptions.contains_key(&key) {
            return Err(CatalogError::SubscriptionAlreadyExists(sub.subscription_id));
        }

        if sub.kind == crate::subscription::SubscriptionType::Sync {
            let existing: Vec<Subscription> = self.subscriptions.iter().map(|r| r.value().clone()).collect();
            check_path_conflict(&existing, &sub).map_err(|e| CatalogError::PathConflict(e.to_string()))?;
        }

        // Built-in types are never registered.
        if !sub.event_type.is_http_request() && !sub.event_type.is_system() {
            self.get_event_type(&sub.space, &sub.event_type)?;
        }
        self.get_function(&sub.space, &sub.function_id)?;

        self.subscriptions.insert(key, sub.clone());
        self.rebuild_routes();

        tracing::debug!(
            space = %sub.space,
            subscription_id = %sub.subscription_id,
            event_type = %sub.event_type,
            function_id = %sub.function_id,
            "Subscription created"
        );
        Ok(sub)
    }

    pub fn get_subscription(&self, space: &str, id: &SubscriptionId) -> Result<Subscription, CatalogError> {
        self.subscriptions
            .get(&(space.to_string(), id.clone()))
            .map(|r| r.value().clone())
            .ok_or_else(|| CatalogError::SubscriptionNotFound(id.clone()))
    }

    pub fn list_subscriptions(&self, space: &str) -> Vec<Subscription> {
        let mut list: Vec<_> = self
            .subscriptions
            .iter()
            .filter(|r| r.key().0 == space)
            .map(|r| r.value().clone())
            .collect();
        list.sort_by(|a, b| a.subscription_id.cmp(&b.subscription_id));
        list
    }

    /// Update a subscription. Only the function and CORS settings may change.
    pub fn update_subscription(
        &self,
        space: &str,
        id: &SubscriptionId,
        mut sub: Subscription,
    ) -> Result<Subscription, CatalogError> {
        sub.space = space.to_string();
        sub.normalize().map_err(CatalogError::Validation)?;

        let _guard = self.write_lock();
        let old = self.get_subscription(space, id)?;

        if sub.kind != old.kind {
            return Err(CatalogError::InvalidSubscriptionUpdate("Type"));
        }
        if sub.event_type != old.event_type {
            return Err(CatalogError::InvalidSubscriptionUpdate("EventType"));
        }
        if sub.path != old.path {
            return Err(CatalogError::InvalidSubscriptionUpdate("Path"));
        }
        if sub.method != old.method {
            return Err(CatalogError::InvalidSubscriptionUpdate("Method"));
        }
        if old.kind == crate::subscription::SubscriptionType::Async && sub.function_id != old.function_id {
            return Err(CatalogError::InvalidSubscriptionUpdate("FunctionID"));
        }

        self.get_function(space, &sub.function_id)?;
        sub.subscription_id = old.subscription_id.clone();

        self.subscriptions
            .insert((space.to_string(), old.subscription_id), sub.clone());
        self.rebuild_routes();

        tracing::debug!(space = %space, subscription_id = %sub.subscription_id, "Subscription updated");
        Ok(sub)
    }

    pub fn delete_subscription(&self, space: &str, id: &SubscriptionId) -> Result<(), CatalogError> {
        let _guard = self.write_lock();
        self.subscriptions
            .remove(&(space.to_string(), id.clone()))
            .ok_or_else(|| CatalogError::SubscriptionNotFound(id.clone()))?;
        self.rebuild_routes();

        tracing::debug!(space = %space, subscription_id = %id, "Subscription deleted");
        Ok(())
    }

    // --- Seeding ---

    /// Register everything in the seed, filling empty spaces with `default_space`.
    ///
    /// Existing event types and subscriptions are kept, existing functions get
    /// the seeded provider. Returns the errors of entries that were rejected.
    pub fn apply_seed(&self, seed: &Seed, default_space: &str) -> Vec<CatalogError> {
        let with_space = |space: &str| {
            if space.is_empty() { default_space.to_string() } else { space.to_string() }
        };
        let mut errors = Vec::new();

        for def in &seed.event_types {
            let def = EventTypeDefinition { space: with_space(&def.space), ..def.clone() };
            match self.create_event_type(def) {
                Ok(_) | Err(CatalogError::EventTypeAlreadyExists(_)) => {}
                Err(e) => errors.push(e),
            }
        }

        for function in &seed.functions {
            let function = Function { space: with_space(&function.space), ..function.clone() };
            let result = match self.register_function(function.clone()) {
                Err(CatalogError::FunctionAlreadyRegistered(_)) => self
                    .update_function(&function.space, &function.function_id, function.provider.clone()),
                other => other,
            };
            if let Err(e) = result {
                errors.push(e);
            }
        }

        for sub in &seed.subscriptions {
            let sub = Subscription { space: with_space(&sub.space), ..sub.clone() };
            match self.create_subscription(sub) {
                Ok(_) | Err(CatalogError::SubscriptionAlreadyExists(_)) => {}
                Err(e) => errors.push(e),
            }
        }

        for e in &errors {
            tracing::warn!(error = %e, "Rejected seeded configuration entry");
        }
        errors
    }

    fn rebuild_routes(&self) {
        let subs: Vec<Subscription> = self.subscriptions.iter().map(|r| r.value().clone()).collect();
        self.routes.store(Arc::new(RoutingTable::build(&subs)));
    }

    fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Spaces follow the identifier rule and are at least 3 characters long.
pub fn validate_space(space: &str) -> Result<(), CatalogError> {
    if space.len() < 3 || !is_identifier(space) {
        return Err(CatalogError::Validation(format!("invalid space {:?}", space)));
    }
    Ok(())
}

fn validate_function(function: &Function) -> Result<(), CatalogError> {
    validate_space(&function.space)?;
    if !function.function_id.is_valid() {
        return Err(CatalogError::Validation(format!(
            "invalid functionId {:?}",
            function.function_id.as_str()
        )));
    }
    function.provider.validate().map_err(CatalogError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{WeightedFunction, WeightedFunctions};

    const SPACE: &str = "default";

    fn catalog_with_basics() -> Catalog {
        let catalog = Catalog::new();
        catalog
            .create_event_type(EventTypeDefinition { space: SPACE.into(), name: "user.created".into() })
            .unwrap();
        catalog
            .register_function(Function::http(SPACE, "crm", "http://localhost:3000/crm"))
            .unwrap();
        catalog
    }

    #[test]
    fn test_event_type_lifecycle() {
        let catalog = catalog_with_basics();
        assert_eq!(
            catalog.create_event_type(EventTypeDefinition { space: SPACE.into(), name: "user.created".into() }),
            Err(CatalogError::EventTypeAlreadyExists("user.created".into()))
        );
        assert_eq!(catalog.list_event_types(SPACE).len(), 1);
        assert!(catalog.list_event_types("other").is_empty());

        catalog.delete_event_type(SPACE, &"user.created".into()).unwrap();
        assert!(matches!(
            catalog.get_event_type(SPACE, &"user.created".into()),
            Err(CatalogError::EventTypeNotFound(_))
        ));
    }

    #[test]
    fn test_system_event_type_reserved() {
        let catalog = Catalog::new();
        let err = catalog
            .create_event_type(EventTypeDefinition { space: SPACE.into(), name: "gateway.x".into() })
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[test]
    fn test_function_validation() {
        let catalog = Catalog::new();
        assert!(matches!(
            catalog.register_function(Function::http("ab", "f", "http://localhost/")),
            Err(CatalogError::Validation(_))
        ));
        assert!(matches!(
            catalog.register_function(Function::http(SPACE, "bad/id", "http://localhost/")),
            Err(CatalogError::Validation(_))
        ));
        assert!(matches!(
            catalog.register_function(Function::http(SPACE, "f", "localhost")),
            Err(CatalogError::Validation(_))
        ));
    }

    #[test]
    fn test_function_update_and_duplicate() {
        let catalog = catalog_with_basics();
        assert!(matches!(
            catalog.register_function(Function::http(SPACE, "crm", "http://localhost:3000/crm")),
            Err(CatalogError::FunctionAlreadyRegistered(_))
        ));

        let updated = catalog
            .update_function(SPACE, &"crm".into(), Provider::Http { url: "http://localhost:4000/".into() })
            .unwrap();
        assert_eq!(updated.provider, Provider::Http { url: "http://localhost:4000/".into() });

        assert!(matches!(
            catalog.update_function(SPACE, &"missing".into(), Provider::Http { url: "http://x/".into() }),
            Err(CatalogError::FunctionNotFound(_))
        ));
    }

    #[test]
    fn test_subscription_requires_event_type_and_function() {
        let catalog = catalog_with_basics();

        let missing_type = Subscription::new_async(SPACE, "user.deleted", "crm");
        assert!(matches!(
            catalog.create_subscription(missing_type),
            Err(CatalogError::EventTypeNotFound(_))
        ));

        let missing_fn = Subscription::new_async(SPACE, "user.created", "nope");
        assert!(matches!(
            catalog.create_subscription(missing_fn),
            Err(CatalogError::FunctionNotFound(_))
        ));
    }

    #[test]
    fn test_builtin_event_types_need_no_registration() {
        let catalog = catalog_with_basics();

        let sync = Subscription::new_sync(SPACE, "http.request", "crm", "GET", "/users/:id");
        assert!(catalog.create_subscription(sync).is_ok());

        let audit = Subscription::new_async(SPACE, "gateway.function.invoked", "crm");
        assert!(catalog.create_subscription(audit).is_ok());

        assert!(catalog.get_event_type(SPACE, &"http.request".into()).is_err());
    }

    #[test]
    fn test_subscription_routes_are_rebuilt() {
        let catalog = catalog_with_basics();
        let sub = catalog
            .create_subscription(Subscription::new_async(SPACE, "user.created", "crm"))
            .unwrap();

        assert_eq!(
            catalog.routes().subscribers(SPACE, "/", &"user.created".into()),
            &[FunctionId::new("crm")]
        );

        assert!(matches!(
            catalog.create_subscription(Subscription::new_async(SPACE, "user.created", "crm")),
            Err(CatalogError::SubscriptionAlreadyExists(_))
        ));

        catalog.delete_subscription(SPACE, &sub.subscription_id).unwrap();
        assert!(catalog.routes().subscribers(SPACE, "/", &"user.created".into()).is_empty());
    }

    #[test]
    fn test_references_block_deletion() {
        let catalog = catalog_with_basics();
        catalog
            .create_subscription(Subscription::new_async(SPACE, "user.created", "crm"))
            .unwrap();

        assert!(matches!(
            catalog.delete_function(SPACE, &"crm".into()),
            Err(CatalogError::FunctionHasSubscriptions(_))
        ));
        assert!(matches!(
            catalog.delete_event_type(SPACE, &"user.created".into()),
            Err(CatalogError::EventTypeHasSubscriptions(_))
        ));
    }

    #[test]
    fn test_sync_path_conflict() {
        let catalog = catalog_with_basics();
        catalog
            .create_subscription(Subscription::new_sync(SPACE, "http.request", "crm", "GET", "/users/:id"))
            .unwrap();

        let err = catalog
            .create_subscription(Subscription::new_sync(SPACE, "http.request", "crm", "GET", "/users/:name"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::PathConflict(_)));
    }

    #[test]
    fn test_subscription_update_rules() {
        let catalog = catalog_with_basics();
        catalog
            .register_function(Function::http(SPACE, "crm-v2", "http://localhost:3000/v2"))
            .unwrap();
        let sub = catalog
            .create_subscription(Subscription::new_sync(SPACE, "http.request", "crm", "GET", "/users"))
            .unwrap();

        let mut moved = sub.clone();
        moved.path = "/people".into();
        assert_eq!(
            catalog.update_subscription(SPACE, &sub.subscription_id, moved),
            Err(CatalogError::InvalidSubscriptionUpdate("Path"))
        );

        let mut retargeted = sub.clone();
        retargeted.function_id = "crm-v2".into();
        let updated = catalog
            .update_subscription(SPACE, &sub.subscription_id, retargeted)
            .unwrap();
        assert_eq!(updated.function_id.as_str(), "crm-v2");

        let (target, _) = catalog
            .routes()
            .sync_target(SPACE, "GET", "/users", &"http.request".into())
            .map(|(t, p)| (t.clone(), p))
            .unwrap();
        assert_eq!(target.function_id.as_str(), "crm-v2");
    }

    #[test]
    fn test_apply_seed() {
        let catalog = Catalog::new();
        let seed = Seed {
            event_types: vec![EventTypeDefinition { space: String::new(), name: "user.created".into() }],
            functions: vec![
                Function::http("", "crm", "http://localhost:3000/crm"),
                Function {
                    space: String::new(),
                    function_id: "split".into(),
                    provider: Provider::Weighted {
                        functions: WeightedFunctions(vec![WeightedFunction { function_id: "crm".into(), weight: 1 }]),
                    },
                },
            ],
            subscriptions: vec![Subscription::new_async("", "user.created", "crm")],
        };

        assert!(catalog.apply_seed(&seed, SPACE).is_empty());
        assert!(catalog.apply_seed(&seed, SPACE).is_empty());
        assert_eq!(catalog.list_functions(SPACE).len(), 2);
        assert_eq!(catalog.list_subscriptions(SPACE).len(), 1);
        assert_eq!(
            catalog.stats(),
            CatalogStats { event_types: 1, functions: 2, subscriptions: 1 }
        );
    }
}
