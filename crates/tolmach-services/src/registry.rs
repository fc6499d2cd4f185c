//! Name-indexed service registry with per-language scoping.
//!
//! A two-level map `{language id → {service name → factory}}`. Services
//! are resolved lazily, instantiated once, and cached. Circular factory
//! resolution is detected during resolution, logged, and reported as an
//! error rather than overflowing the stack. Scheduling at the service
//! boundary is single-threaded, so interior mutability is a `RefCell`.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::ServiceError;

/// The canonical service names, one service per language.
pub mod service_names {
    pub const PARSER_ADAPTER: &str = "ParserAdapter";
    pub const GRAMMAR_TRANSLATOR: &str = "GrammarTranslator";
    pub const LINKER: &str = "Linker";
    pub const REFERENCES: &str = "References";
    pub const NAME_PROVIDER: &str = "NameProvider";
    pub const INDEX_MANAGER: &str = "IndexManager";
    pub const DOCUMENT_HIGHLIGHT: &str = "DocumentHighlight";
    pub const DOCUMENT_SYMBOLS: &str = "DocumentSymbols";
    pub const FOLDING_RANGE: &str = "FoldingRange";
    pub const HOVER: &str = "Hover";
    pub const SIGNATURE_HELP: &str = "SignatureHelp";
    pub const TYPE_DEFINITION: &str = "TypeDefinition";
    pub const IMPLEMENTATION: &str = "Implementation";
    pub const WORKSPACE_SYMBOLS: &str = "WorkspaceSymbols";
    pub const EXECUTE_COMMAND: &str = "ExecuteCommand";
}

/// A service instance; consumers downcast to the concrete type.
pub type Service = Arc<dyn Any + Send + Sync>;

/// A lazy service constructor; may resolve other services.
pub type Factory = Box<dyn Fn(&ServiceRegistry) -> Service>;

#[derive(Default)]
pub struct ServiceRegistry {
    factories: IndexMap<String, IndexMap<String, Factory>>,
    instances: RefCell<HashMap<(String, String), Service>>,
    resolving: RefCell<Vec<(String, String)>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        language: impl Into<String>,
        service: impl Into<String>,
        factory: Factory,
    ) {
        self.factories
            .entry(language.into())
            .or_default()
            .insert(service.into(), factory);
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Resolve a service, instantiating it on first access.
    pub fn resolve(&self, language: &str, service: &str) -> Result<Service, ServiceError> {
        let key = (language.to_string(), service.to_string());

        if let Some(instance) = self.instances.borrow().get(&key) {
            return Ok(instance.clone());
        }

        let factory = self
            .factories
            .get(language)
            .ok_or_else(|| ServiceError::UnknownLanguage(language.to_string()))?
            .get(service)
            .ok_or_else(|| ServiceError::UnknownService {
                language: language.to_string(),
                service: service.to_string(),
            })?;

        {
            let mut resolving = self.resolving.borrow_mut();
            if resolving.contains(&key) {
                let chain = resolving
                    .iter()
                    .map(|(l, s)| format!("{l}.{s}"))
                    .chain(std::iter::once(format!("{language}.{service}")))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                log::error!("circular service resolution: {chain}");
                return Err(ServiceError::CircularResolution { chain });
            }
            resolving.push(key.clone());
        }

        let instance = factory(self);
        self.resolving.borrow_mut().pop();

        self.instances
            .borrow_mut()
            .insert(key, instance.clone());
        Ok(instance)
    }

    /// Resolve and downcast in one step.
    pub fn resolve_as<T: Any + Send + Sync>(
        &self,
        language: &str,
        service: &str,
    ) -> Result<Arc<T>, ServiceError> {
        let instance = self.resolve(language, service)?;
        instance
            .downcast::<T>()
            .map_err(|_| ServiceError::UnknownService {
                language: language.to_string(),
                service: service.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn services_are_instantiated_once() {
        let mut registry = ServiceRegistry::new();
        registry.register(
            "demo",
            service_names::NAME_PROVIDER,
            Box::new(|_| Arc::new(42u32) as Service),
        );

        let first = registry
            .resolve_as::<u32>("demo", service_names::NAME_PROVIDER)
            .unwrap();
        let second = registry
            .resolve_as::<u32>("demo", service_names::NAME_PROVIDER)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn unknown_names_are_reported() {
        let registry = ServiceRegistry::new();
        assert!(matches!(
            registry.resolve("ghost", service_names::HOVER),
            Err(ServiceError::UnknownLanguage(_))
        ));

        let mut registry = ServiceRegistry::new();
        registry.register("demo", "Something", Box::new(|_| Arc::new(()) as Service));
        assert!(matches!(
            registry.resolve("demo", service_names::HOVER),
            Err(ServiceError::UnknownService { .. })
        ));
    }

    #[test]
    fn circular_resolution_is_detected() {
        let mut registry = ServiceRegistry::new();
        registry.register(
            "demo",
            "A",
            Box::new(|r| {
                // A needs B during construction.
                let _ = r.resolve("demo", "B");
                Arc::new("a") as Service
            }),
        );
        registry.register(
            "demo",
            "B",
            Box::new(|r| {
                // B needs A: a cycle.
                let result = r.resolve("demo", "A");
                assert!(matches!(
                    result,
                    Err(ServiceError::CircularResolution { .. })
                ));
                Arc::new("b") as Service
            }),
        );

        // Resolution completes; the cycle was cut inside B's factory.
        registry.resolve("demo", "A").unwrap();
    }

    #[test]
    fn per_language_scoping() {
        let mut registry = ServiceRegistry::new();
        registry.register("a", "Svc", Box::new(|_| Arc::new(1u32) as Service));
        registry.register("b", "Svc", Box::new(|_| Arc::new(2u32) as Service));

        assert_eq!(*registry.resolve_as::<u32>("a", "Svc").unwrap(), 1);
        assert_eq!(*registry.resolve_as::<u32>("b", "Svc").unwrap(), 2);
    }
}
