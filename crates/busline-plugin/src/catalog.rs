// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handler factory catalog.
//!
//! Handler units name a `kind`; the catalog maps kinds to factories that
//! build handler instances from a [`HandlerSpec`].

use std::collections::BTreeMap;
use std::sync::Arc;

use busline_core::{BuslineError, Handler};

use crate::builtin::{AddIntegerFactory, EchoFactory, InvertBooleanFactory, ReverseStringFactory};
use crate::manifest::HandlerSpec;

/// Builds handler instances of one kind.
pub trait HandlerFactory: Send + Sync {
    /// The catalog key, e.g. `reverse_string`.
    fn kind(&self) -> &str;

    /// One-line description of what the built handler does.
    fn description(&self) -> &str {
        ""
    }

    /// Creates a fresh handler instance for `spec`.
    fn create(&self, spec: &HandlerSpec) -> Result<Arc<dyn Handler>, BuslineError>;
}

/// Factories keyed by kind.
#[derive(Default)]
pub struct HandlerCatalog {
    factories: BTreeMap<String, Box<dyn HandlerFactory>>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `factory`, replacing any factory already registered for its kind.
    pub fn register(&mut self, factory: Box<dyn HandlerFactory>) {
        self.factories.insert(factory.kind().to_string(), factory);
    }

    pub fn get(&self, kind: &str) -> Option<&dyn HandlerFactory> {
        self.factories.get(kind).map(|f| f.as_ref())
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Builds the handler described by `spec`.
    pub fn create(&self, spec: &HandlerSpec) -> Result<Arc<dyn Handler>, BuslineError> {
        let factory = self.get(&spec.kind).ok_or_else(|| BuslineError::Load {
            unit: spec.message_name.clone(),
            reason: format!(
                "unknown handler kind '{}'. Expected one of: {}",
                spec.kind,
                self.kinds().join(", ")
            ),
        })?;
        factory.create(spec)
    }
}

impl std::fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerCatalog")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// A catalog holding the handlers compiled into the binary.
///
/// - `reverse_string`: text in, reversed text out
/// - `add_integer`: integer in, integer plus `addend` out
/// - `invert_boolean`: boolean in, negation out
/// - `echo`: replies with the inbound payload
pub fn builtin_catalog() -> HandlerCatalog {
    let mut catalog = HandlerCatalog::new();
    catalog.register(Box::new(ReverseStringFactory));
    catalog.register(Box::new(AddIntegerFactory));
    catalog.register(Box::new(InvertBooleanFactory));
    catalog.register(Box::new(EchoFactory));
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: &str) -> HandlerSpec {
        let mut settings = toml::Table::new();
        settings.insert("reply_topic".into(), "out".into());
        HandlerSpec {
            kind: kind.to_string(),
            message_name: "m".to_string(),
            enabled: true,
            settings,
        }
    }

    #[test]
    fn builtin_catalog_has_four_kinds() {
        let catalog = builtin_catalog();
        assert_eq!(
            catalog.kinds(),
            vec!["add_integer", "echo", "invert_boolean", "reverse_string"]
        );
        assert!(catalog.get("echo").is_some_and(|f| !f.description().is_empty()));
    }

    #[test]
    fn create_uses_spec_message_name() {
        let handler = builtin_catalog().create(&spec("echo")).unwrap();
        assert_eq!(handler.message_name(), "m");
    }

    #[test]
    fn unknown_kind_lists_known_kinds() {
        let err = builtin_catalog().create(&spec("teleport")).err().unwrap().to_string();
        assert!(err.contains("unknown handler kind 'teleport'"));
        assert!(err.contains("reverse_string"));
    }

    #[test]
    fn each_create_is_a_fresh_instance() {
        let catalog = builtin_catalog();
        let a = catalog.create(&spec("echo")).unwrap();
        let b = catalog.create(&spec("echo")).unwrap();
        assert!(!std::ptr::addr_eq(Arc::as_ptr(&a), Arc::as_ptr(&b)));
    }
}
