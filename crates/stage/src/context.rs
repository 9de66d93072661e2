//! Contexts handed to stage logic by the host

use crate::log::ComponentLog;
use flowstage_core::PropertyDescriptor;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Context for one-time stage initialization.
#[derive(Clone)]
pub struct InitializationContext {
    identifier: String,
    logger: Arc<dyn ComponentLog>,
}

impl InitializationContext {
    /// Context for the stage instance `identifier`.
    pub fn new(identifier: impl Into<String>, logger: Arc<dyn ComponentLog>) -> Self {
        Self {
            identifier: identifier.into(),
            logger,
        }
    }

    /// Stage instance identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Logging collaborator.
    pub fn logger(&self) -> &dyn ComponentLog {
        self.logger.as_ref()
    }
}

impl fmt::Debug for InitializationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitializationContext")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

/// Context for each invocation: resolved configuration and logger.
#[derive(Clone)]
pub struct ProcessContext {
    identifier: String,
    descriptors: Vec<PropertyDescriptor>,
    configured: BTreeMap<String, String>,
    logger: Arc<dyn ComponentLog>,
}

impl ProcessContext {
    /// Build a context from descriptors and configured values.
    pub fn new(
        identifier: impl Into<String>,
        descriptors: Vec<PropertyDescriptor>,
        configured: BTreeMap<String, String>,
        logger: Arc<dyn ComponentLog>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            descriptors,
            configured,
            logger,
        }
    }

    /// Stage instance identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Effective value: configured, else the descriptor default.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.configured.get(name).map(String::as_str).or_else(|| {
            self.descriptors
                .iter()
                .find(|d| d.name == name)
                .and_then(|d| d.default_value.as_deref())
        })
    }

    /// Explicitly configured value, ignoring defaults.
    pub fn configured(&self, name: &str) -> Option<&str> {
        self.configured.get(name).map(String::as_str)
    }

    /// All explicitly configured values.
    pub fn configured_properties(&self) -> &BTreeMap<String, String> {
        &self.configured
    }

    /// Property descriptors the context resolves against.
    pub fn descriptors(&self) -> &[PropertyDescriptor] {
        &self.descriptors
    }

    /// Logging collaborator.
    pub fn logger(&self) -> &dyn ComponentLog {
        self.logger.as_ref()
    }
}

impl fmt::Debug for ProcessContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessContext")
            .field("identifier", &self.identifier)
            .field("configured", &self.configured)
            .finish_non_exhaustive()
    }
}
