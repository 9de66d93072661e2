//! Commit-time routing validation
//!
//! Rules:
//! - Every record acquired or created in a session is routed exactly once
//! - Routing means `remove` or `transfer` to one declared relationship
//! - Zero routes and more than one route are both violations
//!
//! All violations are collected, not just the first, so the error reported
//! to the host names every offending record.

use crate::error::Violation;
use flowstage_core::{Record, Relationship};

/// One routing decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Deliver to a relationship on commit
    Transfer(Relationship),
    /// Terminate on commit
    Remove,
}

impl Route {
    /// Short description used in violation reports
    pub fn describe(&self) -> String {
        match self {
            Route::Transfer(rel) => rel.name().to_string(),
            Route::Remove => "<removed>".to_string(),
        }
    }
}

/// Result of validating a session's routing
///
/// A session commits only if `is_valid()` returns true.
#[derive(Debug, Clone, Default)]
pub struct RoutingValidation {
    /// All violations found
    pub violations: Vec<Violation>,
}

impl RoutingValidation {
    /// A passing result
    pub fn ok() -> Self {
        Self::default()
    }

    /// Whether no violations were found
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of violations
    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    /// Fold another result into this one
    pub fn merge(&mut self, other: RoutingValidation) {
        self.violations.extend(other.violations);
    }
}

/// Validate one record's routing decisions
pub fn validate_record(record: &Record, routes: &[Route]) -> RoutingValidation {
    match routes.len() {
        1 => RoutingValidation::ok(),
        0 => RoutingValidation {
            violations: vec![Violation::Unrouted {
                id: record.id(),
                uuid: record.uuid().to_string(),
            }],
        },
        _ => RoutingValidation {
            violations: vec![Violation::MultiplyRouted {
                id: record.id(),
                routes: routes.iter().map(Route::describe).collect(),
            }],
        },
    }
}

/// Validate every record touched by a session
pub fn validate_routing<'a, I>(entries: I) -> RoutingValidation
where
    I: IntoIterator<Item = (&'a Record, &'a [Route])>,
{
    let mut result = RoutingValidation::ok();
    for (record, routes) in entries {
        result.merge(validate_record(record, routes));
    }
    result
}
