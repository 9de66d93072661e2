//! Stage logic interface and the per-invocation envelope
//!
//! A [`Processor`] only sees the session it is handed. [`trigger`] creates
//! the session, runs the stage logic, and ends the session with exactly one
//! commit or one rollback unless the stage already did so.

use crate::context::{InitializationContext, ProcessContext};
use crate::error::{ProcessorError, ProcessorResult};
use crate::log::LogLevel;
use flowstage_core::{PropertyDescriptor, RelationshipSet, ValidationResult};
use flowstage_session::{CommitSummary, ProcessSession, SessionFactory, SessionStatus};
use tracing::debug;

/// Stage logic invoked once per trigger.
pub trait Processor: Send + Sync {
    /// Stable identifier of the stage type.
    fn identifier(&self) -> &str;

    /// Relationships this stage may route records to.
    fn relationships(&self) -> &RelationshipSet;

    /// Configurable properties.
    fn property_descriptors(&self) -> Vec<PropertyDescriptor> {
        Vec::new()
    }

    /// Check a configuration before any invocation.
    ///
    /// Validates every descriptor against the configured values; a stage
    /// without descriptors is always valid.
    fn validate(&self, context: &ProcessContext) -> Vec<ValidationResult> {
        self.property_descriptors()
            .iter()
            .map(|d| d.validate(context.configured(&d.name)))
            .collect()
    }

    /// One-time setup before the first invocation.
    fn initialize(&mut self, context: &InitializationContext) -> ProcessorResult<()> {
        let _ = context;
        Ok(())
    }

    /// Process input through `session`.
    ///
    /// Stage logic may end the session itself with `commit` or `rollback`;
    /// otherwise the envelope commits on `Ok`. Returning `Err` (or panicking)
    /// rolls back whatever is still open.
    fn on_trigger(&self, context: &ProcessContext, session: &mut ProcessSession) -> ProcessorResult<()>;
}

/// Run one invocation of `processor` inside a fresh session.
///
/// A session still open when the stage returns is committed on `Ok` and
/// rolled back on `Err`. A session the stage already ended is left as it is:
/// a stage-side commit yields its summary, a stage-side rollback yields an
/// empty summary carrying the session id.
///
/// # Errors
/// Returns the stage's error, or the session's commit error (the session is
/// already rolled back in that case). A stage error raised after the stage
/// committed is still returned, but the committed work stands.
pub fn trigger<P>(processor: &P, context: &ProcessContext, factory: &SessionFactory) -> ProcessorResult<CommitSummary>
where
    P: Processor + ?Sized,
{
    let mut session = factory.create_session();
    debug!(session_id = session.id(), stage = context.identifier(), "Invoking stage");

    let outcome = processor.on_trigger(context, &mut session);
    let empty = CommitSummary {
        session_id: session.id(),
        ..CommitSummary::default()
    };
    match (outcome, session.status()) {
        (Ok(()), SessionStatus::Open) => session.commit().map_err(|e| {
            context
                .logger()
                .log(LogLevel::Error, "Commit failed; session rolled back", Some(&e));
            ProcessorError::from(e)
        }),
        (Ok(()), SessionStatus::Committed) => Ok(session.commit_summary().unwrap_or(empty)),
        (Ok(()), SessionStatus::RolledBack) => {
            debug!(session_id = session.id(), "Stage rolled back its own session");
            Ok(empty)
        }
        (Err(e), SessionStatus::Committed) => {
            context.logger().log(
                LogLevel::Error,
                "Stage failed after committing; committed work kept",
                Some(&e),
            );
            Err(e)
        }
        (Err(e), status) => {
            if status == SessionStatus::Open {
                session.rollback(true)?;
            }
            context
                .logger()
                .log(LogLevel::Error, "Stage failed; session rolled back", Some(&e));
            Err(e)
        }
    }
}

/// Keep only failing results.
pub fn invalid_results(results: Vec<ValidationResult>) -> Vec<ValidationResult> {
    results.into_iter().filter(|r| !r.valid).collect()
}
