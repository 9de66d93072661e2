//! Case conversion stage
//!
//! Takes one record per invocation, converts its text content to the
//! configured case, and routes a converted child to `success`. The original
//! is removed. Records whose content cannot be read or is not UTF-8 are
//! annotated with the error and routed to `failure` unchanged.

use crate::context::{InitializationContext, ProcessContext};
use crate::error::{ProcessorError, ProcessorResult};
use crate::processor::Processor;
use flowstage_core::{FlowError, FlowErrorKind, PropertyDescriptor, Record, Relationship, RelationshipSet};
use flowstage_session::ProcessSession;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Records converted successfully
pub const REL_SUCCESS: Relationship =
    Relationship::from_static("success", "Converted records; the original is removed");

/// Records that could not be converted
pub const REL_FAILURE: Relationship =
    Relationship::from_static("failure", "Original records that could not be read or converted");

/// Case mode property
pub const PROP_CASE: &str = "Case";

/// Text appended after conversion
pub const PROP_SUFFIX: &str = "Suffix";

/// Attribute stamped on every converted record
pub const GOOD_EXAMPLE_ATTRIBUTE: &str = "isThisAGoodExample";

/// Attribute recording the applied case mode
pub const CASE_ATTRIBUTE: &str = "content.case";

/// `error.message` for records whose content could not be read
pub const READ_FAILURE_MESSAGE: &str = "Failed to read the flowfile";

/// `error.message` for records whose content is not text
pub const NOT_UTF8_MESSAGE: &str = "Content is not valid UTF-8";

/// Counter incremented per converted record
pub const COUNTER_SUCCESS: &str = "records.success";

/// Counter incremented per failed record
pub const COUNTER_FAILURE: &str = "records.failure";

/// How content case is changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseMode {
    /// All characters uppercased
    #[default]
    Upper,
    /// All characters lowercased
    Lower,
    /// Content left as is
    Preserve,
}

impl CaseMode {
    /// Configuration name
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseMode::Upper => "upper",
            CaseMode::Lower => "lower",
            CaseMode::Preserve => "preserve",
        }
    }

    /// Apply the mode to text
    pub fn apply(&self, text: &str) -> String {
        match self {
            CaseMode::Upper => text.to_uppercase(),
            CaseMode::Lower => text.to_lowercase(),
            CaseMode::Preserve => text.to_string(),
        }
    }
}

impl fmt::Display for CaseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upper" => Ok(CaseMode::Upper),
            "lower" => Ok(CaseMode::Lower),
            "preserve" => Ok(CaseMode::Preserve),
            other => Err(format!("unknown case mode '{}'", other)),
        }
    }
}

/// Convert raw content; fails with a transform error on non-UTF-8 input
pub fn convert(content: &[u8], mode: CaseMode, suffix: &str) -> Result<Vec<u8>, FlowError> {
    let text = std::str::from_utf8(content)
        .map_err(|e| FlowError::with_cause(FlowErrorKind::Transform, NOT_UTF8_MESSAGE, e))?;
    let mut converted = mode.apply(text);
    converted.push_str(suffix);
    Ok(converted.into_bytes())
}

/// The case conversion stage
#[derive(Debug, Clone)]
pub struct CaseConvert {
    relationships: RelationshipSet,
}

impl CaseConvert {
    /// Stage type identifier
    pub const IDENTIFIER: &'static str = "case-convert";

    /// New stage with `success` and `failure` relationships
    pub fn new() -> Self {
        Self {
            relationships: RelationshipSet::new([REL_SUCCESS, REL_FAILURE]),
        }
    }

    fn settings(context: &ProcessContext) -> ProcessorResult<(CaseMode, String)> {
        let mode = context
            .property(PROP_CASE)
            .map(CaseMode::from_str)
            .transpose()
            .map_err(ProcessorError::processing)?
            .unwrap_or_default();
        let suffix = context.property(PROP_SUFFIX).unwrap_or_default().to_string();
        Ok((mode, suffix))
    }

    /// Annotate `record` with `error` and route it to `failure`
    fn route_failure(
        &self,
        context: &ProcessContext,
        session: &mut ProcessSession,
        record: Record,
        error: FlowError,
    ) -> ProcessorResult<()> {
        context.logger().error(&format!("Routing {} to failure", record), &error);
        let record = session.put_all_attributes(record, error.to_attributes())?;
        session.transfer(record, &REL_FAILURE)?;
        session.adjust_counter(COUNTER_FAILURE, 1)?;
        Ok(())
    }
}

impl Default for CaseConvert {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for CaseConvert {
    fn identifier(&self) -> &str {
        Self::IDENTIFIER
    }

    fn relationships(&self) -> &RelationshipSet {
        &self.relationships
    }

    fn property_descriptors(&self) -> Vec<PropertyDescriptor> {
        vec![
            PropertyDescriptor::new(PROP_CASE, "Case applied to record content")
                .required(true)
                .default_value(CaseMode::Upper.as_str())
                .allowed_values([
                    CaseMode::Upper.as_str(),
                    CaseMode::Lower.as_str(),
                    CaseMode::Preserve.as_str(),
                ]),
            PropertyDescriptor::new(PROP_SUFFIX, "Text appended to converted content"),
        ]
    }

    fn initialize(&mut self, context: &InitializationContext) -> ProcessorResult<()> {
        context
            .logger()
            .debug(&format!("{} initialized as '{}'", Self::IDENTIFIER, context.identifier()));
        Ok(())
    }

    fn on_trigger(&self, context: &ProcessContext, session: &mut ProcessSession) -> ProcessorResult<()> {
        let Some(original) = session.acquire()? else {
            return Ok(());
        };
        let (mode, suffix) = Self::settings(context)?;

        let content = match session.read_to_vec(&original)? {
            Ok(content) => content,
            Err(e) => {
                let error = FlowError::with_cause(FlowErrorKind::ContentRead, READ_FAILURE_MESSAGE, e);
                return self.route_failure(context, session, original, error);
            }
        };
        let converted = match convert(&content, mode, &suffix) {
            Ok(converted) => converted,
            Err(error) => return self.route_failure(context, session, original, error),
        };

        let child = session.create_child(&original)?;
        let child = match session.write(&child, |out| out.write_all(&converted))? {
            Ok(child) => child,
            Err(error) => {
                session.remove(child)?;
                return self.route_failure(context, session, original, error);
            }
        };
        let child = session.put_all_attributes(
            child,
            [(GOOD_EXAMPLE_ATTRIBUTE, "sure"), (CASE_ATTRIBUTE, mode.as_str())],
        )?;

        session.transfer(child, &REL_SUCCESS)?;
        session.remove(original)?;
        session.adjust_counter(COUNTER_SUCCESS, 1)?;
        Ok(())
    }
}
