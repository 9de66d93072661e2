//! Host harness for a single stage
//!
//! `StageRunner` wires a processor to a session factory: it initializes and
//! validates the stage once, then drives invocations sequentially or from
//! several threads sharing the same queues.

use crate::config::StageConfig;
use crate::context::{InitializationContext, ProcessContext};
use crate::error::{ProcessorError, ProcessorResult};
use crate::log::{ComponentLog, TracingLog};
use crate::processor::{invalid_results, trigger, Processor};
use flowstage_core::{Record, ValidationResult};
use flowstage_session::{CommitSummary, ContentRepository, SessionFactory};
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a batch of invocations.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Invocations attempted.
    pub invocations: usize,
    /// Summaries of committed invocations.
    pub committed: Vec<CommitSummary>,
    /// Errors of rolled-back invocations.
    pub errors: Vec<ProcessorError>,
}

impl RunReport {
    /// Inputs consumed by committed invocations.
    pub fn received(&self) -> usize {
        self.committed.iter().map(|s| s.received).sum()
    }

    /// Whether no invocation failed.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, outcome: ProcessorResult<CommitSummary>) {
        self.invocations += 1;
        match outcome {
            Ok(summary) => self.committed.push(summary),
            Err(e) => self.errors.push(e),
        }
    }

    fn merge(&mut self, other: RunReport) {
        self.invocations += other.invocations;
        self.committed.extend(other.committed);
        self.errors.extend(other.errors);
    }
}

/// Builder for [`StageRunner`].
pub struct StageRunnerBuilder<P> {
    processor: P,
    config: StageConfig,
    logger: Option<Arc<dyn ComponentLog>>,
    content: Option<Arc<dyn ContentRepository>>,
}

impl<P: Processor> StageRunnerBuilder<P> {
    /// Use this configuration.
    pub fn config(mut self, config: StageConfig) -> Self {
        self.config = config;
        self
    }

    /// Log through this collaborator instead of `tracing`.
    pub fn logger(mut self, logger: Arc<dyn ComponentLog>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Use a specific content repository.
    pub fn content_repository(mut self, content: Arc<dyn ContentRepository>) -> Self {
        self.content = Some(content);
        self
    }

    /// Initialize and validate the stage.
    ///
    /// # Errors
    /// `InvalidConfiguration` if a property or auto-terminated relationship is
    /// invalid, or the stage's own initialization error.
    pub fn build(self) -> ProcessorResult<StageRunner<P>> {
        let StageRunnerBuilder {
            mut processor,
            config,
            logger,
            content,
        } = self;

        let identifier = config
            .identifier
            .clone()
            .unwrap_or_else(|| processor.identifier().to_string());
        let logger = logger
            .unwrap_or_else(|| Arc::new(TracingLog::new(identifier.clone())) as Arc<dyn ComponentLog>);

        let context = ProcessContext::new(
            identifier.clone(),
            processor.property_descriptors(),
            config.properties.clone(),
            Arc::clone(&logger),
        );
        let mut invalid = invalid_results(processor.validate(&context));
        for name in &config.auto_terminate {
            if processor.relationships().get(name).is_none() {
                invalid.push(ValidationResult::invalid(
                    "auto_terminate",
                    format!("'{}' is not a relationship of {}", name, processor.identifier()),
                ));
            }
        }
        if !invalid.is_empty() {
            warn!(stage = %identifier, problems = invalid.len(), "Stage configuration rejected");
            return Err(ProcessorError::InvalidConfiguration(invalid));
        }

        processor.initialize(&InitializationContext::new(identifier.clone(), logger))?;

        let mut factory = SessionFactory::builder(processor.relationships().clone())
            .auto_terminate(config.auto_terminate.iter().cloned());
        if let Some(content) = content {
            factory = factory.content_repository(content);
        }

        info!(
            stage = %identifier,
            relationships = ?processor.relationships().names(),
            auto_terminated = ?config.auto_terminate,
            "Stage ready"
        );
        Ok(StageRunner {
            processor,
            context,
            factory: factory.build(),
        })
    }
}

/// A validated, initialized stage with its queues.
pub struct StageRunner<P> {
    processor: P,
    context: ProcessContext,
    factory: SessionFactory,
}

impl<P: Processor> StageRunner<P> {
    /// Start building a runner for `processor`.
    pub fn builder(processor: P) -> StageRunnerBuilder<P> {
        StageRunnerBuilder {
            processor,
            config: StageConfig::default(),
            logger: None,
            content: None,
        }
    }

    /// Runner with default configuration.
    pub fn new(processor: P) -> ProcessorResult<Self> {
        Self::builder(processor).build()
    }

    /// Put a record on the input queue.
    pub fn enqueue(&self, attributes: BTreeMap<String, String>, content: impl Into<Vec<u8>>) -> io::Result<Record> {
        self.factory.enqueue(attributes, content)
    }

    /// Run exactly one invocation.
    pub fn run_once(&self) -> ProcessorResult<CommitSummary> {
        trigger(&self.processor, &self.context, &self.factory)
    }

    /// Run `iterations` invocations, continuing past failures.
    pub fn run(&self, iterations: usize) -> RunReport {
        let mut report = RunReport::default();
        for _ in 0..iterations {
            report.record(self.run_once());
        }
        report
    }

    /// Invoke until the input queue is empty.
    ///
    /// Stops at the first failed invocation, whose inputs are back on the
    /// queue and would otherwise be retried forever.
    pub fn run_until_empty(&self) -> RunReport {
        let mut report = RunReport::default();
        while self.factory.queues().input_len() > 0 {
            let outcome = self.run_once();
            let failed = outcome.is_err();
            report.record(outcome);
            if failed {
                break;
            }
        }
        report
    }

    /// Drain the input queue from `threads` concurrent workers.
    ///
    /// Each worker stops when it sees an empty queue or its own invocation
    /// fails.
    pub fn run_concurrent(&self, threads: usize) -> RunReport {
        let threads = threads.max(1);
        let reports: Vec<RunReport> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| scope.spawn(|| self.run_until_empty()))
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(report) => report,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });
        let mut merged = RunReport::default();
        for report in reports {
            merged.merge(report);
        }
        merged
    }

    /// Records currently queued on `relationship`.
    pub fn output(&self, relationship: &str) -> Vec<Record> {
        self.factory.queues().snapshot_output(relationship)
    }

    /// Content of a record.
    pub fn content(&self, record: &Record) -> io::Result<Vec<u8>> {
        self.factory.read_content(record)
    }

    /// The wrapped stage.
    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Resolved invocation context.
    pub fn context(&self) -> &ProcessContext {
        &self.context
    }

    /// Underlying session factory.
    pub fn factory(&self) -> &SessionFactory {
        &self.factory
    }
}
