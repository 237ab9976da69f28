//! Metadata fetch pipeline
//!
//! `process` runs six steps:
//!
//! 1. check both registries and build a [`RepositoryStatus`]
//! 2. return early when everything is present
//! 3. plan one `read-resource-description` per incomplete template and
//!    chunk the operations into composites of `batch_size`
//! 4. execute the composites concurrently and parse every response into
//!    its own [`RrdResult`], merged once all batches are back
//! 5. write the merged entries into both registries
//! 6. compose the answer from the registries
//!
//! A transport or parse failure fails the whole call. Nothing is retried.

use futures::stream::{self, StreamExt};
use modelmeta_common::config::{MetaConfig, ProcessorConfig};
use modelmeta_common::dmr::names;
use modelmeta_common::{Composite, Dispatcher, Operation};
use modelmeta_template::{
    AddressTemplate, SecurityContextResolver, StatementContext, TemplateResolver,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::error::{MetaError, MetaResult};
use crate::metadata::Metadata;
use crate::parser::{RrdParser, RrdResult};
use crate::registry::{ResourceDescriptionRegistry, SecurityContextRegistry};
use crate::status::RepositoryStatus;

/// Processor statistics for monitoring
#[derive(Debug, Default)]
pub struct ProcessorStats {
    /// Number of `process` calls
    pub requests: AtomicU64,
    /// Number of calls answered from the registries alone
    pub short_circuits: AtomicU64,
    /// Number of composite requests sent
    pub batches: AtomicU64,
    /// Number of `read-resource-description` operations sent
    pub operations: AtomicU64,
}

impl ProcessorStats {
    /// Share of calls answered without network access (0.0 to 1.0)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn short_circuit_ratio(&self) -> f64 {
        let requests = self.requests.load(Ordering::Relaxed);
        if requests == 0 {
            return 0.0;
        }
        self.short_circuits.load(Ordering::Relaxed) as f64 / requests as f64
    }
}

/// Fetches, caches and composes resource metadata
pub struct MetadataProcessor {
    dispatcher: Arc<dyn Dispatcher>,
    descriptions: Arc<ResourceDescriptionRegistry>,
    security_contexts: Arc<SecurityContextRegistry>,
    config: ProcessorConfig,
    stats: ProcessorStats,
}

impl MetadataProcessor {
    /// Wire a processor from shared registries
    pub fn new(
        dispatcher: Arc<dyn Dispatcher>,
        descriptions: Arc<ResourceDescriptionRegistry>,
        security_contexts: Arc<SecurityContextRegistry>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            dispatcher,
            descriptions,
            security_contexts,
            config,
            stats: ProcessorStats::default(),
        }
    }

    /// Build registries and processor from configuration
    pub fn from_config(dispatcher: Arc<dyn Dispatcher>, config: &MetaConfig) -> MetaResult<Self> {
        let descriptions = ResourceDescriptionRegistry::resource_descriptions(config.registry.capacity)?;
        let security_contexts =
            SecurityContextRegistry::security_contexts(config.registry.capacity)?;
        Ok(Self::new(
            dispatcher,
            Arc::new(descriptions),
            Arc::new(security_contexts),
            config.processor.clone(),
        ))
    }

    #[must_use]
    pub fn descriptions(&self) -> &Arc<ResourceDescriptionRegistry> {
        &self.descriptions
    }

    #[must_use]
    pub fn security_contexts(&self) -> &Arc<SecurityContextRegistry> {
        &self.security_contexts
    }

    #[must_use]
    pub const fn stats(&self) -> &ProcessorStats {
        &self.stats
    }

    /// Make sure metadata for `templates` is registered and compose it
    ///
    /// With `recursive`, only entries covering recursive descendants count
    /// as present, and missing ones are fetched with `recursive-depth`.
    pub async fn process(
        &self,
        context: &StatementContext,
        templates: &[AddressTemplate],
        recursive: bool,
    ) -> MetaResult<Metadata> {
        if templates.is_empty() {
            return Err(MetaError::NoTemplates);
        }
        self.stats.requests.fetch_add(1, Ordering::Relaxed);

        let status = self.check(context, templates, recursive);
        if status.all_present() {
            self.stats.short_circuits.fetch_add(1, Ordering::Relaxed);
            debug!(templates = templates.len(), "All metadata present");
            return Ok(self.compose(context, templates));
        }

        let operations = self.plan(context, &status, recursive)?;
        let batch_size = self.config.batch_size.max(1);
        let batches: Vec<Composite> = operations
            .chunks(batch_size)
            .map(|chunk| Composite::from(chunk.to_vec()))
            .collect();
        debug!(
            templates = templates.len(),
            operations = operations.len(),
            batches = batches.len(),
            "Fetching missing metadata"
        );
        self.stats
            .operations
            .fetch_add(operations.len() as u64, Ordering::Relaxed);
        self.stats
            .batches
            .fetch_add(batches.len() as u64, Ordering::Relaxed);

        let fetches = batches.into_iter().map(|composite| self.fetch(composite));
        let results: Vec<_> = stream::iter(fetches)
            .buffer_unordered(self.config.max_concurrent_batches.max(1))
            .collect()
            .await;

        let mut merged = RrdResult::new();
        for result in results {
            merged.merge(result?);
        }
        self.update(context, merged);

        Ok(self.compose(context, templates))
    }

    /// Compose metadata from the registries without network access
    #[must_use]
    pub fn lookup(&self, context: &StatementContext, template: &AddressTemplate) -> Metadata {
        Metadata::new(
            template.clone(),
            self.descriptions.get(template, context),
            self.security_contexts.get(template, context),
        )
    }

    fn check(
        &self,
        context: &StatementContext,
        templates: &[AddressTemplate],
        recursive: bool,
    ) -> RepositoryStatus {
        let mut status = RepositoryStatus::new(templates);
        for template in templates {
            if self.descriptions.satisfies(template, context, recursive) {
                status.mark_resource_description(template);
            }
            if self.security_contexts.satisfies(template, context, recursive) {
                status.mark_security_context(template);
            }
        }
        status
    }

    fn plan(
        &self,
        context: &StatementContext,
        status: &RepositoryStatus,
        recursive: bool,
    ) -> MetaResult<Vec<Operation>> {
        let mut operations = Vec::new();
        for (template, bits) in status.missing() {
            let address = SecurityContextResolver
                .resolve(template, context)
                .to_resource_address()?;
            let mut operation = Operation::new(address, names::READ_RESOURCE_DESCRIPTION_OPERATION)
                .param(names::OPERATIONS, true);
            if bits & RepositoryStatus::SECURITY_CONTEXT_PRESENT == 0 {
                let access_control = if bits & RepositoryStatus::RESOURCE_DESCRIPTION_PRESENT == 0 {
                    names::COMBINED_DESCRIPTIONS
                } else {
                    names::TRIM_DESCRIPTIONS
                };
                operation = operation.param(names::ACCESS_CONTROL, access_control);
            }
            if recursive {
                operation = operation.param(names::RECURSIVE_DEPTH, self.config.recursive_depth);
            }
            operations.push(operation);
        }
        Ok(operations)
    }

    async fn fetch(&self, composite: Composite) -> MetaResult<RrdResult> {
        let response = self.dispatcher.execute_composite(&composite).await?;
        let mut result = RrdResult::new();
        RrdParser::parse(&composite, &response, &mut result)?;
        Ok(result)
    }

    fn update(&self, context: &StatementContext, result: RrdResult) {
        let mut added = 0usize;
        for (address, entry) in result {
            let template = match AddressTemplate::try_from(&address) {
                Ok(template) => template,
                Err(e) => {
                    warn!(address = %address, error = %e, "Skipping metadata for unaddressable resource");
                    continue;
                }
            };
            if let Some(description) = entry.resource_description
                && self.descriptions.add(&template, context, description)
            {
                added += 1;
            }
            if let Some(security_context) = entry.security_context
                && self.security_contexts.add(&template, context, security_context)
            {
                added += 1;
            }
        }
        debug!(added, "Registered fetched metadata");
    }

    fn compose(&self, context: &StatementContext, templates: &[AddressTemplate]) -> Metadata {
        match templates {
            [template] if !template.has_wildcards() => self.lookup(context, template),
            _ => {
                warn!(
                    templates = templates.len(),
                    "Multiple or wildcard results cannot be collapsed into one metadata"
                );
                Metadata::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use modelmeta_common::{
        CompositeResult, DispatchError, DispatchResult, ModelNode, StepResult,
    };
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    /// Answers every `read-resource-description` with a canned description
    #[derive(Default)]
    struct MockDispatcher {
        composites: Mutex<Vec<Composite>>,
        fail: Option<DispatchError>,
        fail_step: Option<usize>,
    }

    impl MockDispatcher {
        fn failing(error: DispatchError) -> Self {
            Self {
                fail: Some(error),
                ..Self::default()
            }
        }

        fn sent(&self) -> Vec<Composite> {
            self.composites.lock().clone()
        }

        fn operations(&self) -> Vec<Operation> {
            self.sent()
                .iter()
                .flat_map(|c| c.steps().to_vec())
                .collect()
        }
    }

    fn answer(operation: &Operation) -> ModelNode {
        let mut payload = json!({
            "description": operation.address().to_string(),
            "attributes": {"enabled": {"type": "BOOLEAN"}},
            "operations": {"add": {}},
        });
        if operation.get_param(names::ACCESS_CONTROL).is_some() {
            payload["access-control"] = json!({
                "default": {"read": true, "write": true},
                "exceptions": {},
            });
        }
        payload
    }

    #[async_trait]
    impl Dispatcher for MockDispatcher {
        fn name(&self) -> &str {
            "mock"
        }

        async fn execute(&self, operation: &Operation) -> DispatchResult<ModelNode> {
            Ok(answer(operation))
        }

        async fn execute_composite(
            &self,
            composite: &Composite,
        ) -> DispatchResult<CompositeResult> {
            self.composites.lock().push(composite.clone());
            if let Some(error) = &self.fail {
                return Err(error.clone());
            }
            Ok(CompositeResult::new(
                composite
                    .steps()
                    .iter()
                    .enumerate()
                    .map(|(index, op)| {
                        if self.fail_step == Some(index) {
                            StepResult::failed("WFLYCTL0216: Management resource not found")
                        } else {
                            StepResult::success(answer(op))
                        }
                    })
                    .collect(),
            ))
        }
    }

    fn processor(dispatcher: &Arc<MockDispatcher>) -> MetadataProcessor {
        MetadataProcessor::from_config(dispatcher.clone(), &MetaConfig::default()).unwrap()
    }

    fn templates(texts: &[&str]) -> Vec<AddressTemplate> {
        texts
            .iter()
            .map(|t| AddressTemplate::of(t).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_fetch_then_short_circuit() {
        let dispatcher = Arc::new(MockDispatcher::default());
        let processor = processor(&dispatcher);
        let context = StatementContext::new().with("selection", "ExampleDS");
        let request = templates(&["/subsystem=datasources/data-source={selection}"]);

        let metadata = processor.process(&context, &request, false).await.unwrap();
        assert!(metadata.resource_description().is_some());
        assert!(metadata.security_context().unwrap().is_readable());
        assert_eq!(dispatcher.sent().len(), 1);

        let operation = &dispatcher.operations()[0];
        assert_eq!(
            operation.address().to_string(),
            "/subsystem=datasources/data-source=*"
        );
        assert_eq!(
            operation.get_param(names::ACCESS_CONTROL),
            Some(&json!(names::COMBINED_DESCRIPTIONS))
        );
        assert_eq!(operation.get_param(names::OPERATIONS), Some(&Value::Bool(true)));

        let again = processor.process(&context, &request, false).await.unwrap();
        assert_eq!(again, metadata);
        assert_eq!(dispatcher.sent().len(), 1);
        assert_eq!(processor.stats().short_circuits.load(Ordering::Relaxed), 1);
        assert_eq!(processor.stats().requests.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_operation_parameters_follow_status() {
        let dispatcher = Arc::new(MockDispatcher::default());
        let processor = processor(&dispatcher);
        let context = StatementContext::new();
        let [with_description, with_security]: [AddressTemplate; 2] =
            templates(&["/subsystem=ee", "/subsystem=jmx"]).try_into().unwrap();

        processor.descriptions().add(
            &with_description,
            &context,
            crate::ResourceDescription::new(json!({"description": "ee"}), false),
        );
        processor.security_contexts().add(
            &with_security,
            &context,
            crate::SecurityContext::new(json!({"read": true}), false),
        );

        processor
            .process(&context, &[with_description.clone(), with_security.clone()], false)
            .await
            .unwrap();

        let operations = dispatcher.operations();
        let find = |address: &str| {
            operations
                .iter()
                .find(|op| op.address().to_string() == address)
                .unwrap()
                .clone()
        };
        let ee = find("/subsystem=ee");
        assert_eq!(
            ee.get_param(names::ACCESS_CONTROL),
            Some(&json!(names::TRIM_DESCRIPTIONS))
        );
        let jmx = find("/subsystem=jmx");
        assert!(jmx.get_param(names::ACCESS_CONTROL).is_none());
        assert_eq!(jmx.get_param(names::OPERATIONS), Some(&Value::Bool(true)));

        assert_eq!(
            processor
                .descriptions()
                .get(&with_description, &context)
                .unwrap()
                .description(),
            Some("ee")
        );
        assert!(processor.security_contexts().contains(&with_description, &context));
        assert!(processor.descriptions().contains(&with_security, &context));
    }

    #[tokio::test]
    async fn test_batching() {
        let dispatcher = Arc::new(MockDispatcher::default());
        let processor = processor(&dispatcher);
        let request = templates(&[
            "/subsystem=ee",
            "/subsystem=jmx",
            "/subsystem=logging",
            "/subsystem=naming",
            "/subsystem=undertow",
            "/subsystem=datasources",
            "/subsystem=transactions",
        ]);

        let metadata = processor
            .process(&StatementContext::new(), &request, false)
            .await
            .unwrap();
        assert!(metadata.is_empty());

        let mut sizes: Vec<usize> = dispatcher.sent().iter().map(Composite::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 3, 3]);
        assert_eq!(processor.stats().batches.load(Ordering::Relaxed), 3);
        assert_eq!(processor.descriptions().len(), 7);
        assert_eq!(processor.security_contexts().len(), 7);
    }

    #[tokio::test]
    async fn test_recursive_request_refetches_shallow_entries() {
        let dispatcher = Arc::new(MockDispatcher::default());
        let processor = processor(&dispatcher);
        let context = StatementContext::new();
        let request = templates(&["/subsystem=logging"]);

        processor.process(&context, &request, false).await.unwrap();
        assert!(dispatcher.operations()[0].get_param(names::RECURSIVE_DEPTH).is_none());

        // the recursive answer is fetched, but the shallow entries keep their keys
        let metadata = processor.process(&context, &request, true).await.unwrap();
        assert_eq!(dispatcher.sent().len(), 2);
        assert_eq!(
            dispatcher.operations()[1].get_param(names::RECURSIVE_DEPTH),
            Some(&json!(2))
        );
        assert!(!metadata.resource_description().unwrap().is_recursive());
        assert!(!metadata.security_context().unwrap().is_recursive());

        processor.process(&context, &request, true).await.unwrap();
        assert_eq!(dispatcher.sent().len(), 3);
        processor.process(&context, &request, false).await.unwrap();
        assert_eq!(dispatcher.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_recursive_entries_serve_shallow_requests() {
        let dispatcher = Arc::new(MockDispatcher::default());
        let processor = processor(&dispatcher);
        let context = StatementContext::new();
        let request = templates(&["/subsystem=logging"]);

        let metadata = processor.process(&context, &request, true).await.unwrap();
        assert!(metadata.resource_description().unwrap().is_recursive());
        processor.process(&context, &request, true).await.unwrap();
        processor.process(&context, &request, false).await.unwrap();
        assert_eq!(dispatcher.sent().len(), 1);
        assert_eq!(processor.stats().short_circuits.load(Ordering::Relaxed), 2);
        assert!((processor.stats().short_circuit_ratio() - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_host_and_server_in_wire_address() {
        let dispatcher = Arc::new(MockDispatcher::default());
        let processor = processor(&dispatcher);
        let context = StatementContext::new()
            .with("selected-host", "primary")
            .with("selected-server", "server-one");
        let request = templates(&["/{selected-host}/server={selected-server}/subsystem=logging"]);

        let metadata = processor.process(&context, &request, false).await.unwrap();
        assert_eq!(
            dispatcher.operations()[0].address().to_string(),
            "/host=primary/server=server-one/subsystem=logging"
        );
        assert!(metadata.security_context().is_some());
        assert_eq!(
            metadata.resource_description().unwrap().description(),
            Some("/host=primary/server=server-one/subsystem=logging")
        );

        // same schema on another server, different permissions
        let other = context.clone().with("selected-server", "server-two");
        let metadata = processor.lookup(&other, &request[0]);
        assert!(metadata.resource_description().is_some());
        assert!(metadata.security_context().is_none());
    }

    #[tokio::test]
    async fn test_wildcard_request_composes_empty() {
        let dispatcher = Arc::new(MockDispatcher::default());
        let processor = processor(&dispatcher);
        let metadata = processor
            .process(
                &StatementContext::new(),
                &templates(&["/subsystem=datasources/data-source=*"]),
                false,
            )
            .await
            .unwrap();
        assert!(metadata.is_empty());
        assert_eq!(dispatcher.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_fails_call() {
        let dispatcher = Arc::new(MockDispatcher::failing(DispatchError::Timeout));
        let processor = processor(&dispatcher);
        let err = processor
            .process(&StatementContext::new(), &templates(&["/subsystem=ee"]), false)
            .await
            .unwrap_err();
        assert!(matches!(err, MetaError::Dispatch(DispatchError::Timeout)));
        assert!(err.is_retryable());
        assert!(processor.descriptions().is_empty());
    }

    #[tokio::test]
    async fn test_failed_step_is_parse_error() {
        let dispatcher = Arc::new(MockDispatcher {
            fail_step: Some(1),
            ..MockDispatcher::default()
        });
        let processor = processor(&dispatcher);
        let err = processor
            .process(
                &StatementContext::new(),
                &templates(&["/subsystem=ee", "/subsystem=missing"]),
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MetaError::Parse(crate::ParseError::StepFailed { index: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_unresolvable_template() {
        let dispatcher = Arc::new(MockDispatcher::default());
        let processor = processor(&dispatcher);
        let custom = modelmeta_template::Segment::placeholder(&modelmeta_template::Placeholder::new(
            "tenant", None, true,
        ));
        let template = AddressTemplate::root().append_segment(custom);
        let err = processor
            .process(&StatementContext::new(), &[template], false)
            .await
            .unwrap_err();
        assert!(matches!(err, MetaError::Template(_)));
        assert!(dispatcher.sent().is_empty());
    }

    #[tokio::test]
    async fn test_no_templates() {
        let dispatcher = Arc::new(MockDispatcher::default());
        let processor = processor(&dispatcher);
        let err = processor
            .process(&StatementContext::new(), &[], false)
            .await
            .unwrap_err();
        assert!(matches!(err, MetaError::NoTemplates));
    }
}
