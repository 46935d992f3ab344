//! The Tactical RMM provider: adapter catalog, configuration and dispatch.
//!
//! Schemas and validation come from the static [`ResourceKind`] and
//! [`DataSourceKind`] catalogs, so they work before `Configure`. Configuring
//! resolves a [`ClientConfig`](crate::config::ClientConfig), builds one
//! adapter per type around a shared [`ApiClient`] and swaps the registry in.
//! Operations issued before that fail with [`ProviderError::NotConfigured`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::client::ApiClient;
use crate::config::{self, ProviderConfig};
use crate::data_sources::{self, DataSourceKind, DynamicDataSource};
use crate::error::{ProviderError, Result};
use crate::resources::{self, DynamicResource, ResourceKind};
use crate::schema::{Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{AttributeChange, ImportedResource, PlanResult};
use crate::validation;

/// Adapters built for one configuration.
struct Registry {
    resources: BTreeMap<&'static str, Box<dyn DynamicResource>>,
    data_sources: BTreeMap<&'static str, Box<dyn DynamicDataSource>>,
}

impl Registry {
    fn build(
        client: &ApiClient,
        resources: &[ResourceKind],
        data_sources: &[DataSourceKind],
    ) -> Self {
        Self {
            resources: resources
                .iter()
                .map(|kind| (kind.type_name, (kind.build)(client.clone())))
                .collect(),
            data_sources: data_sources
                .iter()
                .map(|kind| (kind.type_name, (kind.build)(client.clone())))
                .collect(),
        }
    }
}

/// Provider serving scripts, script snippets and keystore entries.
pub struct TacticalRmmProvider {
    resources: Vec<ResourceKind>,
    data_sources: Vec<DataSourceKind>,
    registry: RwLock<Option<Arc<Registry>>>,
}

impl Default for TacticalRmmProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TacticalRmmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TacticalRmmProvider")
            .field("resources", &self.resources)
            .field("data_sources", &self.data_sources)
            .finish_non_exhaustive()
    }
}

impl TacticalRmmProvider {
    /// An unconfigured provider.
    pub fn new() -> Self {
        Self {
            resources: resources::kinds(),
            data_sources: data_sources::kinds(),
            registry: RwLock::new(None),
        }
    }

    fn resource_kind(&self, resource_type: &str) -> Result<&ResourceKind> {
        self.resources
            .iter()
            .find(|kind| kind.type_name == resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source_kind(&self, data_source_type: &str) -> Result<&DataSourceKind> {
        self.data_sources
            .iter()
            .find(|kind| kind.type_name == data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }

    async fn registry(&self) -> Result<Arc<Registry>> {
        self.registry.read().await.clone().ok_or_else(|| {
            ProviderError::NotConfigured(
                "Expected a configured Tactical RMM API client. Run Configure before any \
                 resource or data source operation."
                    .to_string(),
            )
        })
    }

    async fn with_resource<T, F, Fut>(&self, resource_type: &str, op: F) -> Result<T>
    where
        F: FnOnce(Arc<Registry>, &'static str) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let type_name = self.resource_kind(resource_type)?.type_name;
        let registry = self.registry().await?;
        op(registry, type_name).await
    }
}

fn resource<'a>(registry: &'a Registry, type_name: &str) -> Result<&'a dyn DynamicResource> {
    registry
        .resources
        .get(type_name)
        .map(|r| r.as_ref())
        .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
}

fn is_set(value: Option<&Value>) -> bool {
    value.map(|v| !v.is_null()).unwrap_or(false)
}

fn as_object(value: Value, what: &str) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ProviderError::InvalidRequest(format!(
            "{} must be an object, got {}",
            what, other
        ))),
    }
}

fn plan_create(schema: &Schema, proposed: Value, config: &Value) -> Result<PlanResult> {
    let mut planned = as_object(proposed, "proposed state")?;
    for (name, attr) in &schema.attributes {
        if attr.is_computed() && !is_set(config.get(name)) {
            planned.insert(name.clone(), Value::Null);
        }
    }

    let mut changes = Vec::new();
    for (name, attr) in &schema.attributes {
        if let Some(value) = planned.get(name).filter(|v| !v.is_null()) {
            let change = AttributeChange::added(name.as_str(), value.clone());
            changes.push(if attr.flags.sensitive { change.redacted() } else { change });
        }
    }

    Ok(PlanResult::with_changes(Value::Object(planned), changes, false))
}

fn plan_update(
    schema: &Schema,
    prior: Value,
    proposed: Value,
    config: &Value,
) -> Result<PlanResult> {
    let prior = as_object(prior, "prior state")?;
    let mut planned = as_object(proposed, "proposed state")?;

    for (name, attr) in &schema.attributes {
        let carry = name == "id" || (attr.is_computed() && !is_set(config.get(name)));
        if carry {
            let value = prior.get(name).cloned().unwrap_or(Value::Null);
            planned.insert(name.clone(), value);
        }
    }

    let mut changes = Vec::new();
    let mut requires_replace = false;
    for (name, attr) in &schema.attributes {
        let before = prior.get(name).filter(|v| !v.is_null());
        let after = planned.get(name).filter(|v| !v.is_null());
        let change = match (before, after) {
            (None, None) => continue,
            (Some(b), Some(a)) if b == a => continue,
            (None, Some(a)) => AttributeChange::added(name.as_str(), a.clone()),
            (Some(b), None) => AttributeChange::removed(name.as_str(), b.clone()),
            (Some(b), Some(a)) => AttributeChange::modified(name.as_str(), b.clone(), a.clone()),
        };
        requires_replace |= attr.force_new;
        changes.push(if attr.flags.sensitive { change.redacted() } else { change });
    }

    Ok(PlanResult::with_changes(Value::Object(planned), changes, requires_replace))
}

#[async_trait::async_trait]
impl ProviderService for TacticalRmmProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(config::provider_schema());
        for kind in &self.resources {
            schema = schema.with_resource(kind.type_name, (kind.schema)());
        }
        for kind in &self.data_sources {
            schema = schema.with_data_source(kind.type_name, (kind.schema)());
        }
        schema
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>> {
        let mut diagnostics = validation::validate(&config::provider_schema(), &config);
        validation::check_positive(&config, "request_timeout", &mut diagnostics);
        Ok(diagnostics)
    }

    #[instrument(skip_all)]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>> {
        let client_config = ProviderConfig::from_value(config)?.resolve()?;
        debug!(endpoint = %client_config.base_url, "Resolved provider configuration");

        let client = ApiClient::new(client_config)?;
        let registry = Registry::build(&client, &self.resources, &self.data_sources);
        *self.registry.write().await = Some(Arc::new(registry));

        info!(
            resources = self.resources.len(),
            data_sources = self.data_sources.len(),
            "Provider configured"
        );
        Ok(vec![])
    }

    async fn stop(&self) -> Result<()> {
        self.registry.write().await.take();
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>> {
        Ok((self.resource_kind(resource_type)?.validate)(&config))
    }

    #[instrument(skip(self, prior_state, proposed_state, config))]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult> {
        let schema = (self.resource_kind(resource_type)?.schema)();
        if proposed_state.is_null() {
            return Ok(PlanResult::no_change(Value::Null));
        }
        match prior_state {
            None | Some(Value::Null) => plan_create(&schema, proposed_state, &config),
            Some(prior) => plan_update(&schema, prior, proposed_state, &config),
        }
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value> {
        self.with_resource(resource_type, |registry, name| async move {
            resource(&registry, name)?.create(planned_state).await
        })
        .await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Option<Value>> {
        self.with_resource(resource_type, |registry, name| async move {
            resource(&registry, name)?.read(current_state).await
        })
        .await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value> {
        self.with_resource(resource_type, |registry, name| async move {
            resource(&registry, name)?
                .update(prior_state, planned_state)
                .await
        })
        .await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<()> {
        self.with_resource(resource_type, |registry, name| async move {
            resource(&registry, name)?.delete(current_state).await
        })
        .await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>> {
        let id = id.to_string();
        self.with_resource(resource_type, |registry, name| async move {
            let state = resource(&registry, name)?.import(&id)?;
            Ok(vec![ImportedResource::new(name, state)])
        })
        .await
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>> {
        Ok((self.data_source_kind(data_source_type)?.validate)(&config))
    }

    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value> {
        let type_name = self.data_source_kind(data_source_type)?.type_name;
        let registry = self.registry().await?;
        let source = registry
            .data_sources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))?;
        source.read(config).await
    }
}
