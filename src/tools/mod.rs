// src/tools/mod.rs

use crate::context::StepContext;
use crate::error::{CapabilityError, RegistryError};
use std::collections::HashMap;

pub mod camera;
pub mod params;

pub use params::{Alternative, Param, ParamKind};

/// Catalog entry for a registered capability.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilitySpec {
    pub name: String,
    pub description: String,
    pub param_hint: String,
}

/// A named action the orchestrator can invoke against the camera app.
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    fn param(&self) -> ParamKind {
        ParamKind::None
    }

    /// Words that identify this capability's subject in a command, used to
    /// find the clause stating its desired state.
    fn keywords(&self) -> &[&'static str] {
        &[]
    }

    /// Run the capability. `param` is `None` when the step did not state one.
    fn invoke(&self, param: Option<Param>, ctx: &StepContext) -> Result<String, CapabilityError>;

    fn spec(&self) -> CapabilitySpec {
        CapabilitySpec {
            name: self.name().into(),
            description: self.description().into(),
            param_hint: self.param().hint(),
        }
    }
}

type Handler = dyn Fn(Option<Param>, &StepContext) -> Result<String, CapabilityError> + Send + Sync;

/// Capability backed by a closure.
pub struct FnCapability {
    name: String,
    description: String,
    param: ParamKind,
    keywords: &'static [&'static str],
    handler: Box<Handler>,
}

impl FnCapability {
    pub fn new<F>(name: &str, description: &str, handler: F) -> Self
    where
        F: Fn(Option<Param>, &StepContext) -> Result<String, CapabilityError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            param: ParamKind::None,
            keywords: &[],
            handler: Box::new(handler),
        }
    }

    pub fn with_param(mut self, param: ParamKind) -> Self {
        self.param = param;
        self
    }

    pub fn with_keywords(mut self, keywords: &'static [&'static str]) -> Self {
        self.keywords = keywords;
        self
    }
}

impl Capability for FnCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn param(&self) -> ParamKind {
        self.param
    }

    fn keywords(&self) -> &[&'static str] {
        self.keywords
    }

    fn invoke(&self, param: Option<Param>, ctx: &StepContext) -> Result<String, CapabilityError> {
        (self.handler)(param, ctx)
    }
}

/// Name → capability mapping, built once and then only read.
#[derive(Default)]
pub struct CapabilityRegistry {
    entries: Vec<Box<dyn Capability>>,
    index: HashMap<String, usize>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C: Capability + 'static>(&mut self, capability: C) -> Result<(), RegistryError> {
        self.register_boxed(Box::new(capability))
    }

    pub fn register_boxed(&mut self, capability: Box<dyn Capability>) -> Result<(), RegistryError> {
        let name = capability.name().to_string();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateCapability(name));
        }
        tracing::debug!(capability = %name, "registered capability");
        self.index.insert(name, self.entries.len());
        self.entries.push(capability);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<C: Capability + 'static>(mut self, capability: C) -> Result<Self, RegistryError> {
        self.register(capability)?;
        Ok(self)
    }

    pub fn resolve(&self, name: &str) -> Result<&dyn Capability, RegistryError> {
        self.index
            .get(name)
            .map(|&i| self.entries[i].as_ref())
            .ok_or_else(|| RegistryError::UnknownCapability(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(name, description)` pairs in registration order.
    pub fn describe_all(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|c| (c.name(), c.description()))
            .collect()
    }

    pub fn specs(&self) -> Vec<CapabilitySpec> {
        self.entries.iter().map(|c| c.spec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(name: &str) -> FnCapability {
        let label = name.to_string();
        FnCapability::new(name, &format!("Echo {name}"), move |_, _| Ok(label.clone()))
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = CapabilityRegistry::new();
        registry.register(echo("open_camera")).unwrap();
        assert_eq!(
            registry.register(echo("open_camera")),
            Err(RegistryError::DuplicateCapability("open_camera".into()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resolve_unknown_fails() {
        let registry = CapabilityRegistry::new();
        assert!(matches!(
            registry.resolve("fly_drone"),
            Err(RegistryError::UnknownCapability(name)) if name == "fly_drone"
        ));
    }

    #[test]
    fn describe_all_keeps_registration_order() {
        let registry = CapabilityRegistry::new()
            .with(echo("zoom"))
            .and_then(|r| r.with(echo("apply")))
            .and_then(|r| r.with(echo("mute")))
            .unwrap();
        let names: Vec<_> = registry.describe_all().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zoom", "apply", "mute"]);
    }

    #[test]
    fn resolved_handler_is_invocable() {
        let registry = CapabilityRegistry::new().with(echo("open_camera")).unwrap();
        let capability = registry.resolve("open_camera").unwrap();
        let ctx = StepContext::new("open the camera", 1, 1);
        assert_eq!(capability.invoke(None, &ctx).unwrap(), "open_camera");
    }

    #[test]
    fn spec_includes_param_hint() {
        let capability = echo("set_background_effects").with_param(ParamKind::Flag);
        assert_eq!(capability.spec().param_hint, "ON or OFF");
    }
}
