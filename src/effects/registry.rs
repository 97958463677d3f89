//! Effect registry
//!
//! Definitions are kept in registration order, which is also the order the
//! CLI lists them in. Registering a type a second time replaces it.

use std::sync::Arc;

use super::traits::{CpuEffectRuntime, EffectDefinition, EffectProcessor, GpuEffectRuntime};
use super::EffectInstance;

/// Registry of available effects
pub struct EffectRegistry {
    definitions: Vec<Arc<dyn EffectDefinition>>,
    next_instance_id: u32,
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            next_instance_id: 1,
        }
    }

    /// Register an effect definition
    pub fn register(&mut self, definition: impl EffectDefinition + 'static) {
        let effect_type = definition.effect_type();
        let definition: Arc<dyn EffectDefinition> = Arc::new(definition);

        match self.definitions.iter().position(|d| d.effect_type() == effect_type) {
            Some(index) => {
                tracing::debug!(effect = effect_type, "Replaced effect");
                self.definitions[index] = definition;
            }
            None => {
                tracing::debug!(effect = effect_type, category = definition.category(), "Registered effect");
                self.definitions.push(definition);
            }
        }
    }

    /// Look up a definition by effect type
    pub fn get(&self, effect_type: &str) -> Option<Arc<dyn EffectDefinition>> {
        self.definitions
            .iter()
            .find(|d| d.effect_type() == effect_type)
            .cloned()
    }

    /// Category names in the order they first appeared
    pub fn categories(&self) -> Vec<&'static str> {
        let mut categories: Vec<&'static str> = Vec::new();
        for definition in &self.definitions {
            if !categories.contains(&definition.category()) {
                categories.push(definition.category());
            }
        }
        categories
    }

    /// Definitions in one category
    pub fn effects_in_category(&self, category: &str) -> Vec<Arc<dyn EffectDefinition>> {
        self.definitions
            .iter()
            .filter(|d| d.category() == category)
            .cloned()
            .collect()
    }

    /// Preferred processor of an effect type
    pub fn processor(&self, effect_type: &str) -> Option<EffectProcessor> {
        self.get(effect_type).map(|d| d.processor())
    }

    /// Case-insensitive match on display name, effect type or category
    pub fn search(&self, query: &str) -> Vec<Arc<dyn EffectDefinition>> {
        let query = query.to_lowercase();
        self.definitions
            .iter()
            .filter(|d| {
                [d.display_name(), d.effect_type(), d.category()]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&query))
            })
            .cloned()
            .collect()
    }

    /// New instance with default parameters and a fresh id
    pub fn create_instance(&mut self, effect_type: &str) -> Option<EffectInstance> {
        let parameters = self.get(effect_type)?.default_parameters();
        let id = self.next_instance_id;
        self.next_instance_id += 1;
        Some(EffectInstance::new(id, effect_type, parameters))
    }

    pub fn create_gpu_runtime(
        &self,
        effect_type: &str,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        output_format: wgpu::TextureFormat,
    ) -> Option<Box<dyn GpuEffectRuntime>> {
        self.get(effect_type)?
            .create_gpu_runtime(device, queue, output_format)
    }

    pub fn create_cpu_runtime(&self, effect_type: &str) -> Option<Box<dyn CpuEffectRuntime>> {
        self.get(effect_type)?.create_cpu_runtime()
    }
}
