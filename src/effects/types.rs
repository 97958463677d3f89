//! Core effect data types
//!
//! Typed parameters with metadata, and `EffectInstance`, the per-use state of
//! an effect. These are plain data; GPU/CPU resources live in the runtimes.

/// Parameter value types supported by effects
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    /// Floating point value
    Float(f32),
    /// RGBA color (0.0-1.0 per channel)
    Color([f32; 4]),
    /// Enumeration (index into options list)
    Enum { index: usize, options: Vec<String> },
}

impl ParameterValue {
    /// Get the value as f32 (enum index for enums, 0.0 for colors)
    pub fn as_f32(&self) -> f32 {
        match self {
            ParameterValue::Float(v) => *v,
            ParameterValue::Enum { index, .. } => *index as f32,
            ParameterValue::Color(_) => 0.0,
        }
    }

    /// Number of float slots this value occupies when packed
    pub fn slot_count(&self) -> usize {
        match self {
            ParameterValue::Color(_) => 4,
            _ => 1,
        }
    }
}

/// Parameter metadata (name, label, default and range)
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterMeta {
    /// Identifier used in code and on the command line
    pub name: String,
    /// Human-readable label
    pub label: String,
    /// Default value
    pub default: ParameterValue,
    /// Minimum for float parameters
    pub min: Option<f32>,
    /// Maximum for float parameters
    pub max: Option<f32>,
}

impl ParameterMeta {
    /// Create a float parameter with a range
    pub fn float(name: &str, label: &str, default: f32, min: f32, max: f32) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            default: ParameterValue::Float(default),
            min: Some(min),
            max: Some(max),
        }
    }

    /// Create a color parameter
    pub fn color(name: &str, label: &str, default: [f32; 4]) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            default: ParameterValue::Color(default),
            min: None,
            max: None,
        }
    }

    /// Create an enumeration parameter
    pub fn enumeration(name: &str, label: &str, options: &[&str], default_index: usize) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            default: ParameterValue::Enum {
                index: default_index.min(options.len().saturating_sub(1)),
                options: options.iter().map(|s| s.to_string()).collect(),
            },
            min: None,
            max: None,
        }
    }
}

/// A parameter with its current value
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub meta: ParameterMeta,
    pub value: ParameterValue,
}

impl Parameter {
    /// Create a parameter at its default value
    pub fn new(meta: ParameterMeta) -> Self {
        let value = meta.default.clone();
        Self { meta, value }
    }

    /// Set the value, clamping floats to the declared range
    ///
    /// Returns false if the value has the wrong type or an out-of-range enum index.
    pub fn set(&mut self, value: ParameterValue) -> bool {
        let accepted = match (&self.value, value) {
            (ParameterValue::Float(_), ParameterValue::Float(v)) => {
                let min = self.meta.min.unwrap_or(f32::NEG_INFINITY);
                let max = self.meta.max.unwrap_or(f32::INFINITY);
                ParameterValue::Float(v.clamp(min, max))
            }
            (ParameterValue::Color(_), ParameterValue::Color(v)) => {
                ParameterValue::Color(v.map(|c| c.clamp(0.0, 1.0)))
            }
            (ParameterValue::Enum { options, .. }, ParameterValue::Enum { index, .. }) => {
                if index >= options.len() {
                    return false;
                }
                ParameterValue::Enum {
                    index,
                    options: options.clone(),
                }
            }
            _ => return false,
        };
        self.value = accepted;
        true
    }
}

/// An effect applied to a frame, with its own parameter values
#[derive(Debug, Clone)]
pub struct EffectInstance {
    /// Instance identifier
    pub id: u32,
    /// Effect type identifier (registry key)
    pub effect_type: String,
    /// Current parameters
    pub parameters: Vec<Parameter>,
}

impl EffectInstance {
    pub fn new(id: u32, effect_type: &str, parameters: Vec<Parameter>) -> Self {
        Self {
            id,
            effect_type: effect_type.to_string(),
            parameters,
        }
    }

    /// Look up a parameter by name
    pub fn get_parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.meta.name == name)
    }

    /// Set a parameter by name; returns false if unknown or rejected
    pub fn set_parameter(&mut self, name: &str, value: ParameterValue) -> bool {
        self.parameters
            .iter_mut()
            .find(|p| p.meta.name == name)
            .is_some_and(|p| p.set(value))
    }

    /// Select an enum option by its label; returns false if not found
    pub fn set_enum_option(&mut self, name: &str, option: &str) -> bool {
        let Some(param) = self.parameters.iter_mut().find(|p| p.meta.name == name) else {
            return false;
        };
        let ParameterValue::Enum { options, .. } = &param.value else {
            return false;
        };
        let Some(index) = options.iter().position(|o| o == option) else {
            return false;
        };
        let options = options.clone();
        param.set(ParameterValue::Enum { index, options })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_clamps_to_range() {
        let mut param = Parameter::new(ParameterMeta::float("strength", "Strength", 1.0, 0.0, 1.0));
        assert!(param.set(ParameterValue::Float(3.0)));
        assert_eq!(param.value, ParameterValue::Float(1.0));
        assert!(param.set(ParameterValue::Float(-2.0)));
        assert_eq!(param.value, ParameterValue::Float(0.0));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut param = Parameter::new(ParameterMeta::color("tint", "Tint", [1.0; 4]));
        assert!(!param.set(ParameterValue::Float(1.0)));
        assert_eq!(param.value, ParameterValue::Color([1.0; 4]));
    }

    #[test]
    fn test_enum_parameters() {
        let meta = ParameterMeta::enumeration("mode", "Mode", &["a", "b", "c"], 1);
        let mut instance = EffectInstance::new(1, "test", vec![Parameter::new(meta)]);

        assert_eq!(instance.get_parameter("mode").unwrap().value.as_f32(), 1.0);
        assert!(instance.set_enum_option("mode", "c"));
        assert_eq!(instance.get_parameter("mode").unwrap().value.as_f32(), 2.0);
        assert!(!instance.set_enum_option("mode", "z"));
        assert!(!instance.set_parameter(
            "mode",
            ParameterValue::Enum {
                index: 7,
                options: vec![]
            }
        ));
    }

    #[test]
    fn test_unknown_parameter() {
        let mut instance = EffectInstance::new(1, "test", vec![]);
        assert!(!instance.set_parameter("missing", ParameterValue::Float(1.0)));
        assert!(instance.get_parameter("missing").is_none());
    }

    #[test]
    fn test_slot_counts() {
        assert_eq!(ParameterValue::Float(0.0).slot_count(), 1);
        assert_eq!(ParameterValue::Color([0.0; 4]).slot_count(), 4);
    }
}
