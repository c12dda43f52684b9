//! Built-in Field kinds (spec §4.A minimum set): integer, float, boolean,
//! string, enum, model identifier, board identifier, image reference,
//! latents reference, color, LoRA reference, scheduler name.

use regex::Regex;
use serde_json::{json, Value};

use super::{ClassifyTriple, Field, FieldDescription, FieldKind, FieldRegistry, ValidationErrors};

fn metadata_str<'a>(metadata: &'a Value, key: &str) -> Option<&'a str> {
    metadata.get(key).and_then(Value::as_str)
}

fn metadata_f64(metadata: &Value, key: &str) -> Option<f64> {
    metadata.get(key).and_then(Value::as_f64)
}

fn metadata_i64(metadata: &Value, key: &str) -> Option<i64> {
    metadata.get(key).and_then(Value::as_i64)
}

// ---------------------------------------------------------------- Integer

#[derive(Debug, Clone)]
pub struct IntegerField {
    value: Option<i64>,
    minimum: Option<i64>,
    maximum: Option<i64>,
}

impl IntegerField {
    #[must_use]
    pub fn new(value: Option<i64>, minimum: Option<i64>, maximum: Option<i64>) -> Self {
        Self {
            value,
            minimum,
            maximum,
        }
    }

    fn from_metadata(metadata: &Value) -> Self {
        Self::new(
            metadata_i64(metadata, "default"),
            metadata_i64(metadata, "minimum"),
            metadata_i64(metadata, "maximum"),
        )
    }
}

impl Field for IntegerField {
    fn kind(&self) -> FieldKind {
        FieldKind::new(FieldKind::INTEGER)
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn validate(&self) -> ValidationErrors {
        let mut errors = Vec::new();
        if let Some(value) = self.value {
            if let Some(min) = self.minimum {
                if value < min {
                    errors.push(format!("value {value} is below minimum {min}"));
                }
            }
            if let Some(max) = self.maximum {
                if value > max {
                    errors.push(format!("value {value} is above maximum {max}"));
                }
            }
        }
        errors
    }

    fn to_api(&self) -> Option<Value> {
        self.value.map(Value::from)
    }

    fn from_api(&mut self, value: Value) -> Result<(), String> {
        let parsed = value
            .as_i64()
            .ok_or_else(|| format!("expected integer, got {value}"))?;
        self.value = Some(parsed);
        Ok(())
    }

    fn describe(&self) -> FieldDescription {
        FieldDescription {
            kind: self.kind(),
            constraints: json!({ "minimum": self.minimum, "maximum": self.maximum }),
        }
    }
}

// ------------------------------------------------------------------ Float

#[derive(Debug, Clone)]
pub struct FloatField {
    value: Option<f64>,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

impl FloatField {
    #[must_use]
    pub fn new(value: Option<f64>, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        Self {
            value,
            minimum,
            maximum,
        }
    }

    fn from_metadata(metadata: &Value) -> Self {
        Self::new(
            metadata_f64(metadata, "default"),
            metadata_f64(metadata, "minimum"),
            metadata_f64(metadata, "maximum"),
        )
    }
}

impl Field for FloatField {
    fn kind(&self) -> FieldKind {
        FieldKind::new(FieldKind::FLOAT)
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn validate(&self) -> ValidationErrors {
        let mut errors = Vec::new();
        if let Some(value) = self.value {
            if let Some(min) = self.minimum {
                if value < min {
                    errors.push(format!("value {value} is below minimum {min}"));
                }
            }
            if let Some(max) = self.maximum {
                if value > max {
                    errors.push(format!("value {value} is above maximum {max}"));
                }
            }
        }
        errors
    }

    fn to_api(&self) -> Option<Value> {
        self.value.and_then(serde_json::Number::from_f64).map(Value::Number)
    }

    fn from_api(&mut self, value: Value) -> Result<(), String> {
        let parsed = value
            .as_f64()
            .ok_or_else(|| format!("expected float, got {value}"))?;
        self.value = Some(parsed);
        Ok(())
    }

    fn describe(&self) -> FieldDescription {
        FieldDescription {
            kind: self.kind(),
            constraints: json!({ "minimum": self.minimum, "maximum": self.maximum }),
        }
    }
}

// --------------------------------------------------------------- Boolean

#[derive(Debug, Clone)]
pub struct BooleanField {
    value: Option<bool>,
}

impl BooleanField {
    #[must_use]
    pub fn new(value: Option<bool>) -> Self {
        Self { value }
    }

    fn from_metadata(metadata: &Value) -> Self {
        Self::new(metadata.get("default").and_then(Value::as_bool))
    }
}

impl Field for BooleanField {
    fn kind(&self) -> FieldKind {
        FieldKind::new(FieldKind::BOOLEAN)
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn validate(&self) -> ValidationErrors {
        Vec::new()
    }

    fn to_api(&self) -> Option<Value> {
        self.value.map(Value::from)
    }

    fn from_api(&mut self, value: Value) -> Result<(), String> {
        let parsed = value
            .as_bool()
            .ok_or_else(|| format!("expected boolean, got {value}"))?;
        self.value = Some(parsed);
        Ok(())
    }

    fn describe(&self) -> FieldDescription {
        FieldDescription {
            kind: self.kind(),
            constraints: json!({}),
        }
    }
}

// ---------------------------------------------------------------- String

#[derive(Debug, Clone)]
pub struct StringField {
    value: Option<String>,
    pattern: Option<String>,
    max_length: Option<usize>,
    unresolved: bool,
}

impl StringField {
    #[must_use]
    pub fn new(value: Option<String>) -> Self {
        Self {
            value,
            pattern: None,
            max_length: None,
            unresolved: false,
        }
    }

    #[must_use]
    pub fn with_constraints(
        value: Option<String>,
        pattern: Option<String>,
        max_length: Option<usize>,
    ) -> Self {
        Self {
            value,
            pattern,
            max_length,
            unresolved: false,
        }
    }

    /// The generic fallback constructed when no registry rule matches a
    /// triple in non-strict mode. Preserves any `default` value from the
    /// field's metadata so the fallback is still usable.
    #[must_use]
    pub fn unresolved_fallback(metadata: &Value) -> Self {
        let default = metadata_str(metadata, "default").map(str::to_string);
        Self {
            value: default,
            pattern: None,
            max_length: None,
            unresolved: true,
        }
    }

    fn from_metadata(metadata: &Value) -> Self {
        Self::with_constraints(
            metadata_str(metadata, "default").map(str::to_string),
            metadata_str(metadata, "pattern").map(str::to_string),
            metadata
                .get("max_length")
                .and_then(Value::as_u64)
                .map(|n| n as usize),
        )
    }
}

impl Field for StringField {
    fn kind(&self) -> FieldKind {
        if self.unresolved {
            FieldKind::new(FieldKind::UNRESOLVED)
        } else {
            FieldKind::new(FieldKind::STRING)
        }
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn validate(&self) -> ValidationErrors {
        let mut errors = Vec::new();
        if let Some(value) = &self.value {
            if let Some(max_length) = self.max_length {
                if value.len() > max_length {
                    errors.push(format!(
                        "value length {} exceeds maximum {max_length}",
                        value.len()
                    ));
                }
            }
            if let Some(pattern) = &self.pattern {
                match Regex::new(pattern) {
                    Ok(re) if !re.is_match(value) => {
                        errors.push(format!("value does not match pattern {pattern}"));
                    }
                    Err(e) => errors.push(format!("invalid pattern {pattern}: {e}")),
                    _ => {}
                }
            }
        }
        errors
    }

    fn to_api(&self) -> Option<Value> {
        self.value.clone().map(Value::from)
    }

    fn from_api(&mut self, value: Value) -> Result<(), String> {
        let parsed = value
            .as_str()
            .ok_or_else(|| format!("expected string, got {value}"))?
            .to_string();
        self.value = Some(parsed);
        Ok(())
    }

    fn describe(&self) -> FieldDescription {
        FieldDescription {
            kind: self.kind(),
            constraints: json!({ "pattern": self.pattern, "max_length": self.max_length }),
        }
    }
}

// ------------------------------------------------------------------ Enum

#[derive(Debug, Clone)]
pub struct EnumField {
    value: Option<String>,
    allowed: Vec<String>,
}

impl EnumField {
    #[must_use]
    pub fn new(value: Option<String>, allowed: Vec<String>) -> Self {
        Self { value, allowed }
    }

    fn from_metadata(metadata: &Value) -> Self {
        let allowed = metadata
            .get("options")
            .or_else(|| metadata.get("allowed"))
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self::new(
            metadata_str(metadata, "default").map(str::to_string),
            allowed,
        )
    }
}

impl Field for EnumField {
    fn kind(&self) -> FieldKind {
        FieldKind::new(FieldKind::ENUM)
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn validate(&self) -> ValidationErrors {
        match &self.value {
            Some(value) if !self.allowed.is_empty() && !self.allowed.contains(value) => {
                vec![format!(
                    "value {value:?} is not one of the allowed options: {:?}",
                    self.allowed
                )]
            }
            _ => Vec::new(),
        }
    }

    fn to_api(&self) -> Option<Value> {
        self.value.clone().map(Value::from)
    }

    fn from_api(&mut self, value: Value) -> Result<(), String> {
        let parsed = value
            .as_str()
            .ok_or_else(|| format!("expected string (enum), got {value}"))?
            .to_string();
        self.value = Some(parsed);
        Ok(())
    }

    fn describe(&self) -> FieldDescription {
        FieldDescription {
            kind: self.kind(),
            constraints: json!({ "allowed": self.allowed }),
        }
    }
}

// ------------------------------------------------------- Model identifier

/// A model identifier: key + name + base + type, the compound kind
/// servers use to address a specific installed model checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ModelIdentifierValue {
    pub key: String,
    pub name: String,
    pub base: String,
    #[serde(rename = "type")]
    pub model_type: String,
}

#[derive(Debug, Clone)]
pub struct ModelIdentifierField {
    value: Option<ModelIdentifierValue>,
    base_domain: Option<Vec<String>>,
}

impl ModelIdentifierField {
    #[must_use]
    pub fn new(value: Option<ModelIdentifierValue>, base_domain: Option<Vec<String>>) -> Self {
        Self { value, base_domain }
    }

    fn from_metadata(_metadata: &Value) -> Self {
        Self::new(None, None)
    }
}

impl Field for ModelIdentifierField {
    fn kind(&self) -> FieldKind {
        FieldKind::new(FieldKind::MODEL_IDENTIFIER)
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn validate(&self) -> ValidationErrors {
        match (&self.value, &self.base_domain) {
            (Some(value), Some(domain)) if !domain.contains(&value.base) => {
                vec![format!(
                    "model base {:?} is not in the allowed domain {domain:?}",
                    value.base
                )]
            }
            _ => Vec::new(),
        }
    }

    fn to_api(&self) -> Option<Value> {
        self.value
            .as_ref()
            .map(|v| serde_json::to_value(v).expect("ModelIdentifierValue always serializes"))
    }

    fn from_api(&mut self, value: Value) -> Result<(), String> {
        let parsed: ModelIdentifierValue =
            serde_json::from_value(value).map_err(|e| format!("invalid model identifier: {e}"))?;
        self.value = Some(parsed);
        Ok(())
    }

    fn describe(&self) -> FieldDescription {
        FieldDescription {
            kind: self.kind(),
            constraints: json!({ "base_domain": self.base_domain }),
        }
    }
}

// ------------------------------------------------------- Board identifier

#[derive(Debug, Clone)]
pub struct BoardIdentifierField {
    value: Option<String>,
}

impl BoardIdentifierField {
    /// Sentinel value meaning "the server's uncategorized board".
    pub const UNCATEGORIZED: &'static str = "none";

    #[must_use]
    pub fn new(value: Option<String>) -> Self {
        Self { value }
    }

    fn from_metadata(metadata: &Value) -> Self {
        Self::new(metadata_str(metadata, "default").map(str::to_string))
    }
}

impl Field for BoardIdentifierField {
    fn kind(&self) -> FieldKind {
        FieldKind::new(FieldKind::BOARD_IDENTIFIER)
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn validate(&self) -> ValidationErrors {
        Vec::new()
    }

    fn to_api(&self) -> Option<Value> {
        self.value.clone().map(Value::from)
    }

    fn from_api(&mut self, value: Value) -> Result<(), String> {
        let parsed = value
            .as_str()
            .ok_or_else(|| format!("expected board id string, got {value}"))?
            .to_string();
        self.value = Some(parsed);
        Ok(())
    }

    fn describe(&self) -> FieldDescription {
        FieldDescription {
            kind: self.kind(),
            constraints: json!({}),
        }
    }
}

// -------------------------------------------------------- Image reference

#[derive(Debug, Clone)]
pub struct ImageReferenceField {
    value: Option<String>,
}

impl ImageReferenceField {
    #[must_use]
    pub fn new(value: Option<String>) -> Self {
        Self { value }
    }

    fn from_metadata(_metadata: &Value) -> Self {
        Self::new(None)
    }
}

impl Field for ImageReferenceField {
    fn kind(&self) -> FieldKind {
        FieldKind::new(FieldKind::IMAGE_REFERENCE)
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn validate(&self) -> ValidationErrors {
        Vec::new()
    }

    fn to_api(&self) -> Option<Value> {
        self.value
            .clone()
            .map(|name| json!({ "image_name": name }))
    }

    fn from_api(&mut self, value: Value) -> Result<(), String> {
        let name = value
            .get("image_name")
            .and_then(Value::as_str)
            .or_else(|| value.as_str())
            .ok_or_else(|| format!("expected image reference, got {value}"))?
            .to_string();
        self.value = Some(name);
        Ok(())
    }

    fn describe(&self) -> FieldDescription {
        FieldDescription {
            kind: self.kind(),
            constraints: json!({}),
        }
    }
}

// ------------------------------------------------------ Latents reference

#[derive(Debug, Clone)]
pub struct LatentsReferenceField {
    value: Option<String>,
}

impl LatentsReferenceField {
    #[must_use]
    pub fn new(value: Option<String>) -> Self {
        Self { value }
    }

    fn from_metadata(_metadata: &Value) -> Self {
        Self::new(None)
    }
}

impl Field for LatentsReferenceField {
    fn kind(&self) -> FieldKind {
        FieldKind::new(FieldKind::LATENTS_REFERENCE)
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn validate(&self) -> ValidationErrors {
        Vec::new()
    }

    fn to_api(&self) -> Option<Value> {
        self.value
            .clone()
            .map(|name| json!({ "latents_name": name }))
    }

    fn from_api(&mut self, value: Value) -> Result<(), String> {
        let name = value
            .get("latents_name")
            .and_then(Value::as_str)
            .or_else(|| value.as_str())
            .ok_or_else(|| format!("expected latents reference, got {value}"))?
            .to_string();
        self.value = Some(name);
        Ok(())
    }

    fn describe(&self) -> FieldDescription {
        FieldDescription {
            kind: self.kind(),
            constraints: json!({}),
        }
    }
}

// ------------------------------------------------------------------ Color

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RgbaColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Debug, Clone)]
pub struct ColorField {
    value: Option<RgbaColor>,
}

impl ColorField {
    #[must_use]
    pub fn new(value: Option<RgbaColor>) -> Self {
        Self { value }
    }

    fn from_metadata(_metadata: &Value) -> Self {
        Self::new(None)
    }
}

impl Field for ColorField {
    fn kind(&self) -> FieldKind {
        FieldKind::new(FieldKind::COLOR)
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn validate(&self) -> ValidationErrors {
        Vec::new()
    }

    fn to_api(&self) -> Option<Value> {
        self.value
            .map(|c| serde_json::to_value(c).expect("RgbaColor always serializes"))
    }

    fn from_api(&mut self, value: Value) -> Result<(), String> {
        let parsed: RgbaColor =
            serde_json::from_value(value).map_err(|e| format!("invalid RGBA color: {e}"))?;
        self.value = Some(parsed);
        Ok(())
    }

    fn describe(&self) -> FieldDescription {
        FieldDescription {
            kind: self.kind(),
            constraints: json!({}),
        }
    }
}

// -------------------------------------------------------- LoRA reference

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoraReferenceValue {
    pub lora: ModelIdentifierValue,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct LoraReferenceField {
    value: Option<LoraReferenceValue>,
}

impl LoraReferenceField {
    #[must_use]
    pub fn new(value: Option<LoraReferenceValue>) -> Self {
        Self { value }
    }

    fn from_metadata(_metadata: &Value) -> Self {
        Self::new(None)
    }
}

impl Field for LoraReferenceField {
    fn kind(&self) -> FieldKind {
        FieldKind::new(FieldKind::LORA_REFERENCE)
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn validate(&self) -> ValidationErrors {
        match &self.value {
            Some(v) if !(0.0..=2.0).contains(&v.weight) => {
                vec![format!("LoRA weight {} is outside [0.0, 2.0]", v.weight)]
            }
            _ => Vec::new(),
        }
    }

    fn to_api(&self) -> Option<Value> {
        self.value
            .as_ref()
            .map(|v| serde_json::to_value(v).expect("LoraReferenceValue always serializes"))
    }

    fn from_api(&mut self, value: Value) -> Result<(), String> {
        let parsed: LoraReferenceValue =
            serde_json::from_value(value).map_err(|e| format!("invalid LoRA reference: {e}"))?;
        self.value = Some(parsed);
        Ok(())
    }

    fn describe(&self) -> FieldDescription {
        FieldDescription {
            kind: self.kind(),
            constraints: json!({ "weight_range": [0.0, 2.0] }),
        }
    }
}

// --------------------------------------------------------- Scheduler name

#[derive(Debug, Clone)]
pub struct SchedulerNameField {
    value: Option<String>,
    allowed: Vec<String>,
}

impl SchedulerNameField {
    #[must_use]
    pub fn new(value: Option<String>, allowed: Vec<String>) -> Self {
        Self { value, allowed }
    }

    fn from_metadata(metadata: &Value) -> Self {
        let allowed = metadata
            .get("options")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self::new(
            metadata_str(metadata, "default").map(str::to_string),
            allowed,
        )
    }
}

impl Field for SchedulerNameField {
    fn kind(&self) -> FieldKind {
        FieldKind::new(FieldKind::SCHEDULER_NAME)
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn validate(&self) -> ValidationErrors {
        match &self.value {
            Some(value) if !self.allowed.is_empty() && !self.allowed.contains(value) => {
                vec![format!(
                    "scheduler {value:?} is not one of {:?}",
                    self.allowed
                )]
            }
            _ => Vec::new(),
        }
    }

    fn to_api(&self) -> Option<Value> {
        self.value.clone().map(Value::from)
    }

    fn from_api(&mut self, value: Value) -> Result<(), String> {
        let parsed = value
            .as_str()
            .ok_or_else(|| format!("expected scheduler name, got {value}"))?
            .to_string();
        self.value = Some(parsed);
        Ok(())
    }

    fn describe(&self) -> FieldDescription {
        FieldDescription {
            kind: self.kind(),
            constraints: json!({ "allowed": self.allowed }),
        }
    }
}

// ----------------------------------------------------- built-in detectors

/// Register the built-in detector/constructor pairs. Classification is
/// driven by `field_metadata["type"]`, the node schema's declared field
/// type, with a small number of higher-priority overrides for
/// destination-like fields (e.g. a `board` field is always a board
/// identifier even if its declared type is a bare string).
pub(super) fn register_builtins(registry: &mut FieldRegistry) {
    registry.register(
        100,
        |t: &ClassifyTriple<'_>| t.field_name == "board",
        |t| Box::new(BoardIdentifierField::from_metadata(t.field_metadata)),
    );
    registry.register(
        90,
        |t: &ClassifyTriple<'_>| metadata_str(t.field_metadata, "type") == Some("model_identifier"),
        |t| Box::new(ModelIdentifierField::from_metadata(t.field_metadata)),
    );
    registry.register(
        90,
        |t: &ClassifyTriple<'_>| metadata_str(t.field_metadata, "type") == Some("lora"),
        |t| Box::new(LoraReferenceField::from_metadata(t.field_metadata)),
    );
    registry.register(
        80,
        |t: &ClassifyTriple<'_>| metadata_str(t.field_metadata, "type") == Some("image"),
        |t| Box::new(ImageReferenceField::from_metadata(t.field_metadata)),
    );
    registry.register(
        80,
        |t: &ClassifyTriple<'_>| metadata_str(t.field_metadata, "type") == Some("latents"),
        |t| Box::new(LatentsReferenceField::from_metadata(t.field_metadata)),
    );
    registry.register(
        70,
        |t: &ClassifyTriple<'_>| metadata_str(t.field_metadata, "type") == Some("color"),
        |t| Box::new(ColorField::from_metadata(t.field_metadata)),
    );
    registry.register(
        70,
        |t: &ClassifyTriple<'_>| metadata_str(t.field_metadata, "type") == Some("scheduler"),
        |t| Box::new(SchedulerNameField::from_metadata(t.field_metadata)),
    );
    registry.register(
        60,
        |t: &ClassifyTriple<'_>| metadata_str(t.field_metadata, "type") == Some("enum"),
        |t| Box::new(EnumField::from_metadata(t.field_metadata)),
    );
    registry.register(
        50,
        |t: &ClassifyTriple<'_>| metadata_str(t.field_metadata, "type") == Some("integer"),
        |t| Box::new(IntegerField::from_metadata(t.field_metadata)),
    );
    registry.register(
        50,
        |t: &ClassifyTriple<'_>| metadata_str(t.field_metadata, "type") == Some("float"),
        |t| Box::new(FloatField::from_metadata(t.field_metadata)),
    );
    registry.register(
        50,
        |t: &ClassifyTriple<'_>| metadata_str(t.field_metadata, "type") == Some("boolean"),
        |t| Box::new(BooleanField::from_metadata(t.field_metadata)),
    );
    registry.register(
        40,
        |t: &ClassifyTriple<'_>| metadata_str(t.field_metadata, "type") == Some("string"),
        |t| Box::new(StringField::from_metadata(t.field_metadata)),
    );
}
