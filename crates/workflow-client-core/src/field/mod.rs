//! Field Type Registry (spec component A).
//!
//! Owns the set of recognized field kinds and the classification rules
//! that decide which kind applies to a given (node-type, field-name,
//! field-metadata) triple, keeping Input Discovery (component C)
//! ignorant of type specifics (I6: open/closed — adding a field kind
//! never requires touching discovery or existing field code).

pub mod kinds;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

pub use kinds::*;

/// A tag identifying a Field's concrete semantic kind. Deliberately a
/// string newtype rather than a closed enum, so third parties can
/// register wholly new kinds (I6) without a recompile of this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct FieldKind(pub String);

impl FieldKind {
    pub const INTEGER: &'static str = "integer";
    pub const FLOAT: &'static str = "float";
    pub const BOOLEAN: &'static str = "boolean";
    pub const STRING: &'static str = "string";
    pub const ENUM: &'static str = "enum";
    pub const MODEL_IDENTIFIER: &'static str = "model_identifier";
    pub const BOARD_IDENTIFIER: &'static str = "board_identifier";
    pub const IMAGE_REFERENCE: &'static str = "image_reference";
    pub const LATENTS_REFERENCE: &'static str = "latents_reference";
    pub const COLOR: &'static str = "color";
    pub const LORA_REFERENCE: &'static str = "lora_reference";
    pub const SCHEDULER_NAME: &'static str = "scheduler_name";
    pub const UNRESOLVED: &'static str = "unresolved";

    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors produced by [`Field::validate`]. An empty vector means the
/// field is valid.
pub type ValidationErrors = Vec<String>;

/// Static description of a field, used for introspection / export (e.g.
/// rendering a UI form without the original document).
#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldDescription {
    pub kind: FieldKind,
    pub constraints: Value,
}

/// The typed wrapper for a single input's value and validation (spec
/// §3 "Field"). Implementations are polymorphic over a uniform
/// capability set; callers operate by index via [`crate::handle::WorkflowHandle`],
/// never by downcasting to a concrete type.
pub trait Field: fmt::Debug + Send + Sync {
    /// The concrete semantic kind. Fixed for the lifetime of the Field
    /// (I3): callers must never observe this change after creation.
    fn kind(&self) -> FieldKind;

    /// Whether a value is currently set.
    fn has_value(&self) -> bool;

    /// Validate the current value against this field's constraints.
    /// Does not know about "required" — that is a property of the
    /// surrounding Input Descriptor, not the Field.
    fn validate(&self) -> ValidationErrors;

    /// Serialize the current value to the wire JSON representation, or
    /// `None` if no value is set (nothing to substitute at submit time).
    fn to_api(&self) -> Option<Value>;

    /// Deserialize and adopt a wire JSON value. Returns an error message
    /// (not adopted) if `value`'s shape doesn't match this field's kind.
    fn from_api(&mut self, value: Value) -> Result<(), String>;

    /// Static description for introspection/export.
    fn describe(&self) -> FieldDescription;
}

/// The (node-type, field-name, field-metadata) triple the registry
/// classifies against. `field_metadata` is the raw JSON schema fragment
/// for this field as declared in the node's type template.
pub struct ClassifyTriple<'a> {
    pub node_type: &'a str,
    pub field_name: &'a str,
    pub field_metadata: &'a Value,
}

type Detector = Arc<dyn Fn(&ClassifyTriple<'_>) -> bool + Send + Sync>;
type Constructor = Arc<dyn Fn(&ClassifyTriple<'_>) -> Box<dyn Field> + Send + Sync>;

struct Rule {
    priority: i32,
    registration_order: usize,
    detector: Detector,
    constructor: Constructor,
}

/// Catalogues the recognized field kinds and their classification rules.
/// Registration is serialized by `&mut self`; once built, `classify` is a
/// read-only, lock-free scan (the registry is expected to be built once
/// at process startup and shared thereafter, e.g. behind an `Arc`).
pub struct FieldRegistry {
    rules: Vec<Rule>,
    next_registration_order: usize,
}

impl fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRegistry")
            .field("rule_count", &self.rules.len())
            .finish()
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl FieldRegistry {
    /// An empty registry with no rules — classification always falls
    /// back to the generic unresolved string field.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            next_registration_order: 0,
        }
    }

    /// A registry pre-populated with the built-in kinds enumerated in
    /// §4.A: integer, float, boolean, string, enum, model identifier,
    /// board identifier, image reference, latents reference, color,
    /// LoRA reference, scheduler name.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        kinds::register_builtins(&mut registry);
        registry
    }

    /// Add a classification rule. `detector` is evaluated in descending
    /// `priority`, then registration order; the first match wins.
    pub fn register(
        &mut self,
        priority: i32,
        detector: impl Fn(&ClassifyTriple<'_>) -> bool + Send + Sync + 'static,
        constructor: impl Fn(&ClassifyTriple<'_>) -> Box<dyn Field> + Send + Sync + 'static,
    ) {
        let registration_order = self.next_registration_order;
        self.next_registration_order += 1;
        self.rules.push(Rule {
            priority,
            registration_order,
            detector: Arc::new(detector),
            constructor: Arc::new(constructor),
        });
        self.rules.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.registration_order.cmp(&b.registration_order))
        });
    }

    /// Classify a triple, constructing a fresh Field instance. In
    /// non-strict mode, an unmatched triple degrades to a generic
    /// string-like fallback field. In strict mode, an unmatched triple
    /// returns `Err` instead.
    pub fn classify(
        &self,
        triple: &ClassifyTriple<'_>,
        strict: bool,
    ) -> Result<Box<dyn Field>, String> {
        for rule in &self.rules {
            if (rule.detector)(triple) {
                return Ok((rule.constructor)(triple));
            }
        }
        if strict {
            Err(format!(
                "no field kind matched node field {:?}.{:?}",
                triple.node_type, triple.field_name
            ))
        } else {
            Ok(Box::new(kinds::StringField::unresolved_fallback(
                triple.field_metadata,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unmatched_triple_degrades_to_unresolved_string_in_non_strict_mode() {
        let registry = FieldRegistry::empty();
        let metadata = json!({});
        let triple = ClassifyTriple {
            node_type: "mystery_node",
            field_name: "whatever",
            field_metadata: &metadata,
        };
        let field = registry.classify(&triple, false).unwrap();
        assert_eq!(field.kind(), FieldKind::new(FieldKind::UNRESOLVED));
    }

    #[test]
    fn unmatched_triple_errors_in_strict_mode() {
        let registry = FieldRegistry::empty();
        let metadata = json!({});
        let triple = ClassifyTriple {
            node_type: "mystery_node",
            field_name: "whatever",
            field_metadata: &metadata,
        };
        assert!(registry.classify(&triple, true).is_err());
    }

    #[test]
    fn higher_priority_rule_wins_regardless_of_registration_order() {
        let mut registry = FieldRegistry::empty();
        registry.register(
            10,
            |_| true,
            |_| Box::new(kinds::StringField::new(None)),
        );
        registry.register(
            20,
            |_| true,
            |_| Box::new(kinds::IntegerField::new(None, None, None)),
        );
        let metadata = json!({});
        let triple = ClassifyTriple {
            node_type: "n",
            field_name: "f",
            field_metadata: &metadata,
        };
        let field = registry.classify(&triple, false).unwrap();
        assert_eq!(field.kind(), FieldKind::new(FieldKind::INTEGER));
    }

    #[test]
    fn equal_priority_rules_resolve_by_registration_order() {
        let mut registry = FieldRegistry::empty();
        registry.register(5, |_| true, |_| Box::new(kinds::StringField::new(None)));
        registry.register(
            5,
            |_| true,
            |_| Box::new(kinds::IntegerField::new(None, None, None)),
        );
        let metadata = json!({});
        let triple = ClassifyTriple {
            node_type: "n",
            field_name: "f",
            field_metadata: &metadata,
        };
        let field = registry.classify(&triple, false).unwrap();
        assert_eq!(field.kind(), FieldKind::new(FieldKind::STRING));
    }

    #[test]
    fn adding_a_new_kind_does_not_require_touching_existing_rules() {
        // I6: extension is registering one more (detector, constructor) pair.
        let mut registry = FieldRegistry::with_builtins();
        let before = registry.rules.len();
        registry.register(1000, |t| t.field_name == "custom", |_| {
            Box::new(kinds::StringField::new(Some("custom-kind-value".into())))
        });
        assert_eq!(registry.rules.len(), before + 1);
    }
}
