//! Comparison helpers for template conditionals
//!
//! `eq`, `lt`, `lte`, `gt` and `gte` return booleans and are meant to be
//! used as subexpressions: `{{#if (gt score 90)}}`.
//!
//! - `eq` is strict: no coercion between types, and a missing value only
//!   equals another missing value (`null` is not missing).
//! - Ordering compares numbers with numbers, strings with strings and
//!   booleans with booleans. Any other pairing, including missing or `null`
//!   operands, is never ordered, so every comparator yields false.

use std::cmp::Ordering;

use handlebars::{Context, Handlebars, Helper, HelperDef, JsonValue, RenderContext, RenderError, ScopedJson};
use tracing::debug;

/// A helper operand as seen by the comparators
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    /// Unresolved path or absent parameter
    Missing,
    Value(&'a JsonValue),
}

/// The five registered comparators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparator {
    /// All comparators with their helper names
    pub const ALL: [(&'static str, Comparator); 5] = [
        ("eq", Comparator::Eq),
        ("lt", Comparator::Lt),
        ("lte", Comparator::Lte),
        ("gt", Comparator::Gt),
        ("gte", Comparator::Gte),
    ];

    /// Evaluate `lhs <op> rhs`
    pub fn evaluate(self, lhs: Operand<'_>, rhs: Operand<'_>) -> bool {
        if self == Comparator::Eq {
            return strict_eq(lhs, rhs);
        }

        match (ordering(lhs, rhs), self) {
            (Some(Ordering::Less), Comparator::Lt | Comparator::Lte) => true,
            (Some(Ordering::Equal), Comparator::Lte | Comparator::Gte) => true,
            (Some(Ordering::Greater), Comparator::Gt | Comparator::Gte) => true,
            _ => false,
        }
    }
}

fn strict_eq(lhs: Operand<'_>, rhs: Operand<'_>) -> bool {
    match (lhs, rhs) {
        (Operand::Missing, Operand::Missing) => true,
        (Operand::Value(JsonValue::Number(a)), Operand::Value(JsonValue::Number(b))) => {
            match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        }
        (Operand::Value(a), Operand::Value(b)) => a == b,
        _ => false,
    }
}

fn ordering(lhs: Operand<'_>, rhs: Operand<'_>) -> Option<Ordering> {
    let (Operand::Value(lhs), Operand::Value(rhs)) = (lhs, rhs) else {
        return None;
    };

    match (lhs, rhs) {
        (JsonValue::Number(a), JsonValue::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (JsonValue::String(a), JsonValue::String(b)) => Some(a.cmp(b)),
        (JsonValue::Bool(a), JsonValue::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Handlebars adapter for one [`Comparator`]
#[derive(Debug, Clone, Copy)]
struct ComparisonHelper(Comparator);

impl HelperDef for ComparisonHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let operand = |index: usize| match h.param(index) {
            Some(param) if !param.is_value_missing() => Operand::Value(param.value()),
            _ => Operand::Missing,
        };

        let result = self.0.evaluate(operand(0), operand(1));
        Ok(ScopedJson::Derived(JsonValue::Bool(result)))
    }
}

/// Installs the comparison helpers into a Handlebars registry
#[derive(Debug, Default)]
pub struct HelperRegistry {
    registered: bool,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the helpers once; later calls are no-ops
    ///
    /// Returns true if this call performed the registration.
    pub fn register(&mut self, hbs: &mut Handlebars<'_>) -> bool {
        if self.registered {
            debug!("HelperRegistry::register: already registered");
            return false;
        }

        for (name, comparator) in Comparator::ALL {
            debug!(%name, "HelperRegistry::register: registering helper");
            hbs.register_helper(name, Box::new(ComparisonHelper(comparator)));
        }
        self.registered = true;
        true
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        HelperRegistry::new().register(&mut hbs);
        hbs
    }

    fn render(template: &str, data: JsonValue) -> String {
        engine().render_template(template, &data).unwrap()
    }

    const EQ: &str = "{{#if (eq a b)}}equal{{else}}not equal{{/if}}";
    const LT: &str = "{{#if (lt a b)}}less{{else}}not less{{/if}}";

    #[test]
    fn test_eq_equal_values() {
        assert_eq!(render(EQ, json!({"a": 5, "b": 5})), "equal");
        assert_eq!(render(EQ, json!({"a": "test", "b": "test"})), "equal");
        assert_eq!(render(EQ, json!({"a": true, "b": true})), "equal");
        assert_eq!(render(EQ, json!({"a": null, "b": null})), "equal");
        assert_eq!(render(EQ, json!({"a": 5, "b": 5.0})), "equal");
        assert_eq!(render(EQ, json!({})), "equal");
    }

    #[test]
    fn test_eq_is_strict() {
        assert_eq!(render(EQ, json!({"a": 5, "b": 10})), "not equal");
        assert_eq!(render(EQ, json!({"a": 5, "b": "5"})), "not equal");
        assert_eq!(render(EQ, json!({"a": 0, "b": false})), "not equal");
        assert_eq!(render(EQ, json!({"a": "", "b": false})), "not equal");
        assert_eq!(render(EQ, json!({"a": "0", "b": 0})), "not equal");
        assert_eq!(render(EQ, json!({"a": null})), "not equal");
        assert_eq!(render(EQ, json!({"a": 5})), "not equal");
        assert_eq!(render(EQ, json!({"b": 5})), "not equal");
    }

    #[test]
    fn test_eq_in_unless() {
        let template = "{{#unless (eq a b)}}different{{else}}same{{/unless}}";
        assert_eq!(render(template, json!({"a": 1, "b": 2})), "different");
        assert_eq!(render(template, json!({"a": 1, "b": 1})), "same");
    }

    #[test]
    fn test_lt() {
        assert_eq!(render(LT, json!({"a": 5, "b": 10})), "less");
        assert_eq!(render(LT, json!({"a": -10, "b": -5})), "less");
        assert_eq!(render(LT, json!({"a": "a", "b": "b"})), "less");
        assert_eq!(render(LT, json!({"a": 10, "b": 5})), "not less");
        assert_eq!(render(LT, json!({"a": 5, "b": 5})), "not less");
        assert_eq!(render(LT, json!({"a": "z", "b": "a"})), "not less");
    }

    #[test]
    fn test_ordering_with_missing_data() {
        assert_eq!(render(LT, json!({"a": null, "b": 0})), "not less");
        assert_eq!(render(LT, json!({"b": 0})), "not less");
        assert_eq!(render(LT, json!({"a": 5})), "not less");
        assert_eq!(render(LT, json!({"a": "5", "b": 6})), "not less");

        for (_, comparator) in Comparator::ALL.iter().skip(1) {
            assert!(!comparator.evaluate(Operand::Missing, Operand::Value(&json!(5))));
            assert!(!comparator.evaluate(Operand::Value(&json!(5)), Operand::Missing));
            assert!(!comparator.evaluate(Operand::Value(&JsonValue::Null), Operand::Value(&json!(0))));
        }
    }

    #[test]
    fn test_lte_gt_gte() {
        let lte = "{{#if (lte a b)}}true{{else}}false{{/if}}";
        assert_eq!(render(lte, json!({"a": 5, "b": 10})), "true");
        assert_eq!(render(lte, json!({"a": 10, "b": 10})), "true");
        assert_eq!(render(lte, json!({"a": "a", "b": "a"})), "true");
        assert_eq!(render(lte, json!({"a": 15, "b": 10})), "false");

        let gt = "{{#if (gt a b)}}greater{{else}}not greater{{/if}}";
        assert_eq!(render(gt, json!({"a": 10, "b": 5})), "greater");
        assert_eq!(render(gt, json!({"a": -5, "b": -10})), "greater");
        assert_eq!(render(gt, json!({"a": "z", "b": "a"})), "greater");
        assert_eq!(render(gt, json!({"a": 5, "b": 5})), "not greater");

        let gte = "{{#if (gte a b)}}true{{else}}false{{/if}}";
        assert_eq!(render(gte, json!({"a": 10, "b": 5})), "true");
        assert_eq!(render(gte, json!({"a": 5, "b": 5})), "true");
        assert_eq!(render(gte, json!({"a": "a", "b": "z"})), "false");
    }

    #[test]
    fn test_else_if_chain() {
        let template =
            "{{#if (gt score 90)}}A{{else if (gte score 80)}}B{{else if (gte score 70)}}C{{else}}F{{/if}}";
        assert_eq!(render(template, json!({"score": 95})), "A");
        assert_eq!(render(template, json!({"score": 85})), "B");
        assert_eq!(render(template, json!({"score": 75})), "C");
        assert_eq!(render(template, json!({"score": 55})), "F");
    }

    #[test]
    fn test_parent_context_in_each() {
        let template = "{{#each items}}{{#if (gt value ../threshold)}}{{name}}:above;{{else}}{{name}}:below;{{/if}}{{/each}}";
        let data = json!({
            "threshold": 50,
            "items": [
                {"name": "Item1", "value": 60},
                {"name": "Item2", "value": 40}
            ]
        });
        assert_eq!(render(template, data), "Item1:above;Item2:below;");
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut hbs = Handlebars::new();
        let mut registry = HelperRegistry::new();
        assert!(registry.register(&mut hbs));
        assert!(!registry.register(&mut hbs));
        assert!(registry.is_registered());
        assert_eq!(hbs.render_template(EQ, &json!({"a": 1, "b": 1})).unwrap(), "equal");
    }
}
