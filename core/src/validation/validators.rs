//! # PARAMETER COERCION ENGINE
//!
//! **CRITICAL**: Decides, for one named parameter, whether the raw input can
//! be read as one of the declared kinds, and produces the coerced value.
//!
//! ## COERCION ORDER
//!
//! 1. **ARRAY** - native arrays, `[`-prefixed JSON, CSV strings, single-type wrap
//! 2. **OBJECT** - native objects, `{`-prefixed JSON, nested sub-schemas
//! 3. **DATE** - 10/13 digit timestamps, calendar strings
//! 4. **BOOLEAN** - `true/false/1/0`, bare flags
//! 5. **NUMBER** - finite numeric strings, inclusive bounds
//! 6. **STRING** - strings, empty input
//!
//! The first stage that accepts the value wins. Changing this order changes
//! how ambiguous input such as `"1"` resolves.

use log::{debug, trace};

use super::dates;
use super::{ValidationError, ValidationOptions};
use crate::request::RequestContext;
use crate::schema::ParameterSpec;
use crate::types::{format_number, parse_number, DataType, Value};

/// Outcome of one check: the value to store (`None` leaves the key absent)
/// or every failure found, flattened.
pub(crate) type CheckResult = Result<Option<Value>, Vec<ValidationError>>;

type StageResult = Result<bool, Vec<ValidationError>>;

/// **COERCION ENGINE**
///
/// Borrowed view over the request and options for one validation pass.
pub(crate) struct Engine<'a> {
    ctx: &'a RequestContext,
    options: &'a ValidationOptions,
}

impl<'a> Engine<'a> {
    pub(crate) fn new(ctx: &'a RequestContext, options: &'a ValidationOptions) -> Self {
        Self { ctx, options }
    }

    /// **CHECK ONE PARAMETER**
    ///
    /// **PARAMETERS**:
    /// - `current` - stored value, `None` when the key is absent
    /// - `label` - full dotted label (`payload.items.2`)
    /// - `top_level` - run `validate`/`transform` callbacks
    /// - `depth` - nesting level, bounded by `max_depth`
    ///
    /// **GUARANTEE**: MUST NOT panic. Nothing outside the returned value is modified.
    pub(crate) fn check(
        &self,
        current: Option<Value>,
        spec: &ParameterSpec,
        label: &str,
        top_level: bool,
        depth: usize,
    ) -> CheckResult {
        debug!(
            "[validate] prop=`{}` val=`{}` allowed=`{}`",
            label,
            current.as_ref().map_or_else(|| "<absent>".to_string(), ToString::to_string),
            spec.type_label()
        );

        let mut value = match current {
            Some(value) => value,
            None if spec.required => return Err(vec![ValidationError::missing(label)]),
            None => match &spec.default {
                Some(default) => {
                    let resolved = default.resolve(self.ctx, spec);
                    debug!("[validate] default applied: `{label}` = `{resolved}`");
                    resolved
                }
                None => return Ok(None),
            },
        };

        if depth > self.options.max_depth {
            let message = format!(
                "Invalid param `{label}`, nesting exceeds the maximum depth of `{}`",
                self.options.max_depth
            );
            return Err(vec![ValidationError::invalid(label, message, value)]);
        }

        let mut accepted = self.coerce_array(&mut value, spec, label, depth)?;
        trace!("[validate] array done: `{label}` = `{value}` accepted={accepted}");

        if !accepted {
            accepted = self.coerce_object(&mut value, spec, label, depth)?;
            trace!("[validate] object done: `{label}` = `{value}` accepted={accepted}");
        }
        if !accepted {
            accepted = coerce_date(&mut value, spec);
            trace!("[validate] date done: `{label}` = `{value}` accepted={accepted}");
        }
        if !accepted {
            accepted = coerce_boolean(&mut value, spec);
            trace!("[validate] boolean done: `{label}` = `{value}` accepted={accepted}");
        }
        if !accepted {
            accepted = coerce_number(&mut value, spec, label)?;
            trace!("[validate] number done: `{label}` = `{value}` accepted={accepted}");
        }
        if !accepted {
            accepted = coerce_string(&mut value, spec);
            trace!("[validate] string done: `{label}` = `{value}` accepted={accepted}");
        }

        if !accepted {
            let received = received_types(&value);
            debug!(
                "[validate] invalid prop=`{}` val=`{}` allowed=`{}` received=`{}`",
                label,
                value,
                spec.type_label(),
                received
            );
            let message = format!(
                "Invalid param `{label}`, valid types are `{}`, received `{received}`",
                spec.type_label()
            );
            return Err(vec![ValidationError::invalid(label, message, value)]);
        }

        check_allowed_values(&value, spec, label)?;

        if top_level {
            if let Some(validate) = &spec.validate {
                validate(&value, self.ctx, spec).map_err(|err| vec![err])?;
            }
            if let Some(transform) = &spec.transform {
                value = transform(value, self.ctx, spec);
            }
        }

        Ok(Some(value))
    }

    fn coerce_array(
        &self,
        value: &mut Value,
        spec: &ParameterSpec,
        label: &str,
        depth: usize,
    ) -> StageResult {
        if !spec.accepts(DataType::Array) || !value.is_truthy() {
            return Ok(false);
        }

        let replacement = match &*value {
            Value::Array(_) => None,
            Value::String(s) if s.starts_with('[') => match serde_json::from_str::<serde_json::Value>(s) {
                Ok(json) => Some(Value::from(json)),
                // the raw string stays a candidate for the `string` stage
                Err(_) if spec.accepts(DataType::String) => return Ok(false),
                Err(e) => {
                    let message = format!("Invalid param `{label}`, malformed array: `{e}`");
                    return Err(vec![ValidationError::invalid(label, message, value.clone())]);
                }
            },
            // JSON objects contain commas too
            Value::String(s)
                if s.contains(',') && !(s.starts_with('{') && spec.accepts(DataType::Object)) =>
            {
                Some(Value::Array(
                    s.split(',').map(|part| Value::String(part.to_string())).collect(),
                ))
            }
            other if spec.data_types.len() == 1 => Some(Value::Array(vec![other.clone()])),
            _ => return Ok(false),
        };
        if let Some(replacement) = replacement {
            *value = replacement;
        }

        if spec.data_types.len() > 1 {
            if let Value::Array(items) = value {
                let element_spec = spec.element_spec();
                let mut errors = Vec::new();
                for (index, item) in items.iter_mut().enumerate() {
                    let item_label = format!("{label}.{index}");
                    match self.check(Some(item.clone()), &element_spec, &item_label, false, depth + 1) {
                        Ok(Some(coerced)) => *item = coerced,
                        Ok(None) => {}
                        Err(item_errors) => errors.extend(item_errors),
                    }
                }
                if !errors.is_empty() {
                    return Err(errors);
                }
            }
        }

        Ok(true)
    }

    fn coerce_object(
        &self,
        value: &mut Value,
        spec: &ParameterSpec,
        label: &str,
        depth: usize,
    ) -> StageResult {
        if !spec.accepts(DataType::Object) {
            return Ok(false);
        }

        let replacement = match &*value {
            Value::Object(_) => None,
            Value::String(s) if s.starts_with('{') => match serde_json::from_str::<serde_json::Value>(s) {
                Ok(json) => Some(Value::from(json)),
                Err(_) if spec.accepts(DataType::String) => return Ok(false),
                Err(e) => {
                    let message = format!("Invalid param `{label}`, malformed object: `{e}`");
                    return Err(vec![ValidationError::invalid(label, message, value.clone())]);
                }
            },
            _ => return Ok(false),
        };
        if let Some(replacement) = replacement {
            *value = replacement;
        }

        if let (Some(children), Value::Object(fields)) = (&spec.params, &mut *value) {
            let mut errors = Vec::new();
            for child in children {
                let child_label = format!("{label}.{}", child.name);
                let current = fields.get(&child.name).cloned();
                match self.check(current, child, &child_label, false, depth + 1) {
                    Ok(Some(coerced)) => {
                        fields.insert(child.name.clone(), coerced);
                    }
                    Ok(None) => {}
                    Err(child_errors) => errors.extend(child_errors),
                }
            }
            if !errors.is_empty() {
                return Err(errors);
            }
        }

        Ok(true)
    }
}

fn coerce_date(value: &mut Value, spec: &ParameterSpec) -> bool {
    if !spec.accepts(DataType::Date) || !value.is_truthy() {
        return false;
    }

    let parsed = match &*value {
        Value::Date(_) => return true,
        Value::Array(_) => None,
        // numeric input is only ever a timestamp, never a calendar string
        numeric if numeric.to_number().is_some() => dates::from_timestamp(numeric),
        Value::String(s) => dates::parse_date(s),
        _ => None,
    };

    match parsed {
        Some(date) => {
            *value = Value::Date(date);
            true
        }
        None => false,
    }
}

fn coerce_boolean(value: &mut Value, spec: &ParameterSpec) -> bool {
    if !spec.accepts(DataType::Boolean) {
        return false;
    }

    let coerced = match &*value {
        Value::Bool(_) => return true,
        Value::String(s) => match s.to_lowercase().as_str() {
            "false" | "0" => Some(false),
            // `?flag` arrives as an empty string and means present-and-true
            "true" | "1" | "" => Some(true),
            _ => None,
        },
        Value::Number(n) if *n == 0.0 => Some(false),
        Value::Number(n) if *n == 1.0 => Some(true),
        Value::Null => Some(true),
        _ => None,
    };

    match coerced {
        Some(flag) => {
            *value = Value::Bool(flag);
            true
        }
        None => false,
    }
}

fn coerce_number(value: &mut Value, spec: &ParameterSpec, label: &str) -> StageResult {
    if !spec.accepts(DataType::Number) {
        return Ok(false);
    }

    let number = match &*value {
        Value::String(_) | Value::Number(_) => value.to_number(),
        _ => None,
    };
    let Some(number) = number else {
        return Ok(false);
    };

    let range = match (spec.min, spec.max) {
        (Some(min), Some(max)) if number < min || number > max => Some(format!(
            "value must be between `{}` and `{}`",
            format_number(min),
            format_number(max)
        )),
        (Some(min), None) if number < min => {
            Some(format!("value must be higher than `{}`", format_number(min)))
        }
        (None, Some(max)) if number > max => {
            Some(format!("value must be lower than `{}`", format_number(max)))
        }
        _ => None,
    };
    if let Some(range) = range {
        let message = format!("Invalid param `{label}`, {range}, received `{value}`");
        return Err(vec![ValidationError::invalid(label, message, value.clone())]);
    }

    *value = Value::Number(number);
    Ok(true)
}

fn coerce_string(value: &mut Value, spec: &ParameterSpec) -> bool {
    if !spec.accepts(DataType::String) {
        return false;
    }

    match value {
        Value::String(_) => true,
        other if !other.is_truthy() => {
            *other = Value::String(String::new());
            true
        }
        _ => false,
    }
}

fn check_allowed_values(
    value: &Value,
    spec: &ParameterSpec,
    label: &str,
) -> Result<(), Vec<ValidationError>> {
    let Some(allowed) = spec.data_values.as_ref().filter(|values| !values.is_empty()) else {
        return Ok(());
    };

    let ok = match value {
        Value::Array(items) if !items.is_empty() => items.iter().all(|item| allowed.contains(item)),
        other => allowed.contains(other),
    };
    if ok {
        return Ok(());
    }

    let listed: Vec<String> = allowed.iter().map(ToString::to_string).collect();
    let message = format!(
        "Invalid param `{label}`, valid values are `{}`, received `{value}`",
        listed.join(", ")
    );
    Err(vec![ValidationError::invalid(label, message, value.clone())])
}

/// Type name of a rejected value plus the other kinds it could be read as,
/// e.g. `string|number` for `"12"`.
fn received_types(value: &Value) -> String {
    let mut received = value.type_name().to_string();

    if !matches!(value, Value::Number(_)) && value.is_truthy() && reads_as_number(value) {
        received.push_str("|number");
    }
    if matches!(value.as_str(), Some("0" | "1")) {
        received.push_str("|boolean");
    }
    if let Value::String(s) = value {
        if s.starts_with('{') {
            received.push_str("|object");
        }
        if s.starts_with('[') {
            received.push_str("|array");
        }
    }

    received
}

/// Whether the value has a numeric reading at all: `true` is 1, a date is
/// its timestamp, and an empty or single-element array reads as its text.
fn reads_as_number(value: &Value) -> bool {
    match value {
        Value::Null | Value::Object(_) => false,
        Value::Bool(_) | Value::Number(_) | Value::Date(_) => true,
        Value::String(s) => numeric_text(s),
        Value::Array(items) => match items.as_slice() {
            [] => true,
            [item] => numeric_text(&item.to_string()),
            _ => false,
        },
    }
}

fn numeric_text(text: &str) -> bool {
    text.trim().is_empty() || parse_number(text).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(spec: &ParameterSpec, value: Option<Value>) -> CheckResult {
        let ctx = RequestContext::default();
        let options = ValidationOptions::default();
        Engine::new(&ctx, &options).check(value, spec, &spec.name, true, 0)
    }

    fn spec(types: &[DataType]) -> ParameterSpec {
        ParameterSpec::new("p", types.iter().copied()).unwrap()
    }

    #[test]
    fn test_received_types_hints() {
        assert_eq!(received_types(&Value::from("12")), "string|number");
        assert_eq!(received_types(&Value::from("1")), "string|number|boolean");
        assert_eq!(received_types(&Value::from("{a")), "string|object");
        assert_eq!(received_types(&Value::from("[a")), "string|array");
        assert_eq!(received_types(&Value::from(20)), "number");
        assert_eq!(received_types(&Value::from("")), "string");
    }

    #[test]
    fn test_received_types_numeric_readings() {
        assert_eq!(received_types(&Value::Bool(true)), "boolean|number");
        assert_eq!(received_types(&Value::Bool(false)), "boolean");
        assert_eq!(received_types(&Value::from(vec![5])), "array|number");
        assert_eq!(received_types(&Value::from(vec!["a"])), "array");
        assert_eq!(received_types(&Value::from(vec![1, 2])), "array");
        assert_eq!(received_types(&Value::Object(crate::types::Map::new())), "object");
    }

    #[test]
    fn test_bounds_wording() {
        let both = spec(&[DataType::Number]).with_min(1.0).with_max(5.0);
        let errors = run(&both, Some(Value::from("9"))).unwrap_err();
        assert_eq!(
            errors[0].message,
            "Invalid param `p`, value must be between `1` and `5`, received `9`"
        );

        let min_only = spec(&[DataType::Number]).with_min(1.0);
        let errors = run(&min_only, Some(Value::from(0))).unwrap_err();
        assert_eq!(
            errors[0].message,
            "Invalid param `p`, value must be higher than `1`, received `0`"
        );

        let max_only = spec(&[DataType::Number]).with_max(5.5);
        let errors = run(&max_only, Some(Value::from("6"))).unwrap_err();
        assert_eq!(
            errors[0].message,
            "Invalid param `p`, value must be lower than `5.5`, received `6`"
        );
    }

    #[test]
    fn test_absent_optional_stays_absent() {
        assert_eq!(run(&spec(&[DataType::String]), None), Ok(None));
    }

    #[test]
    fn test_stage_order_resolves_ambiguous_input() {
        let all = spec(&[
            DataType::String,
            DataType::Number,
            DataType::Boolean,
        ]);
        assert_eq!(run(&all, Some(Value::from("1"))), Ok(Some(Value::Bool(true))));
        assert_eq!(run(&all, Some(Value::from("2"))), Ok(Some(Value::Number(2.0))));
        assert_eq!(run(&all, Some(Value::from("two"))), Ok(Some(Value::from("two"))));

        let date_or_number = spec(&[DataType::Number, DataType::Date]);
        assert!(matches!(
            run(&date_or_number, Some(Value::from("1329696000"))),
            Ok(Some(Value::Date(_)))
        ));
        assert_eq!(
            run(&date_or_number, Some(Value::from("1329"))),
            Ok(Some(Value::Number(1329.0)))
        );
    }

    #[test]
    fn test_csv_split_skips_json_objects() {
        let s = spec(&[DataType::Array, DataType::Object]);
        let result = run(&s, Some(Value::from(r#"{"a":1,"b":2}"#))).unwrap().unwrap();
        assert_eq!(result.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_depth_ceiling() {
        let ctx = RequestContext::default();
        let options = ValidationOptions { max_depth: 1 };
        let inner = ParameterSpec::new("c", [DataType::Object])
            .unwrap()
            .with_params(vec![ParameterSpec::new("d", [DataType::String]).unwrap()]);
        let middle = ParameterSpec::new("b", [DataType::Object])
            .unwrap()
            .with_params(vec![inner]);
        let outer = ParameterSpec::new("a", [DataType::Object])
            .unwrap()
            .with_params(vec![middle]);

        let value = Value::from(serde_json::json!({"b": {"c": {"d": "x"}}}));
        let errors = Engine::new(&ctx, &options)
            .check(Some(value), &outer, "a", true, 0)
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].label, "a.b.c");
        assert!(errors[0].message.contains("maximum depth"));
    }
}
