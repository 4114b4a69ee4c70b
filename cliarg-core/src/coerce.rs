//! Conversion of raw argument text into values.
//!
//! A [`Coercer`] is an ordered chain of [`CoercionStrategy`] objects. Each
//! strategy either claims a declared type and returns a result, or declines so
//! the next one gets a chance. The default chain is the primitive strategy
//! followed by the structured (JSON) decoder.

use std::fmt;

use serde_json::{Map, Number, Value};
use tracing::trace;

use crate::error::CoerceError;
use crate::property::ValueType;

/// Shape expected at the root of structured text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootShape {
    Sequence,
    Mapping,
}

impl RootShape {
    pub fn for_type(value_type: &ValueType) -> Self {
        if value_type.is_sequence() {
            RootShape::Sequence
        } else {
            RootShape::Mapping
        }
    }
}

impl fmt::Display for RootShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootShape::Sequence => write!(f, "sequence"),
            RootShape::Mapping => write!(f, "mapping"),
        }
    }
}

/// One link in the coercion chain.
pub trait CoercionStrategy: Send + Sync {
    /// Name used in trace output
    fn name(&self) -> &'static str;

    /// `None` declines the type; `Some` claims it, successfully or not.
    fn coerce(&self, text: &str, value_type: &ValueType) -> Option<Result<Value, CoerceError>>;
}

/// Scalars: numbers, booleans, chars and strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimitiveStrategy;

impl CoercionStrategy for PrimitiveStrategy {
    fn name(&self) -> &'static str {
        "primitive"
    }

    fn coerce(&self, text: &str, value_type: &ValueType) -> Option<Result<Value, CoerceError>> {
        coerce_primitive(text, value_type)
    }
}

/// Sequences and mappings, decoded as JSON with a root-shape hint.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredStrategy;

impl CoercionStrategy for StructuredStrategy {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn coerce(&self, text: &str, value_type: &ValueType) -> Option<Result<Value, CoerceError>> {
        match value_type {
            ValueType::Sequence(_) | ValueType::Map(_) | ValueType::Mapping => {
                Some(decode_structured(text, value_type, RootShape::for_type(value_type)))
            }
            _ => None,
        }
    }
}

/// Convert `text` to a scalar value, or decline with `None` for
/// sequence and mapping types.
pub fn coerce_primitive(text: &str, value_type: &ValueType) -> Option<Result<Value, CoerceError>> {
    let invalid = |reason: String| CoerceError::InvalidValue {
        expected: value_type.clone(),
        text: text.to_string(),
        reason,
    };

    let result = match value_type {
        ValueType::Bool => match text {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid("expected `true` or `false`".to_string())),
        },
        ValueType::Integer => text
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| invalid(e.to_string())),
        ValueType::Unsigned => text
            .parse::<u64>()
            .map(Value::from)
            .map_err(|e| invalid(e.to_string())),
        ValueType::Float => match text.parse::<f64>() {
            Ok(number) => Number::from_f64(number)
                .map(Value::Number)
                .ok_or_else(|| invalid("value is not finite".to_string())),
            Err(e) => Err(invalid(e.to_string())),
        },
        ValueType::Float32 => match text.parse::<f32>() {
            // Out-of-range text parses to infinity
            Ok(number) if number.is_finite() => Number::from_f64(f64::from(number))
                .map(Value::Number)
                .ok_or_else(|| invalid("value is not finite".to_string())),
            Ok(_) => Err(invalid("value is out of range or not finite".to_string())),
            Err(e) => Err(invalid(e.to_string())),
        },
        ValueType::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::String(c.to_string())),
                _ => Err(invalid("expected exactly one character".to_string())),
            }
        }
        ValueType::String => Ok(Value::String(text.to_string())),
        ValueType::Sequence(_) | ValueType::Map(_) | ValueType::Mapping => return None,
    };
    Some(result)
}

/// Decode structured text as JSON with a root-shape hint.
///
/// The text is decoded as JSON first, as-is and then wrapped in the brackets
/// `shape` expects, and the first decode that matches `value_type` wins. When
/// neither does, the text is read in a relaxed form: top-level commas separate
/// items, mapping entries are `key:value` or `key=value`, and bare words are
/// taken as strings. Quoted items keep their commas.
pub fn decode_structured(
    text: &str,
    value_type: &ValueType,
    shape: RootShape,
) -> Result<Value, CoerceError> {
    let trimmed = text.trim();
    match shape {
        RootShape::Sequence => decode_sequence(trimmed, value_type),
        RootShape::Mapping => decode_mapping(trimmed, value_type),
    }
}

fn decode_sequence(text: &str, value_type: &ValueType) -> Result<Value, CoerceError> {
    if text.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }
    let element = match value_type {
        ValueType::Sequence(element) => element.as_ref().clone(),
        _ => ValueType::String,
    };
    let sequence = ValueType::sequence_of(element.clone());

    let json_error = match decode_json(text, '[', ']', &sequence) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    let items = split_top_level(text, ',');
    // `[a,b]` with scalar elements is one bracketed list, not one element.
    if let [single] = items.as_slice() {
        if is_enclosed(single, '[', ']') && !element.is_sequence() {
            let inner = &single[1..single.len() - 1];
            return decode_sequence(inner.trim(), &sequence)
                .map_err(|err| prefer_json_error(text, '[', json_error, err));
        }
    }

    items
        .iter()
        .map(|item| coerce_element(item.trim(), &element))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
        .map_err(|err| prefer_json_error(text, '[', json_error, err))
}

fn decode_mapping(text: &str, value_type: &ValueType) -> Result<Value, CoerceError> {
    if text.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let mapping = match value_type {
        ValueType::Map(_) => value_type.clone(),
        _ => ValueType::Mapping,
    };

    let json_error = match decode_json(text, '{', '}', &mapping) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    let body = if is_enclosed(text, '{', '}') {
        &text[1..text.len() - 1]
    } else {
        text
    };
    let mut entries = Map::new();
    for entry in split_top_level(body, ',') {
        let entry = entry.trim();
        let Some((key, value)) = split_entry(entry) else {
            let err = CoerceError::InvalidValue {
                expected: mapping.clone(),
                text: entry.to_string(),
                reason: "expected `key:value`".to_string(),
            };
            return Err(prefer_json_error(text, '{', json_error, err));
        };
        let value = match &mapping {
            ValueType::Map(value_type) => coerce_element(value, value_type),
            _ => Ok(relaxed_scalar(value)),
        };
        match value {
            Ok(value) => {
                entries.insert(unquote(key), value);
            }
            Err(err) => return Err(prefer_json_error(text, '{', json_error, err)),
        }
    }
    Ok(Value::Object(entries))
}

/// JSON decode of `text`, then of `text` wrapped in `open`/`close`.
///
/// Returns the first candidate that fits `expected`; on failure, the error of
/// the first candidate.
fn decode_json(
    text: &str,
    open: char,
    close: char,
    expected: &ValueType,
) -> Result<Value, serde_json::Error> {
    let wrapped = format!("{}{}{}", open, text, close);
    let mut first_error = None;
    let candidates = if text.starts_with(open) {
        vec![text, wrapped.as_str()]
    } else {
        vec![wrapped.as_str()]
    };

    for candidate in candidates {
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) if fits(&value, expected) => return Ok(value),
            Ok(_) => {}
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }
    Err(first_error.unwrap_or_else(|| shape_mismatch(expected)))
}

fn shape_mismatch(expected: &ValueType) -> serde_json::Error {
    <serde_json::Error as serde::de::Error>::custom(format!("value is not a {}", expected))
}

/// Whether a decoded value can be assigned to a field of `value_type`.
fn fits(value: &Value, value_type: &ValueType) -> bool {
    match (value_type, value) {
        (ValueType::Bool, Value::Bool(_)) => true,
        (ValueType::Integer, Value::Number(n)) => n.is_i64(),
        (ValueType::Unsigned, Value::Number(n)) => n.is_u64(),
        (ValueType::Float, Value::Number(_)) => true,
        (ValueType::Float32, Value::Number(n)) => {
            n.as_f64().is_some_and(|x| x.abs() <= f64::from(f32::MAX))
        }
        (ValueType::Char | ValueType::String, Value::String(_)) => true,
        (ValueType::Sequence(element), Value::Array(items)) => {
            items.iter().all(|item| fits(item, element))
        }
        (ValueType::Map(value_type), Value::Object(entries)) => {
            entries.values().all(|entry| fits(entry, value_type))
        }
        (ValueType::Mapping, Value::Object(_)) => true,
        _ => false,
    }
}

fn prefer_json_error(
    text: &str,
    open: char,
    json_error: serde_json::Error,
    relaxed_error: CoerceError,
) -> CoerceError {
    if text.starts_with(open) {
        let shape = if open == '[' {
            RootShape::Sequence
        } else {
            RootShape::Mapping
        };
        CoerceError::Decode {
            shape,
            source: json_error,
        }
    } else {
        relaxed_error
    }
}

fn coerce_element(text: &str, element: &ValueType) -> Result<Value, CoerceError> {
    if text.starts_with('"') {
        let unquoted: String =
            serde_json::from_str(text).map_err(|e| CoerceError::InvalidValue {
                expected: element.clone(),
                text: text.to_string(),
                reason: e.to_string(),
            })?;
        return coerce_element(&unquoted, element);
    }
    coerce_primitive(text, element)
        .unwrap_or_else(|| decode_structured(text, element, RootShape::for_type(element)))
}

/// Value of a relaxed entry whose field type is unknown.
fn relaxed_scalar(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn unquote(text: &str) -> String {
    let text = text.trim();
    if text.starts_with('"') {
        if let Ok(key) = serde_json::from_str::<String>(text) {
            return key;
        }
    }
    text.to_string()
}

fn is_enclosed(text: &str, open: char, close: char) -> bool {
    text.len() >= 2 && text.starts_with(open) && text.ends_with(close)
}

/// Split on `separator` outside of quotes, brackets and braces.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => depth = depth.saturating_sub(1),
            _ if c == separator && depth == 0 => {
                items.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    items.push(&text[start..]);
    items
}

/// `key:value` or `key=value`, split at the first top-level separator.
fn split_entry(entry: &str) -> Option<(&str, &str)> {
    let colon = split_top_level(entry, ':');
    let equals = split_top_level(entry, '=');
    let key = match (colon.len() > 1, equals.len() > 1) {
        (true, true) => colon[0].len().min(equals[0].len()),
        (true, false) => colon[0].len(),
        (false, true) => equals[0].len(),
        (false, false) => return None,
    };
    Some((entry[..key].trim(), entry[key + 1..].trim()))
}

/// Ordered chain of coercion strategies.
pub struct Coercer {
    strategies: Vec<Box<dyn CoercionStrategy>>,
    custom: usize,
}

impl Coercer {
    /// Chain with the built-in primitive and structured strategies.
    pub fn new() -> Self {
        Self {
            strategies: vec![Box::new(PrimitiveStrategy), Box::new(StructuredStrategy)],
            custom: 0,
        }
    }

    /// Chain with no strategies at all.
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
            custom: 0,
        }
    }

    /// Add a strategy ahead of the built-ins, after any strategies added earlier.
    pub fn with_strategy<S: CoercionStrategy + 'static>(mut self, strategy: S) -> Self {
        self.strategies.insert(self.custom, Box::new(strategy));
        self.custom += 1;
        self
    }

    /// Names of the strategies in the order they are tried
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the chain; the first strategy to claim the type decides the result.
    pub fn coerce(&self, text: &str, value_type: &ValueType) -> Result<Value, CoerceError> {
        for strategy in &self.strategies {
            if let Some(result) = strategy.coerce(text, value_type) {
                trace!(strategy = strategy.name(), %value_type, "coerced argument text");
                return result;
            }
        }
        Err(CoerceError::Unsupported(value_type.clone()))
    }
}

impl Default for Coercer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Coercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coercer")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}
