//! Positional event arguments.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Callable argument carried by an occurrence (e.g. a reply callback).
pub type Callback = Arc<dyn Fn(&[EventArg]) + Send + Sync>;

/// One positional argument of an event occurrence.
///
/// UI hosts exchange loosely typed argument lists, so an occurrence is a
/// `Vec<EventArg>` rather than a fixed struct.
#[derive(Clone)]
pub enum EventArg {
    /// An explicitly absent argument.
    Undefined,
    /// Any JSON-representable value.
    Value(Value),
    /// A function argument. Never forwarded to diagnostics.
    Function(Callback),
}

impl EventArg {
    /// Wrap anything convertible into a JSON value.
    pub fn value(v: impl Into<Value>) -> Self {
        Self::Value(v.into())
    }

    /// Wrap a callback.
    pub fn function(f: impl Fn(&[EventArg]) + Send + Sync + 'static) -> Self {
        Self::Function(Arc::new(f))
    }

    /// Whether this argument is a bool, number or string.
    ///
    /// `null`, arrays and objects are object-typed and do not count.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Value(Value::Bool(_) | Value::Number(_) | Value::String(_))
        )
    }

    /// JSON form used on the wire. Undefined and functions become `null`.
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Undefined | Self::Function(_) => Value::Null,
        }
    }
}

impl fmt::Debug for EventArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("Undefined"),
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl PartialEq for EventArg {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) => true,
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Value> for EventArg {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

/// Primitive-only view of an argument list for diagnostic logging.
pub fn diagnostic_args(args: &[EventArg]) -> Vec<Value> {
    args.iter()
        .filter(|a| a.is_primitive())
        .map(EventArg::to_wire)
        .collect()
}

/// Convert an argument list to its wire form.
pub fn wire_args(args: &[EventArg]) -> Vec<Value> {
    args.iter().map(EventArg::to_wire).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_diagnostic_args_keeps_only_primitives() {
        let args = vec![
            EventArg::value(42),
            EventArg::value("ok"),
            EventArg::value(json!({"a": 1})),
            EventArg::function(|_| {}),
        ];

        assert_eq!(diagnostic_args(&args), vec![json!(42), json!("ok")]);
    }

    #[test]
    fn test_diagnostic_args_drops_null_arrays_and_undefined() {
        let args = vec![
            EventArg::Undefined,
            EventArg::Value(Value::Null),
            EventArg::value(json!([1, 2])),
            EventArg::value(true),
            EventArg::value(1.5),
        ];

        assert_eq!(diagnostic_args(&args), vec![json!(true), json!(1.5)]);
    }

    #[test]
    fn test_wire_args_nulls_out_non_values() {
        let args = vec![
            EventArg::Undefined,
            EventArg::function(|_| {}),
            EventArg::value(json!({"mode": "dark"})),
        ];

        assert_eq!(
            wire_args(&args),
            vec![Value::Null, Value::Null, json!({"mode": "dark"})]
        );
    }

    #[test]
    fn test_function_args_compare_by_identity() {
        let f = EventArg::function(|_| {});
        let g = EventArg::function(|_| {});

        assert_eq!(f, f.clone());
        assert_ne!(f, g);
        assert_eq!(format!("{:?}", f), "Function(..)");
    }
}
