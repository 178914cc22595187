use crate::value::Value;

/// Outcome of one statement. Return/break/continue travel through statement
/// lists as ordinary results, checked once per statement, so no host
/// unwinding is involved.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Value(Value),
    Return(Value),
    Break,
    Continue,
}

impl Flow {
    /// The carried value once a program or call has finished unwinding.
    pub fn into_value(self) -> Value {
        match self {
            Flow::Value(value) | Flow::Return(value) => value,
            Flow::Break | Flow::Continue => Value::Null,
        }
    }
}
