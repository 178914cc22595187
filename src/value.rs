use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::error::Error;
use crate::interpreter::environment::EnvRef;
use crate::interpreter::evaluator::Interpreter;

/// Arena of property tables. Complex values hold copyable [`TableId`]
/// handles instead of references, so prototype and constructor
/// back-references never form ownership cycles.
#[derive(Debug, Default)]
pub struct Tables {
    slots: Vec<Table>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableId(usize);

#[derive(Debug, Default)]
struct Table {
    entries: IndexMap<String, Value>,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> TableId {
        self.slots.push(Table::default());
        TableId(self.slots.len() - 1)
    }

    pub fn alloc_with(&mut self, entries: IndexMap<String, Value>) -> TableId {
        self.slots.push(Table { entries });
        TableId(self.slots.len() - 1)
    }

    pub fn get(&self, id: TableId, key: &str) -> Option<&Value> {
        self.slots[id.0].entries.get(key)
    }

    pub fn set(&mut self, id: TableId, key: impl Into<String>, value: Value) {
        self.slots[id.0].entries.insert(key.into(), value);
    }

    pub fn len(&self, id: TableId) -> usize {
        self.slots[id.0].entries.len()
    }

    pub fn is_empty(&self, id: TableId) -> bool {
        self.slots[id.0].entries.is_empty()
    }

    pub fn entries(&self, id: TableId) -> &IndexMap<String, Value> {
        &self.slots[id.0].entries
    }

    /// Keys of `id` that parse as non-negative integers, in numeric order.
    /// Lists store their elements under such keys.
    pub fn integer_keys(&self, id: TableId) -> Vec<(u64, String)> {
        let mut keys: Vec<(u64, String)> = self
            .entries(id)
            .keys()
            .filter_map(|k| k.parse::<u64>().ok().map(|n| (n, k.clone())))
            .collect();
        keys.sort_by_key(|(n, _)| *n);
        keys
    }

    /// The key `agregar` appends at: max existing integer key + 1.
    pub fn next_integer_key(&self, id: TableId) -> u64 {
        self.integer_keys(id)
            .last()
            .map(|(n, _)| n + 1)
            .unwrap_or(0)
    }
}

/// The ordered list of property tables a complex value resolves keys
/// through: its own entries first, then each fallback handle in turn
/// (per-value defaults, a class instance prototype, per-type defaults).
#[derive(Debug, Clone, PartialEq)]
pub struct Properties {
    pub own: TableId,
    pub fallback: Vec<TableId>,
}

impl Properties {
    pub fn new(own: TableId, fallback: Vec<TableId>) -> Self {
        Self { own, fallback }
    }

    pub fn resolve(&self, tables: &Tables, key: &str) -> Option<Value> {
        if let Some(value) = tables.get(self.own, key) {
            return Some(value.clone());
        }
        for id in &self.fallback {
            if let Some(value) = tables.get(*id, key) {
                return Some(value.clone());
            }
        }
        None
    }
}

/// Every number is `real + imag*i`. Construction of *values* goes through
/// the registry so 0, 1, -1, NeN and ±Infinito stay canonical singletons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Number {
    pub real: f64,
    pub imag: f64,
}

impl Number {
    pub fn new(real: f64, imag: f64) -> Self {
        Self { real, imag }
    }

    pub fn real(real: f64) -> Self {
        Self { real, imag: 0.0 }
    }

    pub fn is_nan(&self) -> bool {
        self.real.is_nan()
    }

    pub fn is_zero(&self) -> bool {
        self.real == 0.0 && self.imag == 0.0
    }

    pub fn is_complex(&self) -> bool {
        self.imag != 0.0
    }

    fn conjugate(&self) -> Number {
        Number::new(self.real, -self.imag)
    }

    pub fn add(&self, other: &Number) -> Number {
        Number::new(self.real + other.real, self.imag + other.imag)
    }

    pub fn sub(&self, other: &Number) -> Number {
        Number::new(self.real - other.real, self.imag - other.imag)
    }

    pub fn mul(&self, other: &Number) -> Number {
        Number::new(
            self.real * other.real - self.imag * other.imag,
            self.real * other.imag + self.imag * other.real,
        )
    }

    /// Division by a real zero resolves by the sign of the dividend's real
    /// part; otherwise multiply by the divisor's conjugate and divide both
    /// components by its squared magnitude.
    pub fn div(&self, other: &Number) -> Number {
        if other.is_zero() {
            return if self.real > 0.0 {
                Number::real(f64::INFINITY)
            } else if self.real < 0.0 {
                Number::real(f64::NEG_INFINITY)
            } else {
                Number::real(f64::NAN)
            };
        }
        let conj = other.conjugate();
        let numerator = self.mul(&conj);
        let magnitude = other.mul(&conj).real;
        Number::new(numerator.real / magnitude, numerator.imag / magnitude)
    }

    pub fn rem(&self, other: &Number) -> Number {
        if other.is_zero() {
            return Number::real(f64::NAN);
        }
        let conj = other.conjugate();
        let numerator = self.mul(&conj);
        let magnitude = other.mul(&conj).real;
        Number::new(numerator.real % magnitude, numerator.imag % magnitude)
    }

    /// Exponent 0 is 1, exponent 1 is the base itself; a complex base with a
    /// positive integer exponent multiplies in a loop; everything else
    /// delegates to the n-th root with `n = 1/exponent`.
    pub fn pow(&self, exponent: &Number) -> Number {
        if exponent.is_complex() {
            return Number::real(f64::NAN);
        }
        let exp = exponent.real;
        if exp == 0.0 {
            return Number::real(1.0);
        }
        if exp == 1.0 {
            return *self;
        }
        if exp > 0.0 && exp.fract() == 0.0 {
            if self.is_complex() {
                let mut acc = *self;
                let mut n = exp as u64;
                while n > 1 {
                    acc = acc.mul(self);
                    n -= 1;
                }
                return acc;
            }
            return Number::real(self.real.powf(exp));
        }
        self.root(1.0 / exp)
    }

    /// Principal n-th root in polar form; components closer to zero than
    /// 1e-12 are clamped so `raiz(-1, 2)` comes out as exactly `i`.
    pub fn root(&self, n: f64) -> Number {
        if n == 0.0 {
            return Number::real(f64::NAN);
        }
        if !self.is_complex() && self.real >= 0.0 {
            return Number::real(self.real.powf(1.0 / n));
        }
        let radius = (self.real * self.real + self.imag * self.imag).sqrt();
        let angle = self.imag.atan2(self.real) / n;
        let magnitude = radius.powf(1.0 / n);
        let clamp = |x: f64| if x.abs() < 1e-12 { 0.0 } else { x };
        Number::new(clamp(magnitude * angle.cos()), clamp(magnitude * angle.sin()))
    }

    pub fn to_display(&self) -> String {
        if self.real.is_nan() {
            return "NeN".to_string();
        }
        if self.real == f64::INFINITY {
            return "Infinito".to_string();
        }
        if self.real == f64::NEG_INFINITY {
            return "-Infinito".to_string();
        }
        if self.imag == 0.0 {
            return self.real.to_string();
        }
        if self.real == 0.0 {
            return if self.imag == 1.0 {
                "i".to_string()
            } else {
                format!("{}i", self.imag)
            };
        }
        format!(
            "{}{}{}i",
            self.real,
            if self.imag > 0.0 { "+" } else { "" },
            if self.imag == 1.0 {
                String::new()
            } else {
                self.imag.to_string()
            }
        )
    }
}

/// Signature of every native function: the running interpreter, the bound
/// `este` value, and the positional arguments.
pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, Error>>;

pub struct FunctionValue {
    /// Parsed declaration for body-backed functions, `None` for natives.
    pub decl: Option<Rc<FunctionDecl>>,
    /// Captured closure environment; every call opens a fresh child of it.
    pub env: Option<EnvRef>,
    pub native: Option<NativeFn>,
    pub props: Properties,
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("decl", &self.decl)
            .field("native", &self.native.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct ClassValue {
    pub name: Rc<str>,
    pub constructor: Option<Rc<FunctionValue>>,
    /// Instance prototype table, shared by every instance of this class.
    pub proto: TableId,
    /// `props.own` holds the statics.
    pub props: Properties,
}

#[derive(Debug)]
pub struct ModuleValue {
    pub path: Rc<str>,
    pub folder: Rc<str>,
    pub props: Properties,
}

#[derive(Debug, Clone)]
pub enum Value {
    // Primitives
    Null,
    Void,
    Boolean(bool),
    Number(Rc<Number>),
    Str(Rc<str>),
    Buffer(Rc<[u8]>),
    // Complex
    Object(Rc<Properties>),
    List(Rc<Properties>),
    Function(Rc<FunctionValue>),
    Class(Rc<ClassValue>),
    Module(Rc<ModuleValue>),
    // Internal: produced while evaluating member expressions and iterable
    // literals, never part of a user-visible data structure.
    PropertyRef(Rc<str>),
    Iterator(Rc<RefCell<VecDeque<Value>>>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Void, Value::Void) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => {
                Rc::ptr_eq(a, b) || (a.real == b.real && a.imag == b.imag)
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Buffer(a), Value::Buffer(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.own == b.own,
            (Value::List(a), Value::List(b)) => a.own == b.own,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::PropertyRef(a), Value::PropertyRef(b)) => a == b,
            (Value::Iterator(a), Value::Iterator(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    pub fn string(text: impl AsRef<str>) -> Value {
        Value::Str(Rc::from(text.as_ref()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "nulo",
            Value::Void => "vacio",
            Value::Boolean(_) => "booleano",
            Value::Number(_) => "numero",
            Value::Str(_) => "cadena",
            Value::Buffer(_) => "buffer",
            Value::Object(_) => "objeto",
            Value::List(_) => "lista",
            Value::Function(_) => "funcion",
            Value::Class(_) => "clase",
            Value::Module(_) => "modulo",
            Value::PropertyRef(_) => "propiedad",
            Value::Iterator(_) => "iterador",
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Null
                | Value::Void
                | Value::Boolean(_)
                | Value::Number(_)
                | Value::Str(_)
                | Value::Buffer(_)
        )
    }

    pub fn is_complex(&self) -> bool {
        self.properties().is_some()
    }

    /// The property chain of a complex value; primitives resolve only
    /// through their per-type default table.
    pub fn properties(&self) -> Option<&Properties> {
        match self {
            Value::Object(props) | Value::List(props) => Some(props),
            Value::Function(f) => Some(&f.props),
            Value::Class(c) => Some(&c.props),
            Value::Module(m) => Some(&m.props),
            _ => None,
        }
    }

    pub fn is_truthy(&self, tables: &Tables) -> bool {
        match self {
            Value::Null | Value::Void => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_nan() && n.real != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Buffer(_) => true,
            Value::PropertyRef(name) => !name.is_empty(),
            Value::Iterator(items) => !items.borrow().is_empty(),
            other => match other.properties() {
                Some(props) => !tables.is_empty(props.own),
                None => true,
            },
        }
    }

    /// Truthiness of the bare primitive payload, used by the condition
    /// operators. Complex operands never reach this path.
    pub fn payload_truthy(&self) -> bool {
        match self {
            Value::Null | Value::Void => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_nan() && n.real != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Buffer(_) => true,
            _ => true,
        }
    }

    /// Numeric coercion of a primitive payload: booleans count 0/1, null and
    /// void are not numbers, strings parse or come out NeN.
    pub fn payload_number(&self) -> Number {
        match self {
            Value::Number(n) => **n,
            Value::Boolean(true) => Number::real(1.0),
            Value::Boolean(false) => Number::real(0.0),
            Value::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Number::real(0.0)
                } else {
                    Number::real(trimmed.parse::<f64>().unwrap_or(f64::NAN))
                }
            }
            _ => Number::real(f64::NAN),
        }
    }

    /// String coercion of a primitive payload.
    pub fn payload_string(&self) -> String {
        match self {
            Value::Null => "nulo".to_string(),
            Value::Void => "vacio".to_string(),
            Value::Boolean(true) => "verdadero".to_string(),
            Value::Boolean(false) => "falso".to_string(),
            Value::Number(n) => n.to_display(),
            Value::Str(s) => s.to_string(),
            Value::Buffer(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            other => other.type_name().to_string(),
        }
    }

    /// JS-style ToInt32 over the numeric payload, for `&` and `|`.
    pub fn payload_int32(&self) -> i32 {
        let n = self.payload_number().real;
        if !n.is_finite() {
            return 0;
        }
        let truncated = n.trunc();
        let wrapped = ((truncated % 4294967296.0) + 4294967296.0) % 4294967296.0;
        if wrapped >= 2147483648.0 {
            (wrapped - 4294967296.0) as i32
        } else {
            wrapped as i32
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(**n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<FunctionValue>> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&Rc<ClassValue>> {
        match self {
            Value::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&Rc<ModuleValue>> {
        match self {
            Value::Module(m) => Some(m),
            _ => None,
        }
    }
}
