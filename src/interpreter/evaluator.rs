use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::ast::{ClassMember, Expr, FunctionDecl, Program, PropertyEntry, Stmt};
use crate::error::Error;
use crate::interpreter::builtins::{self, Registry};
use crate::interpreter::control_flow::Flow;
use crate::interpreter::environment::{EnvRef, Environment};
use crate::interpreter::loader::Loader;
use crate::interpreter::parser::TokenParser;
use crate::value::{ClassValue, FunctionValue, ModuleValue, Number, Properties, Value};

/// The tree-walking evaluator. Owns the property-table arena, the singleton
/// registry, the module loader and the global scope frame.
pub struct Interpreter {
    pub tables: crate::value::Tables,
    pub registry: Registry,
    pub loader: Loader,
    globals: EnvRef,
    colors: bool,
    /// Innermost entry is the module currently being evaluated; `requiere`
    /// resolves specifiers against its folder and records children on it.
    module_stack: Vec<Rc<ModuleValue>>,
}

impl Interpreter {
    pub fn new() -> Self {
        let mut tables = crate::value::Tables::new();
        let registry = Registry::new(&mut tables);
        let mut interp = Self {
            tables,
            registry,
            loader: Loader::new(),
            globals: Environment::root(),
            colors: false,
            module_stack: Vec::new(),
        };
        builtins::install(&mut interp);
        interp
    }

    pub fn globals(&self) -> EnvRef {
        Rc::clone(&self.globals)
    }

    pub fn colors(&self) -> bool {
        self.colors
    }

    pub fn set_colors(&mut self, on: bool) {
        self.colors = on;
    }

    pub fn current_module(&self) -> Option<Rc<ModuleValue>> {
        self.module_stack.last().cloned()
    }

    pub fn push_module(&mut self, module: Rc<ModuleValue>) {
        self.module_stack.push(module);
    }

    pub fn pop_module(&mut self) {
        self.module_stack.pop();
    }

    // === Value construction ===

    /// Canonical number constructor: 0, 1, -1, NeN and the two infinities
    /// come out as the registry's identity-stable singletons.
    pub fn make_number(&self, real: f64, imag: f64) -> Value {
        if real.is_nan() {
            return Value::Number(Rc::clone(&self.registry.nan));
        }
        if real == f64::INFINITY {
            return Value::Number(Rc::clone(&self.registry.infinity));
        }
        if real == f64::NEG_INFINITY {
            return Value::Number(Rc::clone(&self.registry.neg_infinity));
        }
        if imag == 0.0 {
            if real == 0.0 {
                return Value::Number(Rc::clone(&self.registry.zero));
            }
            if real == 1.0 {
                return Value::Number(Rc::clone(&self.registry.one));
            }
            if real == -1.0 {
                return Value::Number(Rc::clone(&self.registry.neg_one));
            }
        }
        Value::Number(Rc::new(Number::new(real, imag)))
    }

    pub fn make_real(&self, real: f64) -> Value {
        self.make_number(real, 0.0)
    }

    fn number_value(&self, n: Number) -> Value {
        self.make_number(n.real, n.imag)
    }

    pub fn new_object(&mut self) -> Value {
        let own = self.tables.alloc();
        Value::Object(Rc::new(Properties::new(
            own,
            vec![self.registry.object_defaults],
        )))
    }

    pub fn object_from(&mut self, entries: Vec<(String, Value)>) -> Value {
        let object = self.new_object();
        if let Some(own) = object.properties().map(|p| p.own) {
            for (key, value) in entries {
                self.tables.set(own, key, value);
            }
        }
        object
    }

    pub fn new_list(&mut self) -> Value {
        let own = self.tables.alloc();
        Value::List(Rc::new(Properties::new(
            own,
            vec![self.registry.list_defaults],
        )))
    }

    pub fn list_from(&mut self, items: Vec<Value>) -> Value {
        let list = self.new_list();
        if let Some(own) = list.properties().map(|p| p.own) {
            for (index, item) in items.into_iter().enumerate() {
                self.tables.set(own, index.to_string(), item);
            }
        }
        list
    }

    pub fn native_function(
        &mut self,
        name: &str,
        native: impl Fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, Error> + 'static,
    ) -> Value {
        let own = self.tables.alloc();
        self.tables.set(own, "nombre", Value::string(name));
        Value::Function(Rc::new(FunctionValue {
            decl: None,
            env: None,
            native: Some(Rc::new(native)),
            props: Properties::new(own, vec![self.registry.function_defaults]),
        }))
    }

    pub fn declared_function(&mut self, decl: Rc<FunctionDecl>, env: &EnvRef) -> Value {
        let own = self.tables.alloc();
        // Anonymous functions keep an empty name entry so every function
        // value carries at least one own property.
        self.tables.set(own, "nombre", Value::string(decl.name.as_str()));
        Value::Function(Rc::new(FunctionValue {
            decl: Some(decl),
            env: Some(Rc::clone(env)),
            native: None,
            props: Properties::new(own, vec![self.registry.function_defaults]),
        }))
    }

    // === Property resolution ===

    /// Total property lookup: own entries and fallbacks for complex values,
    /// the per-type default table for primitives, then the bootstrap
    /// `constructor`/`prototipo` keys, and finally null. Member access never
    /// fails.
    pub fn resolve_property(&self, value: &Value, key: &str) -> Value {
        if let Some(props) = value.properties() {
            if let Some(found) = props.resolve(&self.tables, key) {
                return found;
            }
        } else if let Some(defaults) = self.registry.defaults_for(value.type_name()) {
            if let Some(found) = self.tables.get(defaults, key) {
                return found.clone();
            }
        }
        if key == "constructor" || key == "prototipo" {
            if let Some(class) = self.registry.class_for(value.type_name()) {
                return class;
            }
        }
        Value::Null
    }

    pub fn set_property(&mut self, value: &Value, key: &str, entry: Value) -> Result<(), Error> {
        match value.properties() {
            Some(props) => {
                self.tables.set(props.own, key, entry);
                Ok(())
            }
            None => Err(Error::invalid_syntax(format!(
                "No se puede asignar la propiedad '{}' a un '{}'",
                key,
                value.type_name()
            ))),
        }
    }

    // === Evaluation ===

    /// Parses and evaluates source text in a fresh frame under the globals.
    pub fn eval_source(&mut self, source: &str) -> Result<Value, Error> {
        let program = TokenParser::produce_ast(source)?;
        let env = Environment::child(&self.globals);
        self.eval_program(&program, &env)
    }

    /// Like [`Interpreter::eval_source`] but reuses a caller-held frame, so
    /// the caller can inspect bindings afterwards.
    pub fn eval_source_in(&mut self, source: &str, env: &EnvRef) -> Result<Value, Error> {
        let program = TokenParser::produce_ast(source)?;
        self.eval_program(&program, env)
    }

    /// Evaluates a whole program and yields the last statement's value, null
    /// for an empty program. Control signals cannot escape a program because
    /// the parser rejects `retorna`/`romper`/`continuar` outside their
    /// constructs.
    pub fn eval_program(&mut self, program: &Program, env: &EnvRef) -> Result<Value, Error> {
        let mut last = Value::Null;
        for stmt in &program.body {
            last = self.eval_stmt(stmt, env)?.into_value();
        }
        Ok(last)
    }

    fn eval_stmt(&mut self, stmt: &Stmt, env: &EnvRef) -> Result<Flow, Error> {
        match stmt {
            Stmt::VarDeclaration { name, constant, value } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Null,
                };
                env.declare(name, value.clone(), *constant)?;
                Ok(Flow::Value(value))
            }
            Stmt::Function(decl) => {
                let function = self.declared_function(Rc::new(decl.clone()), env);
                env.declare(&decl.name, function.clone(), false)?;
                Ok(Flow::Value(function))
            }
            Stmt::Class { name, members } => {
                let class = self.eval_class(name, members, env)?;
                env.declare(name, class.clone(), false)?;
                Ok(Flow::Value(class))
            }
            Stmt::If { condition, body, else_branch } => {
                let condition = self.eval_expr(condition, env)?;
                if condition.is_truthy(&self.tables) {
                    self.eval_block(body, env)
                } else if let Some(else_body) = else_branch {
                    self.eval_block(else_body, env)
                } else {
                    Ok(Flow::Value(Value::Null))
                }
            }
            Stmt::While { condition, body } => {
                loop {
                    let condition = self.eval_expr(condition, env)?;
                    if !condition.is_truthy(&self.tables) {
                        break;
                    }
                    match self.eval_block(body, env)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Value(_) => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Value(Value::Null))
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Void,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Expr(expr) => Ok(Flow::Value(self.eval_expr(expr, env)?)),
        }
    }

    /// Statement lists run in the enclosing frame; the first control signal
    /// stops the list and propagates.
    fn eval_block(&mut self, body: &[Stmt], env: &EnvRef) -> Result<Flow, Error> {
        let mut last = Value::Null;
        for stmt in body {
            match self.eval_stmt(stmt, env)? {
                Flow::Value(value) => last = value,
                signal => return Ok(signal),
            }
        }
        Ok(Flow::Value(last))
    }

    fn eval_class(
        &mut self,
        name: &str,
        members: &[ClassMember],
        env: &EnvRef,
    ) -> Result<Value, Error> {
        let proto = self.tables.alloc();
        let statics = self.tables.alloc();
        self.tables.set(statics, "nombre", Value::string(name));
        let mut constructor = None;
        for member in members {
            let value = self.eval_expr(&member.value, env)?;
            if member.name == "constructor" {
                if let Value::Function(f) = &value {
                    constructor = Some(Rc::clone(f));
                }
                self.tables.set(statics, member.name.clone(), value);
            } else if member.is_static {
                self.tables.set(statics, member.name.clone(), value);
            } else {
                self.tables.set(proto, member.name.clone(), value);
            }
        }
        Ok(Value::Class(Rc::new(ClassValue {
            name: Rc::from(name),
            constructor,
            proto,
            props: Properties::new(statics, vec![self.registry.class_defaults]),
        })))
    }

    fn eval_expr(&mut self, expr: &Expr, env: &EnvRef) -> Result<Value, Error> {
        match expr {
            Expr::NumericLiteral(value) => Ok(self.make_real(*value)),
            Expr::StringLiteral(text) => Ok(Value::string(text.as_str())),
            Expr::Identifier(name) => env.lookup(name),
            Expr::PropertyIdentifier(name) => Ok(Value::PropertyRef(Rc::from(name.as_str()))),
            Expr::Object(entries) => self.eval_object_literal(entries, env),
            Expr::Array(entries) => self.eval_array_literal(entries, env),
            Expr::Iterable(inner) => self.eval_iterable(inner, env),
            Expr::Function(decl) => {
                Ok(self.declared_function(Rc::new((**decl).clone()), env))
            }
            Expr::Binary { left, operator, right } => {
                let lhs = self.eval_expr(left, env)?;
                let rhs = self.eval_expr(right, env)?;
                self.apply_binary(&lhs, operator, &rhs)
            }
            Expr::Assignment { assignee, value } => self.eval_assignment(assignee, value, env),
            Expr::Call { callee, args } => self.eval_call(callee, args, env),
            Expr::Member { object, property, computed } => {
                let object = self.eval_expr(object, env)?;
                let key = self.member_key(property, *computed, env)?;
                Ok(self.resolve_property(&object, &key))
            }
        }
    }

    fn eval_object_literal(
        &mut self,
        entries: &[PropertyEntry],
        env: &EnvRef,
    ) -> Result<Value, Error> {
        let object = self.new_object();
        if let Some(own) = object.properties().map(|p| p.own) {
            for entry in entries {
                let value = match &entry.value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    // Shorthand `{ clave }` resolves the key as a variable.
                    None => env.lookup(&entry.key)?,
                };
                self.tables.set(own, entry.key.clone(), value);
            }
        }
        Ok(object)
    }

    fn eval_array_literal(
        &mut self,
        entries: &[PropertyEntry],
        env: &EnvRef,
    ) -> Result<Value, Error> {
        let list = self.new_list();
        if let Some(own) = list.properties().map(|p| p.own) {
            for entry in entries {
                let value = match &entry.value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => env.lookup(&entry.key)?,
                };
                self.tables.set(own, entry.key.clone(), value);
            }
        }
        Ok(list)
    }

    /// `<expr>` snapshots the operand into an iterator: lists contribute
    /// their integer-keyed elements in numeric order, strings their
    /// characters as one-character strings.
    fn eval_iterable(&mut self, inner: &Expr, env: &EnvRef) -> Result<Value, Error> {
        let source = self.eval_expr(inner, env)?;
        let items: VecDeque<Value> = match &source {
            Value::List(props) => {
                let own = props.own;
                self.tables
                    .integer_keys(own)
                    .into_iter()
                    .filter_map(|(_, key)| self.tables.get(own, &key).cloned())
                    .collect()
            }
            Value::Str(s) => s.chars().map(|c| Value::string(c.to_string())).collect(),
            other => {
                return Err(Error::invalid_type(format!(
                    "El valor de tipo '{}' no es iterable",
                    other.type_name()
                )))
            }
        };
        Ok(Value::Iterator(Rc::new(RefCell::new(items))))
    }

    // === Binary operators ===

    /// The condition operators compare primitive payloads and never fail;
    /// everything else runs through the numeric/string coercion ladder.
    pub fn apply_binary(&mut self, lhs: &Value, operator: &str, rhs: &Value) -> Result<Value, Error> {
        match operator {
            "==" | "!=" | "===" | "!==" | "&&" | "||" | "&" | "|" => {
                Ok(self.apply_condition(lhs, operator, rhs))
            }
            _ => self.apply_arithmetic(lhs, operator, rhs),
        }
    }

    fn apply_condition(&self, lhs: &Value, operator: &str, rhs: &Value) -> Value {
        if !lhs.is_primitive() || !rhs.is_primitive() {
            return Value::Null;
        }
        match operator {
            "==" => Value::Boolean(payload_equal(lhs, rhs)),
            "!=" => Value::Boolean(!payload_equal(lhs, rhs)),
            "===" => {
                Value::Boolean(payload_equal(lhs, rhs) && lhs.type_name() == rhs.type_name())
            }
            "!==" => {
                Value::Boolean(!payload_equal(lhs, rhs) || lhs.type_name() != rhs.type_name())
            }
            "&&" => self.select_payload(lhs, rhs, true),
            "||" => self.select_payload(lhs, rhs, false),
            "&" => self.make_real((lhs.payload_int32() & rhs.payload_int32()) as f64),
            "|" => self.make_real((lhs.payload_int32() | rhs.payload_int32()) as f64),
            _ => Value::Null,
        }
    }

    /// `&&`/`||` evaluate both sides and keep one payload: the selected
    /// operand comes back as a number when numeric, else as the boolean of
    /// its truthiness.
    fn select_payload(&self, left: &Value, right: &Value, pick_right_when_truthy: bool) -> Value {
        let selected = if left.payload_truthy() == pick_right_when_truthy {
            right
        } else {
            left
        };
        match selected {
            Value::Number(n) => Value::Number(Rc::clone(n)),
            other => Value::Boolean(other.payload_truthy()),
        }
    }

    fn apply_arithmetic(
        &mut self,
        lhs: &Value,
        operator: &str,
        rhs: &Value,
    ) -> Result<Value, Error> {
        if !lhs.is_primitive() || !rhs.is_primitive() {
            return Err(Error::invalid_operation(
                "No se puede operar con valores complejos",
            ));
        }
        let has_number = matches!(lhs, Value::Number(_)) || matches!(rhs, Value::Number(_));
        if has_number {
            let l = lhs.payload_number();
            let r = rhs.payload_number();
            if l.is_nan() || r.is_nan() {
                return Ok(Value::Number(Rc::clone(&self.registry.nan)));
            }
            let result = match operator {
                "+" => l.add(&r),
                "-" => l.sub(&r),
                "*" => l.mul(&r),
                "/" => l.div(&r),
                "%" => l.rem(&r),
                "^" => {
                    if r.is_zero() {
                        Number::real(1.0)
                    } else if l.is_zero() {
                        Number::real(0.0)
                    } else {
                        l.pow(&r)
                    }
                }
                _ => {
                    return Err(Error::invalid_operation(format!(
                        "El operador '{}' no se reconoce",
                        operator
                    )))
                }
            };
            return Ok(self.number_value(result));
        }
        let has_string = matches!(lhs, Value::Str(_)) || matches!(rhs, Value::Str(_));
        if has_string {
            if operator == "+" {
                let joined = format!("{}{}", lhs.payload_string(), rhs.payload_string());
                return Ok(Value::string(joined));
            }
            return Err(Error::invalid_operation("No se puede operar con cadenas"));
        }
        Err(Error::invalid_operation(format!(
            "No se puede operar con {}",
            lhs.type_name()
        )))
    }

    // === Assignment ===

    fn eval_assignment(
        &mut self,
        assignee: &Expr,
        value: &Expr,
        env: &EnvRef,
    ) -> Result<Value, Error> {
        match assignee {
            Expr::Member { object, property, computed } => {
                let target = self.eval_expr(object, env)?;
                let key = self.member_key(property, *computed, env)?;
                let new_value = self.eval_expr(value, env)?;
                self.set_property(&target, &key, new_value.clone())?;
                Ok(new_value)
            }
            Expr::Identifier(name) => {
                let new_value = self.eval_expr(value, env)?;
                env.assign(name, new_value.clone())?;
                Ok(new_value)
            }
            _ => Err(Error::invalid_syntax("Asignacion invalida")),
        }
    }

    /// The property key of a member expression: a bare name after `.`, or
    /// the payload string of a computed `[expr]` (numeric keys coerce to
    /// their string form).
    fn member_key(&mut self, property: &Expr, computed: bool, env: &EnvRef) -> Result<String, Error> {
        if !computed {
            if let Expr::PropertyIdentifier(name) = property {
                return Ok(name.clone());
            }
        }
        let key = self.eval_expr(property, env)?;
        Ok(key.payload_string())
    }

    // === Calls ===

    fn eval_call(&mut self, callee_expr: &Expr, args: &[Expr], env: &EnvRef) -> Result<Value, Error> {
        // Member calls evaluate the object once and reuse it as este.
        let (callee, este) = match callee_expr {
            Expr::Member { object, property, computed } => {
                let object = self.eval_expr(object, env)?;
                let key = self.member_key(property, *computed, env)?;
                let callee = self.resolve_property(&object, &key);
                (callee, Some(object))
            }
            other => (self.eval_expr(other, env)?, None),
        };

        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.eval_expr(arg, env)?);
        }

        match &callee {
            Value::Class(class) => self.instantiate(class, &arg_values),
            Value::Number(n) => self.implicit_multiply(n, &arg_values),
            Value::Function(function) => {
                let este = este.unwrap_or_else(|| callee.clone());
                self.call_function(function, &este, &arg_values)
            }
            _ => Err(Error::invalid_syntax(format!(
                "'{}' no es una funcion",
                callee_name(callee_expr)
            ))),
        }
    }

    /// Builds the instance (own table falling back to the class prototype,
    /// then the object defaults), runs the constructor with `este` bound to
    /// it, and yields the instance. The constructor's own return value is
    /// discarded. A native constructor is a factory instead: its result is
    /// the instantiation result, which is how `Lista(1, 2)` yields a list
    /// rather than a wrapper object.
    fn instantiate(&mut self, class: &Rc<ClassValue>, args: &[Value]) -> Result<Value, Error> {
        if let Some(constructor) = &class.constructor {
            if constructor.native.is_some() {
                let constructor = Rc::clone(constructor);
                let este = Value::Class(Rc::clone(class));
                return self.call_function(&constructor, &este, args);
            }
        }
        let own = self.tables.alloc();
        let instance = Value::Object(Rc::new(Properties::new(
            own,
            vec![class.proto, self.registry.object_defaults],
        )));
        if let Some(constructor) = &class.constructor {
            let constructor = Rc::clone(constructor);
            self.call_function(&constructor, &instance, args)?;
        }
        Ok(instance)
    }

    /// A numeric callee multiplies by its single argument. The quirk lets
    /// `2(3 + 1)` read as `2 * (3 + 1)`.
    fn implicit_multiply(&self, callee: &Number, args: &[Value]) -> Result<Value, Error> {
        let arg = match args.first() {
            Some(arg) => arg,
            None => {
                return Err(Error::invalid_syntax(format!(
                    "No se puede multiplicar {} por nulo",
                    callee.to_display()
                )))
            }
        };
        let factor = arg.payload_number();
        if factor.is_nan() {
            return Err(Error::invalid_syntax(format!(
                "No se puede multiplicar {} por {}",
                callee.to_display(),
                arg.payload_string()
            )));
        }
        Ok(self.number_value(callee.mul(&factor)))
    }

    /// Invokes a function value: natives run their callback directly; a
    /// declared function opens a fresh child frame of its captured closure
    /// with `este`, `argumentos` and the parameters bound, runs the body,
    /// and unwraps a propagated return signal (void when none).
    pub fn call_function(
        &mut self,
        function: &Rc<FunctionValue>,
        este: &Value,
        args: &[Value],
    ) -> Result<Value, Error> {
        if let Some(native) = &function.native {
            let native = Rc::clone(native);
            return native(self, este, args);
        }
        let (decl, closure) = match (&function.decl, &function.env) {
            (Some(decl), Some(env)) => (Rc::clone(decl), Rc::clone(env)),
            _ => return Err(Error::invalid_type("La funcion no tiene cuerpo")),
        };
        let frame = Environment::child(&closure);
        frame.declare("este", este.clone(), false)?;
        let argumentos = self.list_from(args.to_vec());
        frame.declare("argumentos", argumentos, false)?;
        for (index, param) in decl.params.iter().enumerate() {
            let value = args.get(index).cloned().unwrap_or(Value::Null);
            frame.declare(param, value, false)?;
        }
        for stmt in &decl.body {
            if let Flow::Return(value) = self.eval_stmt(stmt, &frame)? {
                return Ok(value);
            }
        }
        Ok(Value::Void)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Loose payload equality for `==`/`!=`. Same-type payloads compare
/// directly (full real and imaginary parts for numbers; the NeN singleton
/// equals itself); mixed numeric, string and boolean operands compare
/// through their numeric payloads; null and void equal each other and
/// nothing else.
fn payload_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Null | Value::Void, Value::Null | Value::Void) => true,
        (Value::Null | Value::Void, _) | (_, Value::Null | Value::Void) => false,
        (Value::Number(a), Value::Number(b)) => {
            Rc::ptr_eq(a, b) || (a.real == b.real && a.imag == b.imag)
        }
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Buffer(a), Value::Buffer(b)) => a == b,
        _ => {
            let a = lhs.payload_number();
            let b = rhs.payload_number();
            !a.is_nan() && !b.is_nan() && a.real == b.real && a.imag == b.imag
        }
    }
}

/// Display name of a call target for the "no es una funcion" report, taken
/// from the callee expression itself.
fn callee_name(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(name) => name.clone(),
        Expr::Function(decl) if !decl.name.is_empty() => decl.name.clone(),
        Expr::StringLiteral(text) => text.clone(),
        _ => "nulo".to_string(),
    }
}
