#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDeclaration {
        name: String,
        constant: bool,
        value: Option<Expr>,
    },
    Function(FunctionDecl),
    Class {
        name: String,
        members: Vec<ClassMember>,
    },
    If {
        condition: Expr,
        body: Vec<Stmt>,
        /// `entonces { ... }`; an `entonces si` chain nests another
        /// [`Stmt::If`] as the sole statement of this branch.
        else_branch: Option<Vec<Stmt>>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Expr(Expr),
}

/// Shared by `funcion` statements, inline function literals and class
/// methods. An empty `name` means the function is anonymous.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

/// One `clase` body entry. Members flagged static (or named `constructor`)
/// land on the class itself; the rest populate the instance prototype.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMember {
    pub name: String,
    pub is_static: bool,
    pub value: Expr,
}

/// One `clave: valor` pair of an object or array literal. A missing value is
/// the shorthand form `{ clave }`; array literals always carry synthesized
/// integer-string keys.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEntry {
    pub key: String,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(String),
    /// A bare member name after `.`, resolved against the object, never the
    /// environment.
    PropertyIdentifier(String),
    NumericLiteral(f64),
    StringLiteral(String),
    Object(Vec<PropertyEntry>),
    Array(Vec<PropertyEntry>),
    /// `<expr>` — requests the wrapped value's iterator.
    Iterable(Box<Expr>),
    Function(Box<FunctionDecl>),
    Binary {
        left: Box<Expr>,
        /// Operator spelling; compound forms (`==`, `&&`, `!==`, ...) are
        /// merged from single-character tokens by the parser.
        operator: String,
        right: Box<Expr>,
    },
    Assignment {
        assignee: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
        computed: bool,
    },
}

impl FunctionDecl {
    /// Re-renders the declaration as source text, used by `aCadena` on
    /// function values.
    pub fn to_source(&self) -> String {
        let mut out = String::from("funcion ");
        out.push_str(&self.name);
        out.push('(');
        out.push_str(&self.params.join(", "));
        out.push_str(") ");
        write_block(&mut out, &self.body, 0);
        out
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn write_block(out: &mut String, body: &[Stmt], depth: usize) {
    if body.is_empty() {
        out.push_str("{ }");
        return;
    }
    out.push_str("{\n");
    for stmt in body {
        indent(out, depth + 1);
        write_stmt(out, stmt, depth + 1);
        out.push('\n');
    }
    indent(out, depth);
    out.push('}');
}

fn write_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    match stmt {
        Stmt::VarDeclaration { name, constant, value } => {
            out.push_str(if *constant { "const " } else { "def " });
            out.push_str(name);
            if let Some(value) = value {
                out.push_str(" = ");
                write_expr(out, value);
            }
            out.push(';');
        }
        Stmt::Function(decl) => {
            out.push_str("funcion ");
            out.push_str(&decl.name);
            out.push('(');
            out.push_str(&decl.params.join(", "));
            out.push_str(") ");
            write_block(out, &decl.body, depth);
        }
        Stmt::Class { name, members } => {
            out.push_str("clase ");
            out.push_str(name);
            out.push_str(" {\n");
            for member in members {
                indent(out, depth + 1);
                if member.is_static {
                    out.push_str("estatico ");
                }
                match &member.value {
                    Expr::Function(decl) => {
                        out.push_str(&member.name);
                        out.push('(');
                        out.push_str(&decl.params.join(", "));
                        out.push_str(") ");
                        write_block(out, &decl.body, depth + 1);
                    }
                    value => {
                        out.push_str(&member.name);
                        out.push_str(" = ");
                        write_expr(out, value);
                        out.push(';');
                    }
                }
                out.push('\n');
            }
            indent(out, depth);
            out.push('}');
        }
        Stmt::If { condition, body, else_branch } => {
            out.push_str("si (");
            write_expr(out, condition);
            out.push_str(") ");
            write_block(out, body, depth);
            if let Some(else_branch) = else_branch {
                out.push_str(" entonces ");
                match else_branch.as_slice() {
                    [Stmt::If { .. }] => write_stmt(out, &else_branch[0], depth),
                    _ => write_block(out, else_branch, depth),
                }
            }
        }
        Stmt::While { condition, body } => {
            out.push_str("mientras (");
            write_expr(out, condition);
            out.push_str(") ");
            write_block(out, body, depth);
        }
        Stmt::Return(value) => {
            out.push_str("retorna");
            if let Some(value) = value {
                out.push(' ');
                write_expr(out, value);
            }
            out.push(';');
        }
        Stmt::Break => out.push_str("romper;"),
        Stmt::Continue => out.push_str("continuar;"),
        Stmt::Expr(expr) => {
            write_expr(out, expr);
            out.push(';');
        }
    }
}

fn write_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Identifier(name) | Expr::PropertyIdentifier(name) => out.push_str(name),
        Expr::NumericLiteral(n) => out.push_str(&n.to_string()),
        Expr::StringLiteral(s) => {
            out.push('"');
            for c in s.chars() {
                match c {
                    '\\' => out.push_str("\\\\"),
                    '"' => out.push_str("\\\""),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    '\r' => out.push_str("\\r"),
                    c => out.push(c),
                }
            }
            out.push('"');
        }
        Expr::Object(entries) => {
            out.push_str("{ ");
            for (i, entry) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&entry.key);
                if let Some(value) = &entry.value {
                    out.push_str(": ");
                    write_expr(out, value);
                }
            }
            out.push_str(" }");
        }
        Expr::Array(entries) => {
            out.push('[');
            for (i, entry) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                match &entry.value {
                    Some(value) => write_expr(out, value),
                    None => out.push_str(&entry.key),
                }
            }
            out.push(']');
        }
        Expr::Iterable(inner) => {
            out.push('<');
            write_expr(out, inner);
            out.push('>');
        }
        Expr::Function(decl) => {
            out.push_str("funcion ");
            out.push_str(&decl.name);
            out.push('(');
            out.push_str(&decl.params.join(", "));
            out.push_str(") ");
            write_block(out, &decl.body, 0);
        }
        Expr::Binary { left, operator, right } => {
            write_expr(out, left);
            out.push(' ');
            out.push_str(operator);
            out.push(' ');
            write_expr(out, right);
        }
        Expr::Assignment { assignee, value } => {
            write_expr(out, assignee);
            out.push_str(" = ");
            write_expr(out, value);
        }
        Expr::Call { callee, args } => {
            write_expr(out, callee);
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(out, arg);
            }
            out.push(')');
        }
        Expr::Member { object, property, computed } => {
            write_expr(out, object);
            if *computed {
                out.push('[');
                write_expr(out, property);
                out.push(']');
            } else {
                out.push('.');
                write_expr(out, property);
            }
        }
    }
}
