use crate::ast::{ClassMember, Expr, FunctionDecl, Program, PropertyEntry, Stmt};
use crate::error::Error;
use crate::lexer;
use crate::token::Token;

/// Context flags threaded through statement parsing: `retorna` is only
/// valid inside a function body, `romper`/`continuar` inside a loop body.
/// A function body resets the loop flag, so a break can never cross a
/// function boundary.
#[derive(Debug, Clone, Copy, Default)]
struct Ctx {
    in_function: bool,
    in_loop: bool,
}

impl Ctx {
    fn function(self) -> Ctx {
        Ctx {
            in_function: true,
            in_loop: false,
        }
    }

    fn loop_body(self) -> Ctx {
        Ctx {
            in_loop: true,
            ..self
        }
    }
}

/// Recursive-descent parser over the token stream. The first syntax error
/// aborts the parse; there is no recovery.
pub struct TokenParser {
    tokens: Vec<Token>,
    current: usize,
}

impl TokenParser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last() != Some(&Token::Eof) {
            tokens.push(Token::Eof);
        }
        Self { tokens, current: 0 }
    }

    /// Lexes and parses a whole source text.
    pub fn produce_ast(source: &str) -> Result<Program, Error> {
        let tokens = lexer::tokenize(source)?;
        TokenParser::new(tokens).parse()
    }

    /// Lexes and parses source text as a function body, so a top-level
    /// `retorna` is accepted. `Funcion(...)` builds its callable this way.
    pub fn produce_function_body(source: &str) -> Result<Vec<Stmt>, Error> {
        let tokens = lexer::tokenize(source)?;
        let mut parser = TokenParser::new(tokens);
        let ctx = Ctx::default().function();
        let mut body = Vec::new();
        while !parser.is_eof() {
            if matches!(parser.at(), Token::Semicolon) {
                parser.eat();
                continue;
            }
            body.push(parser.parse_stmt(ctx)?);
        }
        Ok(body)
    }

    pub fn parse(&mut self) -> Result<Program, Error> {
        let mut body = Vec::new();
        while !self.is_eof() {
            if matches!(self.at(), Token::Semicolon) {
                self.eat();
                continue;
            }
            body.push(self.parse_stmt(Ctx::default())?);
        }
        Ok(Program { body })
    }

    fn at(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek(&self, offset: usize) -> &Token {
        &self.tokens[(self.current + offset).min(self.tokens.len() - 1)]
    }

    fn eat(&mut self) -> Token {
        let token = self.at().clone();
        if self.current < self.tokens.len() {
            self.current += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token, message: &str) -> Result<Token, Error> {
        if std::mem::discriminant(self.at()) == std::mem::discriminant(expected) {
            return Ok(self.eat());
        }
        Err(Error::invalid_syntax(format!(
            "{}, se encontro '{}'",
            message,
            self.at()
        )))
    }

    fn is_eof(&self) -> bool {
        matches!(self.at(), Token::Eof)
    }

    fn parse_stmt(&mut self, ctx: Ctx) -> Result<Stmt, Error> {
        match self.at() {
            Token::Def | Token::Const => self.parse_var_decl(ctx),
            Token::Funcion if matches!(self.peek(1), Token::Ident(_)) => {
                let decl = self.parse_function(ctx)?;
                Ok(Stmt::Function(decl))
            }
            Token::Si => self.parse_if(ctx),
            Token::Mientras => self.parse_while(ctx),
            Token::Clase => self.parse_class(ctx),
            Token::Retorna => {
                if !ctx.in_function {
                    return Err(Error::invalid_syntax(
                        "No se puede usar 'retorna' fuera de una funcion",
                    ));
                }
                self.eat();
                let value = if matches!(self.at(), Token::Semicolon | Token::RBrace) {
                    None
                } else {
                    Some(self.parse_expr(ctx)?)
                };
                if matches!(self.at(), Token::Semicolon) {
                    self.eat();
                }
                Ok(Stmt::Return(value))
            }
            Token::Romper => {
                if !ctx.in_loop {
                    return Err(Error::invalid_syntax(
                        "No se puede usar 'romper' fuera de un bucle",
                    ));
                }
                self.eat();
                if matches!(self.at(), Token::Semicolon) {
                    self.eat();
                }
                Ok(Stmt::Break)
            }
            Token::Continuar => {
                if !ctx.in_loop {
                    return Err(Error::invalid_syntax(
                        "No se puede usar 'continuar' fuera de un bucle",
                    ));
                }
                self.eat();
                if matches!(self.at(), Token::Semicolon) {
                    self.eat();
                }
                Ok(Stmt::Continue)
            }
            Token::Entonces => Err(Error::invalid_syntax(
                "La palabra 'entonces' no puede iniciar una sentencia",
            )),
            Token::Estatico => Err(Error::invalid_syntax(
                "La palabra 'estatico' solo puede usarse dentro de una clase",
            )),
            _ => {
                let expr = self.parse_expr(ctx)?;
                if matches!(self.at(), Token::Semicolon) {
                    self.eat();
                }
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_var_decl(&mut self, ctx: Ctx) -> Result<Stmt, Error> {
        let constant = matches!(self.eat(), Token::Const);
        let name = self.expect_identifier("Se esperaba el nombre de la variable")?;
        if matches!(self.at(), Token::Semicolon) {
            self.eat();
            if constant {
                return Err(Error::invalid_syntax(format!(
                    "La constante '{}' debe tener un valor",
                    name
                )));
            }
            return Ok(Stmt::VarDeclaration {
                name,
                constant,
                value: None,
            });
        }
        self.expect(
            &Token::Equals,
            "Se esperaba '=' despues del nombre de la variable",
        )?;
        let value = self.parse_expr(ctx)?;
        self.expect(&Token::Semicolon, "Una declaracion debe terminar con ';'")?;
        Ok(Stmt::VarDeclaration {
            name,
            constant,
            value: Some(value),
        })
    }

    fn parse_function(&mut self, ctx: Ctx) -> Result<FunctionDecl, Error> {
        self.eat();
        let name = self.expect_identifier("Se esperaba el nombre de la funcion")?;
        let params = self.parse_params()?;
        let body = self.parse_block(ctx.function())?;
        Ok(FunctionDecl { name, params, body })
    }

    fn parse_if(&mut self, ctx: Ctx) -> Result<Stmt, Error> {
        self.eat();
        self.expect(&Token::LParen, "Se esperaba '(' despues de 'si'")?;
        let condition = self.parse_expr(ctx)?;
        self.expect(&Token::RParen, "Se esperaba ')' despues de la condicion")?;
        let body = self.parse_block(ctx)?;
        let else_branch = if matches!(self.at(), Token::Entonces) {
            self.eat();
            if matches!(self.at(), Token::Si) {
                Some(vec![self.parse_if(ctx)?])
            } else {
                Some(self.parse_block(ctx)?)
            }
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            body,
            else_branch,
        })
    }

    fn parse_while(&mut self, ctx: Ctx) -> Result<Stmt, Error> {
        self.eat();
        self.expect(&Token::LParen, "Se esperaba '(' despues de 'mientras'")?;
        let condition = self.parse_expr(ctx)?;
        self.expect(&Token::RParen, "Se esperaba ')' despues de la condicion")?;
        let body = self.parse_block(ctx.loop_body())?;
        Ok(Stmt::While { condition, body })
    }

    fn parse_class(&mut self, ctx: Ctx) -> Result<Stmt, Error> {
        self.eat();
        let name = self.expect_identifier("Se esperaba el nombre de la clase")?;
        self.expect(&Token::LBrace, "Se esperaba '{' despues del nombre de la clase")?;
        let mut members = Vec::new();
        while !matches!(self.at(), Token::RBrace | Token::Eof) {
            if matches!(self.at(), Token::Semicolon) {
                self.eat();
                continue;
            }
            let is_static = if matches!(self.at(), Token::Estatico) {
                self.eat();
                true
            } else {
                false
            };
            let member_name = self.expect_identifier("Se esperaba el nombre de un miembro")?;
            let value = if matches!(self.at(), Token::LParen) {
                // Method: sugar for a function-valued property.
                let params = self.parse_params()?;
                let body = self.parse_block(ctx.function())?;
                Expr::Function(Box::new(FunctionDecl {
                    name: member_name.clone(),
                    params,
                    body,
                }))
            } else {
                self.expect(
                    &Token::Equals,
                    "Se esperaba '=' o '(' despues del nombre del miembro",
                )?;
                let value = self.parse_expr(ctx)?;
                self.expect(&Token::Semicolon, "Un miembro debe terminar con ';'")?;
                value
            };
            members.push(ClassMember {
                name: member_name,
                is_static,
                value,
            });
        }
        self.expect(&Token::RBrace, "Se esperaba '}' para cerrar la clase")?;
        Ok(Stmt::Class { name, members })
    }

    fn parse_params(&mut self) -> Result<Vec<String>, Error> {
        self.expect(&Token::LParen, "Se esperaba '(' para los parametros")?;
        let mut params = Vec::new();
        while !matches!(self.at(), Token::RParen | Token::Eof) {
            params.push(self.expect_identifier("Se esperaba el nombre de un parametro")?);
            if matches!(self.at(), Token::Comma) {
                self.eat();
            }
        }
        self.expect(&Token::RParen, "Se esperaba ')' despues de los parametros")?;
        Ok(params)
    }

    fn parse_block(&mut self, ctx: Ctx) -> Result<Vec<Stmt>, Error> {
        self.expect(&Token::LBrace, "Se esperaba '{'")?;
        let mut body = Vec::new();
        while !matches!(self.at(), Token::RBrace | Token::Eof) {
            if matches!(self.at(), Token::Semicolon) {
                self.eat();
                continue;
            }
            body.push(self.parse_stmt(ctx)?);
        }
        self.expect(&Token::RBrace, "Se esperaba '}' para cerrar el bloque")?;
        Ok(body)
    }

    fn parse_expr(&mut self, ctx: Ctx) -> Result<Expr, Error> {
        self.parse_assignment(ctx)
    }

    /// Assignment also builds the compound comparison/logical operators:
    /// every consecutive run of `=`, `!`, `&` and `|` tokens after the left
    /// operand merges into one operator string. A lone `=` is assignment;
    /// anything longer (`==`, `!=`, `&&`, `||`, `===`, `!==`, ...) is a
    /// right-associative binary expression.
    fn parse_assignment(&mut self, ctx: Ctx) -> Result<Expr, Error> {
        let left = self.parse_object_expr(ctx)?;
        let mut operator = String::new();
        loop {
            match self.at() {
                Token::Equals => operator.push('='),
                Token::Bang => operator.push('!'),
                Token::Amp => operator.push('&'),
                Token::Pipe => operator.push('|'),
                _ => break,
            }
            self.eat();
        }
        if operator.is_empty() {
            return Ok(left);
        }
        if operator == "=" {
            let value = self.parse_assignment(ctx)?;
            return Ok(Expr::Assignment {
                assignee: Box::new(left),
                value: Box::new(value),
            });
        }
        let right = self.parse_assignment(ctx)?;
        Ok(Expr::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    fn parse_object_expr(&mut self, ctx: Ctx) -> Result<Expr, Error> {
        match self.at() {
            Token::LBrace => self.parse_object_literal(ctx),
            Token::LBracket => self.parse_array_literal(ctx),
            _ => self.parse_additive(ctx),
        }
    }

    fn parse_object_literal(&mut self, ctx: Ctx) -> Result<Expr, Error> {
        self.eat();
        let mut entries = Vec::new();
        while !matches!(self.at(), Token::RBrace | Token::Eof) {
            let key = self.expect_identifier("Se esperaba la clave de una propiedad")?;
            // Shorthand: `{ clave }` takes the value from the environment.
            if matches!(self.at(), Token::Comma) {
                self.eat();
                entries.push(PropertyEntry { key, value: None });
                continue;
            }
            if matches!(self.at(), Token::RBrace) {
                entries.push(PropertyEntry { key, value: None });
                continue;
            }
            self.expect(&Token::Colon, "Se esperaba ':' despues de la clave")?;
            let value = self.parse_expr(ctx)?;
            entries.push(PropertyEntry {
                key,
                value: Some(value),
            });
            if !matches!(self.at(), Token::RBrace) {
                self.expect(&Token::Comma, "Se esperaba ',' o '}' en el objeto")?;
            }
        }
        self.expect(&Token::RBrace, "Se esperaba '}' para cerrar el objeto")?;
        Ok(Expr::Object(entries))
    }

    /// Array keys are synthesized as successive integer strings.
    fn parse_array_literal(&mut self, ctx: Ctx) -> Result<Expr, Error> {
        self.eat();
        let mut entries = Vec::new();
        let mut index = 0usize;
        while !matches!(self.at(), Token::RBracket | Token::Eof) {
            let value = self.parse_expr(ctx)?;
            entries.push(PropertyEntry {
                key: index.to_string(),
                value: Some(value),
            });
            index += 1;
            if matches!(self.at(), Token::Comma) {
                self.eat();
            } else {
                break;
            }
        }
        self.expect(&Token::RBracket, "Se esperaba ']' para cerrar la lista")?;
        Ok(Expr::Array(entries))
    }

    fn parse_additive(&mut self, ctx: Ctx) -> Result<Expr, Error> {
        let mut left = self.parse_multiplicative(ctx)?;
        loop {
            let operator = match self.at() {
                Token::Plus => "+",
                Token::Minus => "-",
                _ => break,
            };
            self.eat();
            let right = self.parse_multiplicative(ctx)?;
            left = Expr::Binary {
                left: Box::new(left),
                operator: operator.to_string(),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self, ctx: Ctx) -> Result<Expr, Error> {
        let mut left = self.parse_power(ctx)?;
        loop {
            let operator = match self.at() {
                Token::Star => "*",
                Token::Slash => "/",
                Token::Percent => "%",
                _ => break,
            };
            self.eat();
            let right = self.parse_power(ctx)?;
            left = Expr::Binary {
                left: Box::new(left),
                operator: operator.to_string(),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_power(&mut self, ctx: Ctx) -> Result<Expr, Error> {
        let mut left = self.parse_call_member(ctx)?;
        while matches!(self.at(), Token::Caret) {
            self.eat();
            let right = self.parse_call_member(ctx)?;
            left = Expr::Binary {
                left: Box::new(left),
                operator: "^".to_string(),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_call_member(&mut self, ctx: Ctx) -> Result<Expr, Error> {
        let mut expr = self.parse_primary(ctx)?;
        loop {
            match self.at() {
                Token::Dot => {
                    self.eat();
                    let name = self.expect_identifier("Se esperaba un nombre despues de '.'")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: Box::new(Expr::PropertyIdentifier(name)),
                        computed: false,
                    };
                }
                Token::LBracket => {
                    self.eat();
                    let property = self.parse_expr(ctx)?;
                    self.expect(&Token::RBracket, "Se esperaba ']' despues del indice")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: Box::new(property),
                        computed: true,
                    };
                }
                Token::LParen => {
                    let args = self.parse_args(ctx)?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self, ctx: Ctx) -> Result<Vec<Expr>, Error> {
        self.expect(&Token::LParen, "Se esperaba '(' para los argumentos")?;
        let mut args = Vec::new();
        while !matches!(self.at(), Token::RParen | Token::Eof) {
            args.push(self.parse_expr(ctx)?);
            if matches!(self.at(), Token::Comma) {
                self.eat();
            } else {
                break;
            }
        }
        self.expect(&Token::RParen, "Se esperaba ')' despues de los argumentos")?;
        Ok(args)
    }

    fn parse_primary(&mut self, ctx: Ctx) -> Result<Expr, Error> {
        match self.at().clone() {
            Token::Ident(name) => {
                self.eat();
                Ok(Expr::Identifier(name))
            }
            Token::Number(value) => {
                self.eat();
                Ok(Expr::NumericLiteral(value))
            }
            Token::Str(text) => {
                self.eat();
                Ok(Expr::StringLiteral(text))
            }
            Token::LParen => {
                self.eat();
                let inner = self.parse_expr(ctx)?;
                self.expect(&Token::RParen, "Se esperaba ')' para cerrar la expresion")?;
                Ok(inner)
            }
            Token::LAngle => {
                self.eat();
                let inner = self.parse_expr(ctx)?;
                self.expect(&Token::RAngle, "Se esperaba '>' para cerrar el iterable")?;
                Ok(Expr::Iterable(Box::new(inner)))
            }
            Token::Funcion => self.parse_function_expr(ctx),
            // Unary sign folds to a binary expression with zero on the left.
            Token::Minus => {
                self.eat();
                let operand = self.parse_call_member(ctx)?;
                Ok(Expr::Binary {
                    left: Box::new(Expr::NumericLiteral(0.0)),
                    operator: "-".to_string(),
                    right: Box::new(operand),
                })
            }
            Token::Plus => {
                self.eat();
                let operand = self.parse_call_member(ctx)?;
                Ok(Expr::Binary {
                    left: Box::new(Expr::NumericLiteral(0.0)),
                    operator: "+".to_string(),
                    right: Box::new(operand),
                })
            }
            other => Err(Error::invalid_syntax(format!(
                "El token '{}' no se esperaba en una expresion",
                other
            ))),
        }
    }

    fn parse_function_expr(&mut self, ctx: Ctx) -> Result<Expr, Error> {
        self.eat();
        let name = match self.at() {
            Token::Ident(_) => self.expect_identifier("Se esperaba el nombre de la funcion")?,
            _ => String::new(),
        };
        let params = self.parse_params()?;
        let body = self.parse_block(ctx.function())?;
        Ok(Expr::Function(Box::new(FunctionDecl {
            name,
            params,
            body,
        })))
    }

    fn expect_identifier(&mut self, message: &str) -> Result<String, Error> {
        match self.at().clone() {
            Token::Ident(name) => {
                self.eat();
                Ok(name)
            }
            other => Err(Error::invalid_syntax(format!(
                "{}, se encontro '{}'",
                message, other
            ))),
        }
    }
}
