use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Def,
    Const,
    Funcion,
    Si,
    Entonces,
    Retorna,
    Mientras,
    Romper,
    Continuar,
    Clase,
    Estatico,

    // Literals and identifiers
    Ident(String),
    Number(f64),
    Str(String),

    // Single-character operators. The parser merges runs of `=`, `!`, `&`
    // and `|` into the compound operators (`==`, `!=`, `&&`, `||`, `===`,
    // `!==`); the lexer never produces multi-character operator tokens.
    Equals,
    Bang,
    Amp,
    Pipe,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LAngle,
    RAngle,
    Semicolon,
    Comma,
    Dot,
    Colon,

    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Def => write!(f, "def"),
            Token::Const => write!(f, "const"),
            Token::Funcion => write!(f, "funcion"),
            Token::Si => write!(f, "si"),
            Token::Entonces => write!(f, "entonces"),
            Token::Retorna => write!(f, "retorna"),
            Token::Mientras => write!(f, "mientras"),
            Token::Romper => write!(f, "romper"),
            Token::Continuar => write!(f, "continuar"),
            Token::Clase => write!(f, "clase"),
            Token::Estatico => write!(f, "estatico"),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Number(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::Equals => write!(f, "="),
            Token::Bang => write!(f, "!"),
            Token::Amp => write!(f, "&"),
            Token::Pipe => write!(f, "|"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Caret => write!(f, "^"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LAngle => write!(f, "<"),
            Token::RAngle => write!(f, ">"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Colon => write!(f, ":"),
            Token::Eof => write!(f, "fin de archivo"),
        }
    }
}
