use chumsky::error::RichReason;
use chumsky::prelude::*;

use crate::error::Error;
use crate::token::Token;

/// Escapes of the form `\xHH`, `\uHHHH`, `\UHHHHHHHH`.
fn hex_escape<'a>(digits: usize) -> impl Parser<'a, &'a str, char, extra::Err<Rich<'a, char>>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_hexdigit())
        .repeated()
        .exactly(digits)
        .collect::<String>()
        .try_map(|code, span| {
            u32::from_str_radix(&code, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| Rich::custom(span, "Secuencia de escape invalida"))
        })
}

pub fn lexer<'a>() -> impl Parser<'a, &'a str, Vec<Token>, extra::Err<Rich<'a, char>>> {
    // A numeric literal greedily takes every following digit or dot, so a
    // second decimal point is reported here instead of splitting the token.
    let number = text::digits(10)
        .then(one_of(".0123456789").repeated())
        .to_slice()
        .try_map(|s: &str, span| {
            if s.matches('.').count() > 1 {
                return Err(Rich::custom(
                    span,
                    "Un numero no puede tener mas de dos puntos decimales",
                ));
            }
            Ok(Token::Number(s.parse().unwrap_or(f64::NAN)))
        });

    let escape = just('\\').ignore_then(choice((
        just('n').to('\n'),
        just('t').to('\t'),
        just('r').to('\r'),
        just('b').to('\u{0008}'),
        just('f').to('\u{000C}'),
        just('v').to('\u{000B}'),
        just('0').to('\0'),
        just('x').ignore_then(hex_escape(2)),
        just('u').ignore_then(hex_escape(4)),
        just('U').ignore_then(hex_escape(8)),
        // Any other escaped character stands for itself, including \\ \" \'
        any(),
    )));

    let double_quoted = just('"')
        .ignore_then(none_of("\\\"").or(escape.clone()).repeated().collect::<String>())
        .then_ignore(just('"'));

    let single_quoted = just('\'')
        .ignore_then(none_of("\\'").or(escape).repeated().collect::<String>())
        .then_ignore(just('\''));

    let string = double_quoted.or(single_quoted).map(Token::Str);

    // Identifier characters are ASCII letters, digits, `_` and `$`; a leading
    // digit never reaches this parser because numbers are tried first.
    let ident = any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_' || *c == '$')
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
                .repeated(),
        )
        .to_slice()
        .map(|s: &str| match s {
            "def" => Token::Def,
            "const" => Token::Const,
            "funcion" => Token::Funcion,
            "si" => Token::Si,
            "entonces" => Token::Entonces,
            "retorna" => Token::Retorna,
            "mientras" => Token::Mientras,
            "romper" => Token::Romper,
            "continuar" => Token::Continuar,
            "clase" => Token::Clase,
            "estatico" => Token::Estatico,
            _ => Token::Ident(s.to_string()),
        });

    let op = choice((
        just('=').to(Token::Equals),
        just('!').to(Token::Bang),
        just('&').to(Token::Amp),
        just('|').to(Token::Pipe),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
        just('%').to(Token::Percent),
        just('^').to(Token::Caret),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just('{').to(Token::LBrace),
        just('}').to(Token::RBrace),
        just('[').to(Token::LBracket),
        just(']').to(Token::RBracket),
        just('<').to(Token::LAngle),
        just('>').to(Token::RAngle),
        just(';').to(Token::Semicolon),
        just(',').to(Token::Comma),
        just('.').to(Token::Dot),
        just(':').to(Token::Colon),
    ));

    let token = number.or(string).or(ident).or(op).padded();

    token.repeated().collect().then_ignore(end())
}

/// Runs the lexer over a whole source text. The returned stream always ends
/// with exactly one [`Token::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = lexer()
        .parse(source)
        .into_result()
        .map_err(first_lex_error)?;
    tokens.push(Token::Eof);
    Ok(tokens)
}

fn first_lex_error(errors: Vec<Rich<'_, char>>) -> Error {
    let message = match errors.first() {
        Some(err) => match err.reason() {
            RichReason::Custom(msg) => msg.clone(),
            _ => match err.found() {
                Some(c) => format!("El caracter {:?} no se reconoce", c),
                None => "El codigo fuente termina de forma inesperada".to_string(),
            },
        },
        None => "El codigo fuente no se pudo analizar".to_string(),
    };
    Error::invalid_syntax(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        lexer().parse(source).output().expect("Lexer failed").clone()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(lex("def"), vec![Token::Def]);
        assert_eq!(lex("const"), vec![Token::Const]);
        assert_eq!(lex("funcion"), vec![Token::Funcion]);
        assert_eq!(lex("si"), vec![Token::Si]);
        assert_eq!(lex("entonces"), vec![Token::Entonces]);
        assert_eq!(lex("mientras"), vec![Token::Mientras]);
        assert_eq!(lex("estatico"), vec![Token::Estatico]);
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(lex("foo"), vec![Token::Ident("foo".to_string())]);
        assert_eq!(lex("bar123"), vec![Token::Ident("bar123".to_string())]);
        assert_eq!(lex("_test"), vec![Token::Ident("_test".to_string())]);
        assert_eq!(lex("$precio"), vec![Token::Ident("$precio".to_string())]);
        assert_eq!(
            lex("definicion"),
            vec![Token::Ident("definicion".to_string())]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex("42"), vec![Token::Number(42.0)]);
        assert_eq!(lex("0"), vec![Token::Number(0.0)]);
        assert_eq!(lex("3.14"), vec![Token::Number(3.14)]);
        assert_eq!(lex("007"), vec![Token::Number(7.0)]);
    }

    #[test]
    fn test_number_with_two_dots_is_rejected() {
        assert!(lexer().parse("1.2.3").has_errors());
        assert!(lexer().parse("1..2").has_errors());
        assert!(tokenize("def x = 1.2.3;").is_err());
    }

    #[test]
    fn test_strings_both_quote_styles() {
        assert_eq!(lex(r#""hola""#), vec![Token::Str("hola".to_string())]);
        assert_eq!(lex("'hola'"), vec![Token::Str("hola".to_string())]);
        assert_eq!(lex(r#""""#), vec![Token::Str(String::new())]);
        assert_eq!(
            lex(r#""dijo 'hola'""#),
            vec![Token::Str("dijo 'hola'".to_string())]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(lex(r#""a\nb""#), vec![Token::Str("a\nb".to_string())]);
        assert_eq!(lex(r#""a\tb""#), vec![Token::Str("a\tb".to_string())]);
        assert_eq!(lex(r#""a\\b""#), vec![Token::Str("a\\b".to_string())]);
        assert_eq!(lex(r#""a\"b""#), vec![Token::Str("a\"b".to_string())]);
        assert_eq!(lex(r#"'a\'b'"#), vec![Token::Str("a'b".to_string())]);
        assert_eq!(lex(r#""a\0b""#), vec![Token::Str("a\0b".to_string())]);
        assert_eq!(lex(r#""\x41""#), vec![Token::Str("A".to_string())]);
        assert_eq!(lex(r#""ñ""#), vec![Token::Str("ñ".to_string())]);
        assert_eq!(lex(r#""\U0001F600""#), vec![Token::Str("😀".to_string())]);
        // Unknown escapes keep the character itself
        assert_eq!(lex(r#""\q""#), vec![Token::Str("q".to_string())]);
    }

    #[test]
    fn test_single_char_operators() {
        assert_eq!(lex("="), vec![Token::Equals]);
        assert_eq!(lex("!"), vec![Token::Bang]);
        assert_eq!(lex("&"), vec![Token::Amp]);
        assert_eq!(lex("|"), vec![Token::Pipe]);
        // Compound operators stay as single-character runs for the parser
        assert_eq!(lex("=="), vec![Token::Equals, Token::Equals]);
        assert_eq!(lex("!="), vec![Token::Bang, Token::Equals]);
        assert_eq!(lex("&&"), vec![Token::Amp, Token::Amp]);
        assert_eq!(lex("||"), vec![Token::Pipe, Token::Pipe]);
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(lex("("), vec![Token::LParen]);
        assert_eq!(lex("]"), vec![Token::RBracket]);
        assert_eq!(lex("<"), vec![Token::LAngle]);
        assert_eq!(lex(";"), vec![Token::Semicolon]);
        assert_eq!(lex(":"), vec![Token::Colon]);
    }

    #[test]
    fn test_whitespace_handling() {
        assert_eq!(
            lex("def   x"),
            vec![Token::Def, Token::Ident("x".to_string())]
        );
        assert_eq!(
            lex("  def\n\tx  \r\n"),
            vec![Token::Def, Token::Ident("x".to_string())]
        );
    }

    #[test]
    fn test_declaration_statement() {
        assert_eq!(
            lex("def x = 5;"),
            vec![
                Token::Def,
                Token::Ident("x".to_string()),
                Token::Equals,
                Token::Number(5.0),
                Token::Semicolon
            ]
        );
    }

    #[test]
    fn test_unknown_character_is_reported() {
        let err = tokenize("def x = 5 # 2;").unwrap_err();
        assert!(err.to_string().contains('#'));
    }

    #[test]
    fn test_tokenize_appends_single_eof() {
        let tokens = tokenize("1 + 2").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Number(1.0),
                Token::Plus,
                Token::Number(2.0),
                Token::Eof
            ]
        );
        assert_eq!(tokens.iter().filter(|t| **t == Token::Eof).count(), 1);
        assert_eq!(tokenize("").unwrap(), vec![Token::Eof]);
    }
}
