//! Tokenizer for the expression language.

use crate::eval::EvalError;

/// A lexical token. Newlines are significant only to the script parser,
/// which uses them as statement separators; the expression parser skips
/// them.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64),
    Str(String),
    True,
    False,
    Null,

    // Identifiers
    Ident(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,     // =
    EqEq,   // ==
    BangEq, // !=
    Lt,
    LtEq,
    Gt,
    GtEq,
    AmpAmp,   // &&
    PipePipe, // ||
    Bang,     // !
    Question, // ?
    Colon,    // :
    Comma,
    Dot,

    // Grouping
    LParen,
    RParen,
    LBracket,
    RBracket,

    // Statement separator
    Newline,
}

/// Tokenize expression or script source. `#` starts a comment running to
/// end of line (the newline itself is kept).
pub fn tokenize(source: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((_, ch)) = chars.next() {
        match ch {
            ' ' | '\t' | '\r' => {}
            '\n' => tokens.push(Token::Newline),
            '#' => {
                // Comment: skip to end of line, keep the newline.
                while let Some((_, c)) = chars.peek() {
                    if *c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' => tokens.push(Token::Star),
            '/' => tokens.push(Token::Slash),
            '%' => tokens.push(Token::Percent),
            '?' => tokens.push(Token::Question),
            ':' => tokens.push(Token::Colon),
            ',' => tokens.push(Token::Comma),
            '.' => tokens.push(Token::Dot),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '[' => tokens.push(Token::LBracket),
            ']' => tokens.push(Token::RBracket),
            '=' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    tokens.push(Token::EqEq);
                } else {
                    tokens.push(Token::Eq);
                }
            }
            '!' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    tokens.push(Token::BangEq);
                } else {
                    tokens.push(Token::Bang);
                }
            }
            '<' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    tokens.push(Token::LtEq);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    tokens.push(Token::GtEq);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '&' => {
                if matches!(chars.peek(), Some((_, '&'))) {
                    chars.next();
                    tokens.push(Token::AmpAmp);
                } else {
                    return Err(EvalError::Syntax("expected '&&'".to_string()));
                }
            }
            '|' => {
                if matches!(chars.peek(), Some((_, '|'))) {
                    chars.next();
                    tokens.push(Token::PipePipe);
                } else {
                    return Err(EvalError::Syntax("expected '||'".to_string()));
                }
            }
            '\'' | '"' => tokens.push(lex_string(&mut chars, ch)?),
            c if c.is_ascii_digit() => {
                let mut text = String::new();
                text.push(c);
                let mut seen_dot = false;
                while let Some((_, next)) = chars.peek() {
                    if next.is_ascii_digit() {
                        text.push(*next);
                        chars.next();
                    } else if *next == '.' && !seen_dot {
                        // Lookahead: `1.foo` is member access, `1.5` is a number.
                        let mut ahead = chars.clone();
                        ahead.next();
                        if matches!(ahead.peek(), Some((_, d)) if d.is_ascii_digit()) {
                            seen_dot = true;
                            text.push('.');
                            chars.next();
                        } else {
                            break;
                        }
                    } else {
                        break;
                    }
                }
                let number = text
                    .parse::<f64>()
                    .map_err(|_| EvalError::Syntax(format!("invalid number '{}'", text)))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                name.push(c);
                while let Some((_, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || *next == '_' {
                        name.push(*next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match name.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    _ => Token::Ident(name),
                });
            }
            other => {
                return Err(EvalError::Syntax(format!(
                    "unexpected character '{}'",
                    other
                )));
            }
        }
    }

    Ok(tokens)
}

fn lex_string(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    quote: char,
) -> Result<Token, EvalError> {
    let mut text = String::new();
    loop {
        match chars.next() {
            Some((_, c)) if c == quote => return Ok(Token::Str(text)),
            Some((_, '\\')) => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, '\\')) => text.push('\\'),
                Some((_, '\'')) => text.push('\''),
                Some((_, '"')) => text.push('"'),
                Some((_, other)) => {
                    return Err(EvalError::Syntax(format!(
                        "unknown escape '\\{}' in string",
                        other
                    )));
                }
                None => return Err(EvalError::Syntax("unterminated string".to_string())),
            },
            Some((_, c)) => text.push(c),
            None => return Err(EvalError::Syntax("unterminated string".to_string())),
        }
    }
}
