//! Tokenizer for debugger expressions.
//!
//! Lexical rules are tried in table order at every position and the first
//! rule that matches a non-empty prefix wins. Two-character operators come
//! before single-character ones and hex literals before decimal ones.

use tracing::debug;

use crate::expr::ExprError;

/// Maximum number of tokens in one expression.
pub const MAX_TOKENS: usize = 32;
/// Maximum length of one token's text.
pub const MAX_TOKEN_LEN: usize = 31;

/// Token kinds produced by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Decimal literal.
    Number,
    /// `0x`-prefixed hexadecimal literal.
    HexNumber,
    /// `$`-prefixed register reference.
    Register,
    /// Bare identifier, resolved as a symbol.
    Identifier,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*` used as multiplication.
    Star,
    /// `/`
    Slash,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `&&`
    LogicalAnd,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `*` used as unary dereference.
    Deref,
}

impl TokenKind {
    /// Returns `true` for tokens that end an operand, after which `*` means
    /// multiplication.
    #[must_use]
    pub const fn ends_operand(self) -> bool {
        matches!(self, Self::Number | Self::HexNumber | Self::RightParen)
    }
}

/// One lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// Matched source text (at most [`MAX_TOKEN_LEN`] bytes).
    pub text: String,
}

#[derive(Debug, Clone, Copy)]
enum Matcher {
    Whitespace,
    Literal(&'static str),
    Hex,
    Decimal,
    Register,
    Identifier,
}

impl Matcher {
    /// Length of the match at the start of `input`, if any.
    fn match_len(self, input: &str) -> Option<usize> {
        let bytes = input.as_bytes();
        let len = match self {
            Self::Whitespace => count_while(bytes, 0, |b| b == b' ' || b == b'\t'),
            Self::Literal(text) => {
                if input.starts_with(text) {
                    text.len()
                } else {
                    0
                }
            }
            Self::Hex => {
                if bytes.len() > 2 && bytes[0] == b'0' && (bytes[1] == b'x' || bytes[1] == b'X')
                {
                    let digits = count_while(bytes, 2, |b| b.is_ascii_hexdigit());
                    if digits == 0 {
                        0
                    } else {
                        2 + digits
                    }
                } else {
                    0
                }
            }
            Self::Decimal => count_while(bytes, 0, |b| b.is_ascii_digit()),
            Self::Register => {
                if bytes.first() == Some(&b'$') {
                    let name = count_while(bytes, 1, is_register_char);
                    if name == 0 {
                        0
                    } else {
                        1 + name
                    }
                } else {
                    0
                }
            }
            Self::Identifier => {
                if bytes.first().is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_') {
                    1 + count_while(bytes, 1, |b| b.is_ascii_alphanumeric() || b == b'_')
                } else {
                    0
                }
            }
        };
        (len > 0).then_some(len)
    }
}

const fn is_register_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

fn count_while(bytes: &[u8], start: usize, pred: impl Fn(u8) -> bool) -> usize {
    bytes
        .get(start..)
        .map_or(0, |rest| rest.iter().take_while(|b| pred(**b)).count())
}

struct Rule {
    pattern: &'static str,
    matcher: Matcher,
    /// `None` discards the match.
    kind: Option<TokenKind>,
}

const RULES: &[Rule] = &[
    Rule {
        pattern: " +",
        matcher: Matcher::Whitespace,
        kind: None,
    },
    Rule {
        pattern: "==",
        matcher: Matcher::Literal("=="),
        kind: Some(TokenKind::Equal),
    },
    Rule {
        pattern: "!=",
        matcher: Matcher::Literal("!="),
        kind: Some(TokenKind::NotEqual),
    },
    Rule {
        pattern: "&&",
        matcher: Matcher::Literal("&&"),
        kind: Some(TokenKind::LogicalAnd),
    },
    Rule {
        pattern: "\\+",
        matcher: Matcher::Literal("+"),
        kind: Some(TokenKind::Plus),
    },
    Rule {
        pattern: "-",
        matcher: Matcher::Literal("-"),
        kind: Some(TokenKind::Minus),
    },
    Rule {
        pattern: "\\*",
        matcher: Matcher::Literal("*"),
        kind: Some(TokenKind::Star),
    },
    Rule {
        pattern: "/",
        matcher: Matcher::Literal("/"),
        kind: Some(TokenKind::Slash),
    },
    Rule {
        pattern: "\\(",
        matcher: Matcher::Literal("("),
        kind: Some(TokenKind::LeftParen),
    },
    Rule {
        pattern: "\\)",
        matcher: Matcher::Literal(")"),
        kind: Some(TokenKind::RightParen),
    },
    Rule {
        pattern: "0[xX][0-9a-fA-F]+",
        matcher: Matcher::Hex,
        kind: Some(TokenKind::HexNumber),
    },
    Rule {
        pattern: "[0-9]+",
        matcher: Matcher::Decimal,
        kind: Some(TokenKind::Number),
    },
    Rule {
        pattern: "\\$[a-zA-Z0-9_$]+",
        matcher: Matcher::Register,
        kind: Some(TokenKind::Register),
    },
    Rule {
        pattern: "[a-zA-Z_][a-zA-Z0-9_]*",
        matcher: Matcher::Identifier,
        kind: Some(TokenKind::Identifier),
    },
];

/// Splits `input` into tokens and reclassifies dereference stars.
///
/// # Errors
///
/// Returns [`ExprError::NoMatch`] when no rule matches at some position,
/// [`ExprError::TokenTooLong`] for tokens over [`MAX_TOKEN_LEN`] bytes and
/// [`ExprError::TooManyTokens`] past [`MAX_TOKENS`].
pub fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut position = 0;

    while position < input.len() {
        let rest = &input[position..];
        let Some((index, rule, len)) = RULES
            .iter()
            .enumerate()
            .find_map(|(index, rule)| rule.matcher.match_len(rest).map(|len| (index, rule, len)))
        else {
            return Err(ExprError::NoMatch {
                position,
                input: input.to_owned(),
            });
        };

        let text = &rest[..len];
        debug!(
            "match rules[{index}] = \"{}\" at position {position} with len {len}: {text}",
            rule.pattern
        );

        if let Some(kind) = rule.kind {
            if len > MAX_TOKEN_LEN {
                return Err(ExprError::TokenTooLong { position, len });
            }
            if tokens.len() == MAX_TOKENS {
                return Err(ExprError::TooManyTokens { limit: MAX_TOKENS });
            }
            tokens.push(Token {
                kind,
                text: text.to_owned(),
            });
        }
        position += len;
    }

    mark_dereferences(&mut tokens);
    Ok(tokens)
}

fn mark_dereferences(tokens: &mut [Token]) {
    for i in 0..tokens.len() {
        if tokens[i].kind != TokenKind::Star {
            continue;
        }
        let unary = i == 0 || !tokens[i - 1].kind.ends_operand();
        if unary {
            tokens[i].kind = TokenKind::Deref;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{tokenize, TokenKind, MAX_TOKENS};
    use crate::expr::ExprError;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .expect("tokenizes")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn two_char_operators_win_over_single_chars() {
        assert_eq!(
            kinds("1==1&&2!=3"),
            vec![
                TokenKind::Number,
                TokenKind::Equal,
                TokenKind::Number,
                TokenKind::LogicalAnd,
                TokenKind::Number,
                TokenKind::NotEqual,
                TokenKind::Number,
            ]
        );
    }

    #[test]
    fn hex_is_tried_before_decimal() {
        let tokens = tokenize("0x1F + 10").expect("tokenizes");
        assert_eq!(tokens[0].kind, TokenKind::HexNumber);
        assert_eq!(tokens[0].text, "0x1F");
        assert_eq!(tokens[2].kind, TokenKind::Number);
    }

    #[test]
    fn registers_and_identifiers_are_distinct() {
        let tokens = tokenize("$a0 + main").expect("tokenizes");
        assert_eq!(tokens[0].kind, TokenKind::Register);
        assert_eq!(tokens[0].text, "$a0");
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
    }

    #[test]
    fn star_after_operand_is_multiplication() {
        assert_eq!(
            kinds("*0x100 * 2"),
            vec![
                TokenKind::Deref,
                TokenKind::HexNumber,
                TokenKind::Star,
                TokenKind::Number
            ]
        );
        assert_eq!(
            kinds("(1) * *2"),
            vec![
                TokenKind::LeftParen,
                TokenKind::Number,
                TokenKind::RightParen,
                TokenKind::Star,
                TokenKind::Deref,
                TokenKind::Number,
            ]
        );
    }

    #[test]
    fn star_after_register_is_dereference() {
        assert_eq!(
            kinds("$a0 *4")[1],
            TokenKind::Deref,
            "only number, hex number and close paren end an operand"
        );
    }

    #[test]
    fn unknown_character_reports_position() {
        let err = tokenize("1 + #").expect_err("no rule matches '#'");
        assert_eq!(
            err,
            ExprError::NoMatch {
                position: 4,
                input: "1 + #".to_owned()
            }
        );
        assert_eq!(err.to_string(), "no match at position 4\n1 + #\n    ^");
    }

    #[test]
    fn token_buffer_is_bounded() {
        let full = "1+".repeat(MAX_TOKENS / 2);
        assert_eq!(tokenize(&full).map(|tokens| tokens.len()), Ok(MAX_TOKENS));

        let over = format!("{full}1");
        assert_eq!(
            tokenize(&over),
            Err(ExprError::TooManyTokens { limit: MAX_TOKENS })
        );
    }

    #[test]
    fn long_tokens_are_rejected() {
        let long = "9".repeat(40);
        assert_eq!(
            tokenize(&long),
            Err(ExprError::TokenTooLong {
                position: 0,
                len: 40
            })
        );
    }
}
