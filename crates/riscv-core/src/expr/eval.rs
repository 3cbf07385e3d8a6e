//! Recursive evaluation over a tokenized expression.
//!
//! The evaluator works on half-open token ranges. A range that is fully
//! wrapped in a matching pair of parentheses evaluates its interior;
//! otherwise the main operator is the lowest-precedence operator outside
//! parentheses, and among operators of that level the leftmost one. Chains of
//! equal precedence therefore group to the right: `10 - 2 - 3` is
//! `10 - (2 - 3)`.

use crate::expr::lexer::{tokenize, Token, TokenKind};
use crate::expr::ExprError;
use crate::memory::MemoryError;

/// Read access to live machine state used while evaluating.
pub trait ExprContext {
    /// Value of the register named `name` (without the `$` sigil).
    fn register(&self, name: &str) -> Option<u32>;

    /// Address of the symbol named `name`.
    fn symbol(&self, name: &str) -> Option<u32>;

    /// Reads a 4-byte word at `addr`.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`MemoryError`] for unmapped addresses.
    fn read_word(&self, addr: u32) -> Result<u32, MemoryError>;
}

/// Tokenizes and evaluates `input`.
///
/// # Errors
///
/// Returns the first tokenizer or evaluation failure; see [`ExprError`].
pub fn evaluate(input: &str, ctx: &dyn ExprContext) -> Result<u32, ExprError> {
    let tokens = tokenize(input)?;
    evaluate_tokens(&tokens, ctx)
}

/// Evaluates an already tokenized expression.
///
/// # Errors
///
/// See [`ExprError`].
pub fn evaluate_tokens(tokens: &[Token], ctx: &dyn ExprContext) -> Result<u32, ExprError> {
    Evaluator { tokens, ctx }.eval(0, tokens.len())
}

const fn precedence(kind: TokenKind) -> Option<u8> {
    match kind {
        TokenKind::Equal | TokenKind::NotEqual | TokenKind::LogicalAnd => Some(3),
        TokenKind::Plus | TokenKind::Minus => Some(2),
        TokenKind::Star | TokenKind::Slash => Some(1),
        TokenKind::Deref => Some(0),
        _ => None,
    }
}

struct Evaluator<'a> {
    tokens: &'a [Token],
    ctx: &'a dyn ExprContext,
}

impl Evaluator<'_> {
    fn eval(&self, start: usize, end: usize) -> Result<u32, ExprError> {
        if start >= end {
            return Ok(0);
        }
        if end - start == 1 {
            return self.operand(&self.tokens[start]);
        }
        if self.enclosed(start, end) {
            return self.eval(start + 1, end - 1);
        }

        let op = self.main_operator(start, end)?;
        let kind = self.tokens[op].kind;
        if kind == TokenKind::Deref {
            if op != start {
                return Err(ExprError::Malformed {
                    reason: "dereference must prefix its operand",
                });
            }
            let addr = self.eval(op + 1, end)?;
            return self
                .ctx
                .read_word(addr)
                .map_err(|source| ExprError::Memory { addr, source });
        }

        let lhs = self.eval(start, op)?;
        let rhs = self.eval(op + 1, end)?;
        apply(kind, lhs, rhs)
    }

    fn operand(&self, token: &Token) -> Result<u32, ExprError> {
        match token.kind {
            TokenKind::Number => token
                .text
                .parse::<u32>()
                .map_err(|_| invalid_literal(token)),
            TokenKind::HexNumber => u32::from_str_radix(&token.text[2..], 16)
                .map_err(|_| invalid_literal(token)),
            TokenKind::Register => {
                let name = token.text.strip_prefix('$').unwrap_or(&token.text);
                self.ctx
                    .register(name)
                    .ok_or_else(|| ExprError::UnknownRegister {
                        name: name.to_owned(),
                    })
            }
            TokenKind::Identifier => {
                self.ctx
                    .symbol(&token.text)
                    .ok_or_else(|| ExprError::UnknownSymbol {
                        name: token.text.clone(),
                    })
            }
            _ => Err(ExprError::Malformed {
                reason: "operand expected",
            }),
        }
    }

    /// Returns `true` when the parenthesis at `start` pairs with the one at
    /// `end - 1`.
    fn enclosed(&self, start: usize, end: usize) -> bool {
        if self.tokens[start].kind != TokenKind::LeftParen
            || self.tokens[end - 1].kind != TokenKind::RightParen
        {
            return false;
        }
        let mut depth = 0usize;
        for (i, token) in self.tokens[start..end].iter().enumerate() {
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    let Some(next) = depth.checked_sub(1) else {
                        return false;
                    };
                    depth = next;
                }
                _ => {}
            }
            if depth == 0 && start + i != end - 1 {
                return false;
            }
        }
        depth == 0
    }

    /// Scans right to left for the operator outside parentheses with the
    /// highest level; ties go to the leftmost one.
    fn main_operator(&self, start: usize, end: usize) -> Result<usize, ExprError> {
        let mut depth = 0usize;
        let mut best: Option<(usize, u8)> = None;
        for i in (start..end).rev() {
            let kind = self.tokens[i].kind;
            match kind {
                TokenKind::RightParen => depth += 1,
                TokenKind::LeftParen => {
                    depth = depth.checked_sub(1).ok_or(ExprError::Malformed {
                        reason: "unbalanced parentheses",
                    })?;
                }
                _ if depth > 0 => {}
                _ => {
                    if let Some(level) = precedence(kind) {
                        if best.map_or(true, |(_, best_level)| level >= best_level) {
                            best = Some((i, level));
                        }
                    }
                }
            }
        }
        if depth != 0 {
            return Err(ExprError::Malformed {
                reason: "unbalanced parentheses",
            });
        }
        best.map(|(i, _)| i).ok_or(ExprError::Malformed {
            reason: "operator expected",
        })
    }
}

fn invalid_literal(token: &Token) -> ExprError {
    ExprError::InvalidLiteral {
        text: token.text.clone(),
    }
}

fn apply(kind: TokenKind, lhs: u32, rhs: u32) -> Result<u32, ExprError> {
    let value = match kind {
        TokenKind::Plus => lhs.wrapping_add(rhs),
        TokenKind::Minus => lhs.wrapping_sub(rhs),
        TokenKind::Star => lhs.wrapping_mul(rhs),
        TokenKind::Slash => lhs.checked_div(rhs).ok_or(ExprError::DivideByZero)?,
        TokenKind::Equal => u32::from(lhs == rhs),
        TokenKind::NotEqual => u32::from(lhs != rhs),
        TokenKind::LogicalAnd => u32::from(lhs != 0 && rhs != 0),
        _ => {
            return Err(ExprError::Malformed {
                reason: "binary operator expected",
            })
        }
    };
    Ok(value)
}
