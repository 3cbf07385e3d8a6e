//! Debugger expression language.
//!
//! Expressions combine decimal and hex literals, `$`-prefixed registers,
//! symbol names, `+ - * /`, `== != &&`, parentheses and unary `*`
//! dereference over 32-bit unsigned values.

/// Recursive evaluator over a token range.
pub mod eval;
/// Ordered-rule tokenizer.
pub mod lexer;

pub use eval::{evaluate, evaluate_tokens, ExprContext};
pub use lexer::{tokenize, Token, TokenKind, MAX_TOKENS, MAX_TOKEN_LEN};

use thiserror::Error;

use crate::memory::MemoryError;

/// Failure to tokenize or evaluate an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    /// No lexical rule matches at `position`.
    #[error("no match at position {position}\n{input}\n{}^", " ".repeat(*.position))]
    NoMatch {
        /// Byte offset of the first unmatched character.
        position: usize,
        /// Whole input line.
        input: String,
    },
    /// A token is longer than [`MAX_TOKEN_LEN`].
    #[error("token of {len} bytes at position {position} exceeds {max} bytes", max = MAX_TOKEN_LEN)]
    TokenTooLong {
        /// Byte offset of the token.
        position: usize,
        /// Token length.
        len: usize,
    },
    /// The expression has more than [`MAX_TOKENS`] tokens.
    #[error("expression has more than {limit} tokens")]
    TooManyTokens {
        /// Token buffer capacity.
        limit: usize,
    },
    /// A numeric literal does not fit in 32 bits.
    #[error("invalid literal `{text}`")]
    InvalidLiteral {
        /// Literal text.
        text: String,
    },
    /// A `$` reference names no register.
    #[error("unknown register `{name}`")]
    UnknownRegister {
        /// Register name without the sigil.
        name: String,
    },
    /// An identifier names no symbol.
    #[error("unknown symbol `{name}`")]
    UnknownSymbol {
        /// Identifier text.
        name: String,
    },
    /// Division by zero.
    #[error("division by zero")]
    DivideByZero,
    /// Dereference of an unmapped address.
    #[error("cannot read memory at {addr:#010x}: {source}")]
    Memory {
        /// Dereferenced address.
        addr: u32,
        /// Underlying access failure.
        source: MemoryError,
    },
    /// The token sequence has no valid structure.
    #[error("malformed expression: {reason}")]
    Malformed {
        /// What the evaluator expected.
        reason: &'static str,
    },
}

impl ExprError {
    /// Returns `true` for structural failures that end the debugging session.
    ///
    /// Lexical problems, unresolved names, bad literals, division by zero and
    /// unmapped dereferences are reported and the command is skipped.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}
