use thiserror::Error;

/// No token pattern matches at `position` (a byte offset into the source).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character {ch:?} at position {position}")]
    UnexpectedChar { position: usize, ch: char },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Operator in atom position, or anything but an operator after an atom.
    #[error("unexpected syntax: token {text:?} at index {index}")]
    UnexpectedToken { index: usize, text: String },
    #[error("unexpected syntax: input ended where an expression was expected")]
    UnexpectedEnd,
    #[error("number {text} is too large")]
    NumberTooLarge { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("non-constant dice count")]
    NonConstantCount,
    #[error("non-constant dice sides")]
    NonConstantSides,
    #[error("dice count must be at least 1")]
    ZeroDiceCount,
    #[error("a die must have at least 1 side")]
    ZeroSidedDie,
    #[error("{count} dice exceeds the limit of {limit}")]
    TooManyDice { count: u64, limit: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("arithmetic overflow")]
    Overflow,
    #[error("cannot draw from a die with no sides")]
    EmptyDie,
}

/// First failure of any pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Lower(#[from] LowerError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}
