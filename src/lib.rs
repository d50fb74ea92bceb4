//! Compiles dice notation such as `2d6 + 3 + d20` into an [`Expression`] and
//! evaluates it against a caller-supplied [`DieRoller`].
//!
//! Stages run strictly in order: text, tokens ([`lexer`]), tree ([`parser`]),
//! lowered expression ([`lower`]), number ([`eval`]).
//!
//! Two behaviours differ from everyday dice notation:
//! - operator chains nest to the right, so `10 - 3 - 2` is `10 - (3 - 2)`;
//! - the dice of one term are multiplied, so `2d6` is `d6 * d6`.
//!
//! ```
//! let total = dicec::roll("2d6 + 3", &mut rand::thread_rng()).unwrap();
//! assert!((4..=39).contains(&total));
//!
//! let expression = dicec::compile("10 - 3 - 2").unwrap();
//! assert_eq!(expression.to_string(), "10-(3-2);");
//! ```

pub mod error;
pub mod eval;
pub mod lexer;
pub mod lower;
pub mod parser;

pub use error::Error;
pub use eval::{evaluate, DieRoller};
pub use lower::{Expr, Expression, Limits};

pub fn compile(source: &str) -> Result<Expression, Error> {
    compile_with(source, &Limits::default())
}

pub fn compile_with(source: &str, limits: &Limits) -> Result<Expression, Error> {
    let tokens = lexer::tokenize(source)?;
    let program = parser::parse(tokens)?;
    Ok(lower::lower_with(program, limits)?)
}

/// Compile and evaluate in one go.
pub fn roll<R: DieRoller + ?Sized>(source: &str, roller: &mut R) -> Result<i64, Error> {
    roll_with(source, &Limits::default(), roller)
}

pub fn roll_with<R: DieRoller + ?Sized>(
    source: &str,
    limits: &Limits,
    roller: &mut R,
) -> Result<i64, Error> {
    let expression = compile_with(source, limits)?;
    Ok(evaluate(&expression, roller)?)
}
