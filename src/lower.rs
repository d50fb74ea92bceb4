use std::fmt;
use std::mem;

use log::debug;

use crate::error::LowerError;
use crate::parser::{Ast, OpsType, Program};

/// Lowered form handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(u64),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    /// Uniform draw from `[1, n]`, made afresh every time it is evaluated.
    RandomDraw(u64),
}

impl Expr {
    /// Number of `RandomDraw` nodes in the tree.
    pub fn draws(&self) -> usize {
        let mut stack = vec![self];
        let mut draws = 0;

        while let Some(expr) = stack.pop() {
            match expr {
                Expr::Literal(_) => {},
                Expr::RandomDraw(_) => draws += 1,
                Expr::Add(lhs, rhs) | Expr::Sub(lhs, rhs) | Expr::Mul(lhs, rhs) => {
                    stack.push(rhs);
                    stack.push(lhs);
                },
            }
        }
        draws
    }

    fn is_additive(&self) -> bool {
        matches!(self, Expr::Add(..) | Expr::Sub(..))
    }

    fn detach(&mut self, stack: &mut Vec<Expr>) {
        match self {
            Expr::Literal(_) | Expr::RandomDraw(_) => {},
            Expr::Add(lhs, rhs) | Expr::Sub(lhs, rhs) | Expr::Mul(lhs, rhs) => {
                stack.push(mem::replace(&mut **lhs, Expr::Literal(0)));
                stack.push(mem::replace(&mut **rhs, Expr::Literal(0)));
            },
        }
    }
}

// Same teardown as `Ast`: a long chain must not recurse once per term
impl Drop for Expr {
    fn drop(&mut self) {
        let mut stack = vec![];
        self.detach(&mut stack);
        while let Some(mut expr) = stack.pop() {
            expr.detach(&mut stack);
        }
    }
}

enum Piece<'a> {
    Expr(&'a Expr),
    Grouped(&'a Expr),
    Text(&'static str),
}

fn piece(expr: &Expr, grouped: bool) -> Piece<'_> {
    if grouped { Piece::Grouped(expr) } else { Piece::Expr(expr) }
}

// `+` and `-` operands are bracketed when nested on the right or under `*`
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![Piece::Expr(self)];

        while let Some(next) = stack.pop() {
            let expr = match next {
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                },
                Piece::Grouped(expr) => {
                    f.write_str("(")?;
                    stack.push(Piece::Text(")"));
                    expr
                },
                Piece::Expr(expr) => expr,
            };

            let (lhs, op, rhs) = match expr {
                Expr::Literal(n) => {
                    write!(f, "{}", n)?;
                    continue;
                },
                Expr::RandomDraw(n) => {
                    write!(f, "roll({})", n)?;
                    continue;
                },
                Expr::Add(lhs, rhs) => (piece(lhs, false), "+", rhs),
                Expr::Sub(lhs, rhs) => (piece(lhs, false), "-", rhs),
                Expr::Mul(lhs, rhs) => (piece(lhs, lhs.is_additive()), "*", rhs),
            };

            stack.push(piece(rhs, rhs.is_additive()));
            stack.push(Piece::Text(op));
            stack.push(lhs);
        }
        Ok(())
    }
}

/// A complete lowered program; displays as one `;`-terminated statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub root: Expr,
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};", self.root)
    }
}

/// Bounds on what a single program may expand to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Most `RandomDraw`s one dice term may produce.
    pub max_dice: u64,
}

impl Limits {
    pub const DEFAULT_MAX_DICE: u64 = 10_000;
}

impl Default for Limits {
    fn default() -> Self {
        Limits { max_dice: Limits::DEFAULT_MAX_DICE }
    }
}

pub fn lower(program: Program) -> Result<Expression, LowerError> {
    lower_with(program, &Limits::default())
}

pub fn lower_with(program: Program, limits: &Limits) -> Result<Expression, LowerError> {
    let mut lowering = Lowering { limits, draws: 0 };
    let root = lowering.walk(program.body)?;
    debug!("lowered to {} random draws", lowering.draws);
    Ok(Expression { root })
}

// Work left over while descending into the left child of a node
enum Pending {
    Lhs(OpsType, Ast),
    Rhs(OpsType, Expr),
    Count(Ast),
    Sides(u64),
}

struct Lowering<'a> {
    limits: &'a Limits,
    draws: u64,
}

impl Lowering<'_> {
    // Post-order walk on an explicit stack: descend left until a leaf, then
    // unwind, re-descending into each right child that is still pending
    fn walk(&mut self, mut node: Ast) -> Result<Expr, LowerError> {
        let mut stack = vec![];

        loop {
            let mut value = loop {
                match &mut node {
                    Ast::Number(n) => break Expr::Literal(*n),
                    Ast::Ops { op, lhs, rhs } => {
                        stack.push(Pending::Lhs(*op, Ast::take(rhs)));
                        node = Ast::take(lhs);
                    },
                    Ast::Dice { count, sides } => {
                        stack.push(Pending::Count(Ast::take(sides)));
                        node = Ast::take(count);
                    },
                }
            };

            loop {
                match stack.pop() {
                    None => return Ok(value),
                    Some(Pending::Lhs(op, rhs)) => {
                        stack.push(Pending::Rhs(op, value));
                        node = rhs;
                        break;
                    },
                    Some(Pending::Rhs(op, lhs)) => {
                        let (lhs, rhs) = (Box::new(lhs), Box::new(value));
                        value = match op {
                            OpsType::Add => Expr::Add(lhs, rhs),
                            OpsType::Sub => Expr::Sub(lhs, rhs),
                        };
                    },
                    Some(Pending::Count(sides)) => {
                        let count = constant(&value).ok_or(LowerError::NonConstantCount)?;
                        stack.push(Pending::Sides(count));
                        node = sides;
                        break;
                    },
                    Some(Pending::Sides(count)) => {
                        let sides = constant(&value).ok_or(LowerError::NonConstantSides)?;
                        value = self.dice(count, sides)?;
                    },
                }
            }
        }
    }

    fn dice(&mut self, count: u64, sides: u64) -> Result<Expr, LowerError> {
        if count == 0 {
            return Err(LowerError::ZeroDiceCount);
        }
        if sides == 0 {
            return Err(LowerError::ZeroSidedDie);
        }
        if count > self.limits.max_dice {
            return Err(LowerError::TooManyDice { count, limit: self.limits.max_dice });
        }

        self.draws += count;
        Ok(product(count, sides))
    }
}

fn constant(expr: &Expr) -> Option<u64> {
    match expr {
        Expr::Literal(n) => Some(*n),
        _ => None,
    }
}

// The dice of one term are multiplied together, not summed. The product is
// split in halves so the tree depth grows with log2(count).
fn product(count: u64, sides: u64) -> Expr {
    if count <= 1 {
        return Expr::RandomDraw(sides);
    }

    let half = count / 2;
    Expr::Mul(
        Box::new(product(half, sides)),
        Box::new(product(count - half, sides)),
    )
}
