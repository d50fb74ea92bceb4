use std::mem;

use log::debug;

use crate::error::ParseError;
use crate::lexer::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpsType {
    Add,
    Sub,
}

/// Each node owns its children; there is no sharing between subtrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ast {
    Number(u64),
    /// Roll `count` dice with `sides` sides each.
    Dice { count: Box<Ast>, sides: Box<Ast> },
    Ops { op: OpsType, lhs: Box<Ast>, rhs: Box<Ast> },
}

impl Ast {
    pub fn dice(count: Ast, sides: Ast) -> Ast {
        Ast::Dice { count: Box::new(count), sides: Box::new(sides) }
    }

    pub fn ops(op: OpsType, lhs: Ast, rhs: Ast) -> Ast {
        Ast::Ops { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    /// Move a child out, leaving a leaf behind in its slot.
    pub(crate) fn take(slot: &mut Box<Ast>) -> Ast {
        mem::replace(&mut **slot, Ast::Number(0))
    }

    fn detach(&mut self, stack: &mut Vec<Ast>) {
        match self {
            Ast::Number(_) => {},
            Ast::Dice { count: lhs, sides: rhs } | Ast::Ops { lhs, rhs, .. } => {
                stack.push(Ast::take(lhs));
                stack.push(Ast::take(rhs));
            },
        }
    }
}

// Operator chains nest once per term, so children are torn down from a heap
// stack rather than by the recursive drop glue
impl Drop for Ast {
    fn drop(&mut self) {
        let mut stack = vec![];
        self.detach(&mut stack);
        while let Some(mut node) = stack.pop() {
            node.detach(&mut stack);
        }
    }
}

/// One compiled expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub body: Ast,
}

fn number(text: &str) -> Result<Ast, ParseError> {
    text.parse::<u64>()
        .map(Ast::Number)
        .map_err(|_| ParseError::NumberTooLarge { text: text.to_string() })
}

// `NdM` or `dM`, split on the separator; a missing count means one die
fn dice(index: usize, text: &str) -> Result<Ast, ParseError> {
    let (count, sides) = text
        .split_once(|c: char| c == 'd' || c == 'D')
        .ok_or_else(|| ParseError::UnexpectedToken { index, text: text.to_string() })?;
    let count = if count.is_empty() { "1" } else { count };

    Ok(Ast::dice(number(count)?, number(sides)?))
}

fn atom(index: usize, token: &Token<'_>) -> Result<Ast, ParseError> {
    match token.kind {
        TokenKind::Number   => number(token.text),
        TokenKind::Dice     => dice(index, token.text),
        TokenKind::Operator => Err(unexpected(index, token)),
    }
}

fn ops_type(index: usize, token: &Token<'_>) -> Result<OpsType, ParseError> {
    match (token.kind, token.text) {
        (TokenKind::Operator, "+") => Ok(OpsType::Add),
        (TokenKind::Operator, "-") => Ok(OpsType::Sub),
        _ => Err(unexpected(index, token)),
    }
}

fn unexpected(index: usize, token: &Token<'_>) -> ParseError {
    ParseError::UnexpectedToken { index, text: token.text.to_string() }
}

/// Parse `atom (operator atom)*` into a right-nested tree.
///
/// `a - b - c` becomes `a - (b - c)`: each operator takes everything after it
/// as its right-hand side. The pairs are gathered in one pass and folded from
/// the right, so long chains need no recursion.
pub fn parse<'a, I>(tokens: I) -> Result<Program, ParseError>
where
    I: IntoIterator<Item = Token<'a>>,
{
    let mut tokens = tokens.into_iter().enumerate();
    let mut pending: Vec<(Ast, OpsType)> = vec![];

    let last = loop {
        let (index, token) = tokens.next().ok_or(ParseError::UnexpectedEnd)?;
        let lhs = atom(index, &token)?;

        match tokens.next() {
            None => break lhs,
            Some((index, token)) => pending.push((lhs, ops_type(index, &token)?)),
        }
    };

    debug!("parsed {} operators", pending.len());

    let body = pending
        .into_iter()
        .rev()
        .fold(last, |rhs, (lhs, op)| Ast::ops(op, lhs, rhs));

    Ok(Program { body })
}
