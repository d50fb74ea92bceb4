use log::{debug, trace};
use rand::Rng;

use crate::error::EvalError;
use crate::lower::{Expr, Expression};

/// Source of die results, passed in by whoever evaluates an expression.
pub trait DieRoller {
    /// A value in `[1, sides]`. `sides` is never zero.
    fn roll(&mut self, sides: u64) -> u64;
}

impl<R: Rng + ?Sized> DieRoller for R {
    fn roll(&mut self, sides: u64) -> u64 {
        self.gen_range(1..=sides)
    }
}

type Checked = fn(i64, i64) -> Option<i64>;

// Work left over while descending into the left operand
enum Pending<'a> {
    Rhs(Checked, &'a Expr),
    Apply(Checked, i64),
}

/// Evaluate with checked `i64` arithmetic, left operand first.
pub fn evaluate<R: DieRoller + ?Sized>(
    expression: &Expression,
    roller: &mut R,
) -> Result<i64, EvalError> {
    let mut stack = vec![];
    let mut expr = &expression.root;
    let mut draws = 0;

    loop {
        let mut value = loop {
            match expr {
                Expr::Literal(n) => break number(*n)?,
                Expr::RandomDraw(0) => return Err(EvalError::EmptyDie),
                Expr::RandomDraw(sides) => {
                    let value = roller.roll(*sides);
                    trace!("rolled {} on d{}", value, sides);
                    draws += 1;
                    break number(value)?;
                },
                Expr::Add(lhs, rhs) => {
                    stack.push(Pending::Rhs(i64::checked_add, rhs));
                    expr = lhs;
                },
                Expr::Sub(lhs, rhs) => {
                    stack.push(Pending::Rhs(i64::checked_sub, rhs));
                    expr = lhs;
                },
                Expr::Mul(lhs, rhs) => {
                    stack.push(Pending::Rhs(i64::checked_mul, rhs));
                    expr = lhs;
                },
            }
        };

        loop {
            match stack.pop() {
                None => {
                    debug!("evaluated {} draws", draws);
                    return Ok(value);
                },
                Some(Pending::Rhs(op, rhs)) => {
                    stack.push(Pending::Apply(op, value));
                    expr = rhs;
                    break;
                },
                Some(Pending::Apply(op, lhs)) => {
                    value = op(lhs, value).ok_or(EvalError::Overflow)?;
                },
            }
        }
    }
}

fn number(n: u64) -> Result<i64, EvalError> {
    i64::try_from(n).map_err(|_| EvalError::Overflow)
}


#[cfg(test)]
mod test_eval {
    use super::*;
    use crate::lexer::tokenize;
    use crate::lower::lower;
    use crate::parser::parse;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::VecDeque;

    // Hands out fixed results and records the die sizes asked for
    struct Scripted {
        results: VecDeque<u64>,
        asked: Vec<u64>,
    }

    impl Scripted {
        fn new(results: &[u64]) -> Scripted {
            Scripted { results: results.iter().copied().collect(), asked: vec![] }
        }
    }

    impl DieRoller for Scripted {
        fn roll(&mut self, sides: u64) -> u64 {
            self.asked.push(sides);
            self.results.pop_front().unwrap()
        }
    }

    fn compile(input: &str) -> Expression {
        lower(parse(tokenize(input).unwrap()).unwrap()).unwrap()
    }

    #[test]
    fn test_number() {
        let data = evaluate(&compile("10"), &mut Scripted::new(&[]));
        assert_eq!(data, Ok(10));
    }

    #[test]
    fn test_right_nested_subtraction() {
        let data = evaluate(&compile("10 - 3 - 2"), &mut Scripted::new(&[]));
        assert_eq!(data, Ok(9));
    }

    #[test]
    fn test_negative_result() {
        let data = evaluate(&compile("1 - 5"), &mut Scripted::new(&[]));
        assert_eq!(data, Ok(-4));
    }

    #[test]
    fn test_dice_multiply() {
        let mut roller = Scripted::new(&[3, 5]);
        let data = evaluate(&compile("2d6"), &mut roller);
        assert_eq!(data, Ok(15));
        assert_eq!(roller.asked, vec![6, 6]);
    }

    #[test]
    fn test_draw_order() {
        let mut roller = Scripted::new(&[2, 4, 17]);
        let data = evaluate(&compile("2d6 + 3 + d20"), &mut roller);
        assert_eq!(data, Ok(2 * 4 + 3 + 17));
        assert_eq!(roller.asked, vec![6, 6, 20]);
    }

    #[test]
    fn test_fresh_draw_each_time() {
        let expression = compile("d6 - d6");
        let mut roller = Scripted::new(&[6, 1, 2, 2]);
        assert_eq!(evaluate(&expression, &mut roller), Ok(5));
        assert_eq!(evaluate(&expression, &mut roller), Ok(0));
        assert_eq!(roller.asked.len(), 4);
    }

    #[test]
    fn test_seeded_rolls_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let expression = compile("d6");
        for _ in 0..1000 {
            let v = evaluate(&expression, &mut rng).unwrap();
            assert!((1..=6).contains(&v));
        }
    }

    #[test]
    fn test_same_seed_same_result() {
        let expression = compile("5d10 + d4 - 3");
        let a = evaluate(&expression, &mut ChaCha8Rng::seed_from_u64(42));
        let b = evaluate(&expression, &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_overflow() {
        let data = evaluate(&compile("9223372036854775807 + 1"), &mut Scripted::new(&[]));
        assert_eq!(data, Err(EvalError::Overflow));

        let data = evaluate(&compile("9223372036854775808"), &mut Scripted::new(&[]));
        assert_eq!(data, Err(EvalError::Overflow));

        let data = evaluate(&compile("40d6"), &mut Scripted::new(&[6; 40]));
        assert_eq!(data, Err(EvalError::Overflow));
    }

    #[test]
    fn test_long_chain() {
        let expression = compile(&vec!["1"; 50_001].join(" - "));
        assert_eq!(evaluate(&expression, &mut Scripted::new(&[])), Ok(1));

        let expression = compile(&vec!["2d6"; 10_000].join(" + "));
        let mut roller = Scripted::new(&[2; 20_000]);
        assert_eq!(evaluate(&expression, &mut roller), Ok(40_000));
        assert_eq!(roller.asked.len(), 20_000);
    }

    #[test]
    fn test_empty_die() {
        let expression = Expression { root: Expr::RandomDraw(0) };
        let data = evaluate(&expression, &mut Scripted::new(&[]));
        assert_eq!(data, Err(EvalError::EmptyDie));
    }
}
