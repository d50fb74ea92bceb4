use nom::{
    IResult,
    branch::alt,
    bytes::complete::{
        tag_no_case,
        take_while,
        take_while_m_n,
    },
    character::complete::one_of,
    combinator::{
        map,
        opt,
        recognize,
    },
    sequence::tuple,
};
use log::debug;

use crate::error::LexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    Dice,
    Operator,
}

/// A token borrows its matched text straight out of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, text: &'a str) -> Token<'a> {
        Token { kind, text }
    }
}

// Decimal digits with no leading zero, so a lone `0` is rejected as well
fn number(input: &str) -> IResult<&str, &str> {
    let is_nonzero = |c: char| ('1'..='9').contains(&c);
    let is_digit = |c: char| c.is_ascii_digit();

    recognize(tuple((
        take_while_m_n(1, 1, is_nonzero),
        take_while(is_digit),
    )))(input)
}

fn dice(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(number),
        tag_no_case("d"),
        number,
    )))(input)
}

fn operator(input: &str) -> IResult<&str, &str> {
    recognize(one_of("+-"))(input)
}

// Dice is tried before number so `2d6` is not read as `2` then `d6`
fn token(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        map(operator, |text| Token::new(TokenKind::Operator, text)),
        map(dice, |text| Token::new(TokenKind::Dice, text)),
        map(number, |text| Token::new(TokenKind::Number, text)),
    ))(input)
}

// Lexer
pub struct Lexer<'a> {
    source: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Lexer<'a> {
        Lexer { source, position: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.position..]
    }

    // Only the plain space counts as whitespace
    fn skip_spaces(&mut self) {
        while self.rest().starts_with(' ') {
            self.position += 1;
        }
    }

    pub fn next_token(&mut self) -> Option<Result<Token<'a>, LexError>> {
        self.skip_spaces();

        let rest = self.rest();
        let ch = rest.chars().next()?;

        match token(rest) {
            Ok((remaining, token)) => {
                self.position = self.source.len() - remaining.len();
                Some(Ok(token))
            },
            Err(_) => {
                let position = self.position;
                // Nothing more is produced after a failure
                self.position = self.source.len();
                Some(Err(LexError::UnexpectedChar { position, ch }))
            },
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, LexError>;
    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Lex the whole source, failing on the first unrecognized character.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, LexError> {
    let tokens = Lexer::new(source).collect::<Result<Vec<_>, _>>()?;
    debug!("lexed {} tokens", tokens.len());
    Ok(tokens)
}
