pub mod parser;

pub use parser::{decode_line, encode_command};

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UciError {
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}

/// A move in coordinate notation (`e2e4`, `e7e8q`).
///
/// Only the format is validated — source square, destination square, and an
/// optional promotion piece. Whether the move is legal in a given position is
/// the engine's business, not ours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UciMove(String);

impl UciMove {
    pub fn parse(s: &str) -> Result<Self, UciError> {
        if !s.is_ascii() || s.len() < 4 || s.len() > 5 {
            return Err(UciError::InvalidMove(s.to_string()));
        }

        check_square(&s[0..2])?;
        check_square(&s[2..4])?;

        if s.len() == 5 && !matches!(&s[4..5], "q" | "r" | "b" | "n") {
            return Err(UciError::InvalidPromotion(s.to_string()));
        }

        Ok(UciMove(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn check_square(s: &str) -> Result<(), UciError> {
    let mut chars = s.chars();
    let file = chars.next();
    let rank = chars.next();
    match (file, rank) {
        (Some('a'..='h'), Some('1'..='8')) => Ok(()),
        _ => Err(UciError::InvalidSquare(s.to_string())),
    }
}

impl fmt::Display for UciMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UciMove {
    type Err = UciError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UciMove::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_move() {
        let mv = UciMove::parse("e2e4").unwrap();
        assert_eq!(mv.as_str(), "e2e4");
    }

    #[test]
    fn test_parse_promotion() {
        let mv = UciMove::parse("e7e8q").unwrap();
        assert_eq!(mv.to_string(), "e7e8q");
    }

    #[test]
    fn test_reject_bad_square() {
        assert!(UciMove::parse("i2e4").is_err());
        assert!(UciMove::parse("e9e4").is_err());
    }

    #[test]
    fn test_reject_bad_promotion() {
        assert!(UciMove::parse("e7e8k").is_err());
    }

    #[test]
    fn test_reject_wrong_length() {
        assert!(UciMove::parse("e2").is_err());
        assert!(UciMove::parse("e2e4e5").is_err());
        assert!(UciMove::parse("(none)").is_err());
    }
}
