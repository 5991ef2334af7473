//! Object tokens
//!
//! A [`Token`] names one record inside a category. It is never zero: the
//! "no token" case is `Option::None` at every call site. Records store
//! references to other records as [`TokenRef`], the fixed-layout form where
//! zero means "no reference".

use core::num::NonZeroUsize;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Reference to one record, meaningful relative to the category it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(NonZeroUsize);

impl Token {
    /// Build a token from its raw value, `None` for the zero sentinel
    pub const fn new(raw: usize) -> Option<Self> {
        match NonZeroUsize::new(raw) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Token addressing the record at `index` of an index-addressed category
    pub const fn from_index(index: usize) -> Self {
        Self(NonZeroUsize::MIN.saturating_add(index))
    }

    /// Raw pointer-sized value
    pub const fn get(self) -> usize {
        self.0.get()
    }

    /// Array index for index-addressed categories
    pub const fn index(self) -> usize {
        self.0.get() - 1
    }
}

/// Token as stored inside a fixed-layout record (zero = no reference)
#[repr(transparent)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct TokenRef(usize);

impl TokenRef {
    /// No reference
    pub const NONE: Self = Self(0);

    /// The referenced token, if any
    pub const fn token(self) -> Option<Token> {
        Token::new(self.0)
    }

    /// Whether this slot references a record
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }
}

impl From<Token> for TokenRef {
    fn from(token: Token) -> Self {
        Self(token.get())
    }
}

impl From<Option<Token>> for TokenRef {
    fn from(token: Option<Token>) -> Self {
        token.map_or(Self::NONE, Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_not_a_token() {
        assert_eq!(Token::new(0), None);
        assert_eq!(Token::new(7).map(Token::get), Some(7));
    }

    #[test]
    fn test_index_tokens() {
        let token = Token::from_index(1);
        assert_eq!(token.get(), 2);
        assert_eq!(token.index(), 1);
        assert_eq!(Token::from_index(0).index(), 0);
    }

    #[test]
    fn test_token_ref() {
        assert_eq!(TokenRef::NONE.token(), None);
        assert!(!TokenRef::default().is_some());

        let token = Token::from_index(4);
        let slot = TokenRef::from(token);
        assert!(slot.is_some());
        assert_eq!(slot.token(), Some(token));
        assert_eq!(TokenRef::from(None), TokenRef::NONE);
    }
}
