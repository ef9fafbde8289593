use thiserror::Error;

/// Errors raised while turning regex source text into a token stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("'{{' opened without a matching '}}'")]
    MissingMacroBrace,
    #[error("macro '{name}' is not defined")]
    UnknownMacro { name: String },
}

/// Errors raised while parsing a token stream into an NFA.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("'(' is never closed before the end of the pattern")]
    MissingCloseParen,
    #[error("'{0}' has no preceding atom to repeat")]
    StrayClosure(char),
    #[error("']' appears without a matching '['")]
    StrayCloseBracket,
    #[error("'^' appears somewhere other than the start of the pattern")]
    MisplacedCarat,
    #[error("character range '{0}-{1}' has its endpoints reversed")]
    ReversedRange(char, char),
    #[error("'[' opened without a matching ']'")]
    UnterminatedCharacterClass,
    #[error("'{0}' has no valid meaning here")]
    UnexpectedToken(char),
}
