//! `lexforge` compiles regular-expression source text into a deterministic
//! finite automaton: a recursive-descent parser builds an NFA via Thompson's
//! construction, and subset construction turns that NFA into a DFA with a
//! dense per-state transition table.
//!
//! ## Usage
//!
//! ```rust
//! use lexforge::lexer::MacroTable;
//! use lexforge::parser::compile_rules;
//!
//! let macros = MacroTable::new();
//! let nfa = compile_rules(&["[a-zA-Z_][a-zA-Z0-9_]*  { IDENT }", "[0-9]+  { NUMBER }"], &macros)
//!     .unwrap();
//! let dfa = nfa.to_dfa();
//!
//! let mut state = dfa.start();
//! for byte in b"foo42" {
//!     state = dfa.follow(state, *byte).expect("no transition");
//! }
//! assert_eq!(dfa.state(state).accept_string.as_deref(), Some("{ IDENT }"));
//! ```
//!
//! A single pattern can be compiled on its own with [`parser::compile`] when
//! there's no ruleset to combine.

pub mod dfa;
pub mod error;
pub mod lexer;
pub mod nfa;
pub mod parser;
