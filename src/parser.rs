//! Recursive-descent grammar over the token stream, building an NFA via
//! Thompson's construction as it goes (component C2).
//!
//! ```text
//! regex         := [ '^' ] expression [ '$' ] <trailing-action>
//! expression    := concatenation ( '|' concatenation )*
//! concatenation := factor+ | ε
//! factor        := term ( '*' | '+' | '?' )?
//! term          := '(' expression ')'
//!                | '.'
//!                | '[' [ '^' ] charclass ']'
//!                | LITERAL
//! ```

use crate::error::ParseError;
use crate::lexer::{Lexer, MacroTable, Token};
use crate::nfa::{Anchor, CharClass, Edge, Nfa, NfaNode};

/// Entry and exit node indices of a partially-built NFA fragment. The exit
/// node is always freshly allocated with `Edge::Empty` and unconfigured --
/// every combinator below fills it in (or, at the top, turns it into the
/// accepting node).
#[derive(Debug, Clone, Copy)]
struct Fragment {
    start: usize,
    end: usize,
}

/// Compiles a single `source` pattern into its own NFA, expanding
/// `{macro}` references against `macros` as they're encountered.
pub fn compile(source: &str, macros: &MacroTable) -> Result<Nfa, ParseError> {
    let mut nfa = Nfa::new();
    let mut parser = Parser {
        lexer: Lexer::new(source, macros)?,
        nfa: &mut nfa,
    };
    let start = parser.parse_rule()?;
    nfa.set_start(start);
    Ok(nfa)
}

/// Compiles a declaration-ordered sequence of patterns into one shared NFA,
/// as a lexer generator's rule section would. Every pattern keeps its own
/// `accept_string`; rules are allocated in order, so the smallest-NFA-index
/// tie-break in subset construction (`Nfa::to_dfa`) resolves overlaps in
/// favor of whichever rule was declared first.
pub fn compile_rules(sources: &[&str], macros: &MacroTable) -> Result<Nfa, ParseError> {
    let mut nfa = Nfa::new();
    let mut starts = Vec::with_capacity(sources.len());
    for source in sources {
        let mut parser = Parser {
            lexer: Lexer::new(source, macros)?,
            nfa: &mut nfa,
        };
        starts.push(parser.parse_rule()?);
    }

    let combined_start = match starts.len() {
        0 => nfa.alloc(), // an empty ruleset matches nothing
        1 => starts[0],
        _ => {
            let mut rest = starts.into_iter().rev();
            let mut acc = rest.next().unwrap();
            for start in rest {
                let branch = nfa.alloc();
                let node = nfa.node_mut(branch);
                node.edge = Edge::Epsilon;
                node.next[0] = Some(start);
                node.next[1] = Some(acc);
                acc = branch;
            }
            acc
        }
    };
    nfa.set_start(combined_start);
    Ok(nfa)
}

struct Parser<'a, 'n> {
    lexer: Lexer<'a>,
    nfa: &'n mut Nfa,
}

impl<'a, 'n> Parser<'a, 'n> {
    /// `regex := [ '^' ] expression [ '$' ] <trailing-action>`. Returns the
    /// entry node of the built fragment; the caller decides what becomes of
    /// the arena's overall start (a lone pattern's own start, or one branch
    /// of a combined ruleset).
    fn parse_rule(&mut self) -> Result<usize, ParseError> {
        let mut anchor = Anchor::NONE;

        if self.lexer.current() == Token::Carat {
            self.lexer.advance()?;
            anchor |= Anchor::LINE_START;
        }

        let mut frag = self.expression()?;

        if self.lexer.current() == Token::Dollar {
            self.lexer.advance()?;
            anchor |= Anchor::LINE_END;
            frag = self.append_dollar(frag);
        }

        if anchor.contains(Anchor::LINE_START) {
            frag = self.prepend_start_sentinel(frag);
        }

        let trailing = self.lexer.remaining().trim_start().to_string();
        {
            let end = self.nfa.node_mut(frag.end);
            end.accept_string = Some(trailing);
            end.anchor |= anchor;
        }

        log::debug!("built rule fragment, nfa now has {} nodes", self.nfa.len());
        Ok(frag.start)
    }

    fn expression(&mut self) -> Result<Fragment, ParseError> {
        let mut frag = self.concatenation()?;
        while self.lexer.current() == Token::Pipe {
            self.lexer.advance()?;
            let rhs = self.concatenation()?;
            frag = self.alternate(frag, rhs);
        }
        Ok(frag)
    }

    fn concatenation(&mut self) -> Result<Fragment, ParseError> {
        match self.try_factor()? {
            None => Ok(self.epsilon_fragment()),
            Some(mut frag) => {
                while let Some(next) = self.try_factor()? {
                    frag = self.splice(frag, next);
                }
                Ok(frag)
            }
        }
    }

    /// `None` when the current token can't start a factor and legitimately
    /// ends the concatenation (`|`, `)`, `$`, end of input); an error for
    /// tokens that have no grammar production at all.
    fn try_factor(&mut self) -> Result<Option<Fragment>, ParseError> {
        match self.lexer.current() {
            Token::Pipe | Token::RightParen | Token::Dollar | Token::Eos => Ok(None),
            _ => Ok(Some(self.factor()?)),
        }
    }

    fn factor(&mut self) -> Result<Fragment, ParseError> {
        let atom = self.term()?;
        match self.lexer.current() {
            Token::Star => {
                self.lexer.advance()?;
                Ok(self.closure(atom, true, true))
            }
            Token::Plus => {
                self.lexer.advance()?;
                Ok(self.closure(atom, false, true))
            }
            Token::Question => {
                self.lexer.advance()?;
                Ok(self.closure(atom, true, false))
            }
            _ => Ok(atom),
        }
    }

    fn term(&mut self) -> Result<Fragment, ParseError> {
        match self.lexer.current() {
            Token::LeftParen => {
                self.lexer.advance()?;
                let inner = self.expression()?;
                if self.lexer.current() != Token::RightParen {
                    return Err(ParseError::MissingCloseParen);
                }
                self.lexer.advance()?;
                Ok(inner)
            }
            Token::Dot => {
                self.lexer.advance()?;
                let mut class = CharClass::empty();
                class.set(b'\n');
                class.set(b'\r');
                Ok(self.class_fragment(class, true))
            }
            Token::LeftBracket => {
                self.lexer.advance()?;
                self.character_class()
            }
            Token::Literal { byte, .. } => {
                self.lexer.advance()?;
                Ok(self.literal_fragment(byte))
            }
            Token::Star => Err(ParseError::StrayClosure('*')),
            Token::Plus => Err(ParseError::StrayClosure('+')),
            Token::Question => Err(ParseError::StrayClosure('?')),
            Token::RightBracket => Err(ParseError::StrayCloseBracket),
            Token::Carat => Err(ParseError::MisplacedCarat),
            other => Err(ParseError::UnexpectedToken(
                token_byte(other).unwrap_or('\0' as u8) as char,
            )),
        }
    }

    /// `'[' [ '^' ] charclass ']'`; caller has already consumed `'['`.
    fn character_class(&mut self) -> Result<Fragment, ParseError> {
        let mut inverted = false;
        let mut class = CharClass::empty();

        if self.lexer.current() == Token::Carat {
            inverted = true;
            class.set(b'\n');
            class.set(b'\r');
            self.lexer.advance()?;
        }

        let mut prev_byte: Option<u8> = None;
        let mut had_any = false;
        loop {
            match self.lexer.current() {
                Token::RightBracket => {
                    self.lexer.advance()?;
                    break;
                }
                Token::Eos => return Err(ParseError::UnterminatedCharacterClass),
                Token::Dash if prev_byte.is_some() => {
                    self.lexer.advance()?;
                    let next_tok = self.lexer.current();
                    match token_byte(next_tok).filter(|_| next_tok != Token::RightBracket) {
                        Some(hi) => {
                            let lo = prev_byte.unwrap();
                            if hi < lo {
                                return Err(ParseError::ReversedRange(lo as char, hi as char));
                            }
                            class.set_range(lo, hi);
                            had_any = true;
                            self.lexer.advance()?;
                            prev_byte = None;
                        }
                        None => {
                            class.set(b'-');
                            had_any = true;
                            prev_byte = Some(b'-');
                        }
                    }
                }
                tok => {
                    let byte = token_byte(tok).ok_or(ParseError::UnterminatedCharacterClass)?;
                    class.set(byte);
                    had_any = true;
                    prev_byte = Some(byte);
                    self.lexer.advance()?;
                }
            }
        }

        if !had_any {
            // The source's convention for an empty class body: every byte up
            // to and including space.
            class = CharClass::empty();
            class.set_range(0, b' ');
        }

        Ok(self.class_fragment(class, inverted))
    }

    // --- Thompson fragment builders -------------------------------------

    fn literal_fragment(&mut self, byte: u8) -> Fragment {
        let s = self.nfa.alloc();
        let e = self.nfa.alloc();
        let node = self.nfa.node_mut(s);
        node.edge = Edge::Literal(byte);
        node.next[0] = Some(e);
        Fragment { start: s, end: e }
    }

    fn class_fragment(&mut self, class: CharClass, inverted: bool) -> Fragment {
        let s = self.nfa.alloc();
        let e = self.nfa.alloc();
        let node = self.nfa.node_mut(s);
        node.edge = Edge::CharacterClass;
        node.char_class = class;
        node.inverted = inverted;
        node.next[0] = Some(e);
        Fragment { start: s, end: e }
    }

    fn epsilon_fragment(&mut self) -> Fragment {
        let s = self.nfa.alloc();
        let e = self.nfa.alloc();
        let node = self.nfa.node_mut(s);
        node.edge = Edge::Epsilon;
        node.next[0] = Some(e);
        Fragment { start: s, end: e }
    }

    /// Joins `a` then `b` by overwriting `a`'s exit node in place with `b`'s
    /// entry node's contents, then discarding `b`'s entry slot. This is why
    /// the arena needs a free list: the splice never allocates a wiring
    /// node, it just relocates one fragment's identity onto another's exit.
    fn splice(&mut self, a: Fragment, b: Fragment) -> Fragment {
        let replacement = NfaNode {
            index: a.end,
            ..self.nfa.node(b.start).clone()
        };
        *self.nfa.node_mut(a.end) = replacement;
        self.nfa.discard(b.start);
        Fragment {
            start: a.start,
            end: b.end,
        }
    }

    fn alternate(&mut self, a: Fragment, b: Fragment) -> Fragment {
        let p = self.nfa.alloc();
        let q = self.nfa.alloc();
        {
            let branch = self.nfa.node_mut(p);
            branch.edge = Edge::Epsilon;
            branch.next[0] = Some(a.start);
            branch.next[1] = Some(b.start);
        }
        let a_end = self.nfa.node_mut(a.end);
        a_end.edge = Edge::Epsilon;
        a_end.next[0] = Some(q);
        let b_end = self.nfa.node_mut(b.end);
        b_end.edge = Edge::Epsilon;
        b_end.next[0] = Some(q);
        Fragment { start: p, end: q }
    }

    fn closure(&mut self, a: Fragment, skip: bool, repeat: bool) -> Fragment {
        let s = self.nfa.alloc();
        let e = self.nfa.alloc();
        {
            let start = self.nfa.node_mut(s);
            start.edge = Edge::Epsilon;
            start.next[0] = Some(a.start);
            if skip {
                start.next[1] = Some(e);
            }
        }
        {
            let end = self.nfa.node_mut(a.end);
            end.edge = Edge::Epsilon;
            end.next[0] = Some(e);
            if repeat {
                end.next[1] = Some(a.start);
            }
        }
        Fragment { start: s, end: e }
    }

    fn append_dollar(&mut self, frag: Fragment) -> Fragment {
        let mut class = CharClass::empty();
        class.set(b'\n');
        class.set(b'\r');
        let dollar = self.class_fragment(class, false);
        self.splice(frag, dollar)
    }

    fn prepend_start_sentinel(&mut self, frag: Fragment) -> Fragment {
        let p = self.nfa.alloc();
        let node = self.nfa.node_mut(p);
        node.edge = Edge::Epsilon;
        node.next[0] = Some(frag.start);
        Fragment {
            start: p,
            end: frag.end,
        }
    }
}

/// The byte a token stands for when read as part of a character-class body,
/// where metacharacters other than `]`, a leading `^`, and infix `-` lose
/// their usual meaning and are just bytes.
fn token_byte(tok: Token) -> Option<u8> {
    match tok {
        Token::Literal { byte, .. } => Some(byte),
        Token::LeftBrace => Some(b'{'),
        Token::RightBrace => Some(b'}'),
        Token::LeftBracket => Some(b'['),
        Token::RightBracket => Some(b']'),
        Token::LeftParen => Some(b'('),
        Token::RightParen => Some(b')'),
        Token::Pipe => Some(b'|'),
        Token::Dot => Some(b'.'),
        Token::Dollar => Some(b'$'),
        Token::Carat => Some(b'^'),
        Token::Star => Some(b'*'),
        Token::Plus => Some(b'+'),
        Token::Question => Some(b'?'),
        Token::Dash => Some(b'-'),
        Token::Eos => None,
    }
}
