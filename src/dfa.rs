//! Subset construction (component C4) and the resulting dense-table DFA
//! model (component C5).

use std::collections::HashMap;

use crate::nfa::{Anchor, Edge, Nfa};

/// One DFA state: a dense 128-entry transition table (one slot per byte of
/// the fixed alphabet) plus whatever accept metadata its NFA subset carries.
///
/// `nfa_subset` is the state's identity -- subset construction deduplicates
/// states by this field, not by address, which is what makes the
/// construction terminate and produces a canonical result up to
/// renumbering.
#[derive(Debug, Clone)]
pub struct DfaState {
    transitions: [Option<usize>; 128],
    pub accept_string: Option<String>,
    pub anchor: Anchor,
    pub nfa_subset: Vec<usize>,
}

impl DfaState {
    pub fn follow(&self, byte: u8) -> Option<usize> {
        self.transitions[byte as usize]
    }

    pub fn is_accepting(&self) -> bool {
        self.accept_string.is_some()
    }
}

/// An arena of DFA states plus a start index (always 0).
#[derive(Debug, Clone)]
pub struct Dfa {
    states: Vec<DfaState>,
    start: usize,
}

impl Dfa {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn state(&self, idx: usize) -> &DfaState {
        &self.states[idx]
    }

    pub fn states(&self) -> &[DfaState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// `follow(state, byte) -> Option<state>`, the C5 model's sole external
    /// interface beyond plain iteration.
    pub fn follow(&self, state: usize, byte: u8) -> Option<usize> {
        self.states[state].follow(byte)
    }
}

impl Nfa {
    /// Subset construction: turns this NFA into an equivalent DFA.
    ///
    /// Each DFA state is the ε-closure of an NFA subset; state identity is
    /// subset equality, and byte 0..127 exhausts the alphabet, so the result
    /// is deterministic and finite regardless of construction order.
    pub fn to_dfa(&self) -> Dfa {
        let mut states: Vec<DfaState> = Vec::new();
        let mut index_of_subset: HashMap<Vec<usize>, usize> = HashMap::new();

        let (start_subset, accept_string, anchor) = epsilon_closure(self, &[self.start()]);
        let start = intern_state(&mut states, &mut index_of_subset, start_subset, accept_string, anchor);

        let mut worklist = vec![start];
        while let Some(current) = worklist.pop() {
            let subset = states[current].nfa_subset.clone();
            for c in 0u8..128 {
                let moved = move_on_byte(self, &subset, c);
                if moved.is_empty() {
                    continue;
                }
                let (closure, accept_string, anchor) = epsilon_closure(self, &moved);
                let target = match index_of_subset.get(&closure) {
                    Some(&idx) => idx,
                    None => {
                        let idx = intern_state(&mut states, &mut index_of_subset, closure, accept_string, anchor);
                        worklist.push(idx);
                        idx
                    }
                };
                states[current].transitions[c as usize] = Some(target);
            }
        }

        log::debug!("dfa built with {} states", states.len());
        Dfa { states, start }
    }
}

fn intern_state(
    states: &mut Vec<DfaState>,
    index_of_subset: &mut HashMap<Vec<usize>, usize>,
    subset: Vec<usize>,
    accept_string: Option<String>,
    anchor: Anchor,
) -> usize {
    let idx = states.len();
    index_of_subset.insert(subset.clone(), idx);
    states.push(DfaState {
        transitions: [None; 128],
        accept_string,
        anchor,
        nfa_subset: subset,
    });
    log::trace!("discovered dfa state {idx}");
    idx
}

/// For every `n` in `seed` with `edge == Literal(c)` or a matching
/// `CharacterClass`, add the node reached by consuming `c` (`n.next[0]`) to
/// the result. An empty result means no transition fires on `c`.
fn move_on_byte(nfa: &Nfa, seed: &[usize], c: u8) -> Vec<usize> {
    let mut out = Vec::new();
    for &i in seed {
        let node = nfa.node(i);
        let fires = match node.edge {
            Edge::Literal(b) => b == c,
            Edge::CharacterClass => node.class_matches(c),
            Edge::Epsilon | Edge::Empty => false,
        };
        if fires {
            out.push(node.next[0].expect("literal/class node always has a successor"));
        }
    }
    out
}

/// ε-closure of `seed`: iteratively follows every `Epsilon` node's out-edges
/// until no new indices are added. Tracks the accepting node with the
/// smallest index seen (declaration-order priority among overlapping
/// accepts) and returns its `accept_string`/`anchor` alongside the sorted
/// closure set, which doubles as the resulting DFA state's identity.
fn epsilon_closure(nfa: &Nfa, seed: &[usize]) -> (Vec<usize>, Option<String>, Anchor) {
    let mut in_set: std::collections::HashSet<usize> = seed.iter().copied().collect();
    let mut stack: Vec<usize> = seed.to_vec();

    let mut best_accept_idx: Option<usize> = None;
    let mut accept_string = None;
    let mut anchor = Anchor::NONE;

    while let Some(i) = stack.pop() {
        let node = nfa.node(i);

        if node.is_accepting() && best_accept_idx.map_or(true, |best| i < best) {
            best_accept_idx = Some(i);
            accept_string = node.accept_string.clone();
            anchor = node.anchor;
        }

        if node.edge == Edge::Epsilon {
            for next in node.next.into_iter().flatten() {
                if in_set.insert(next) {
                    stack.push(next);
                }
            }
        }
    }

    let mut set: Vec<usize> = in_set.into_iter().collect();
    set.sort_unstable();
    (set, accept_string, anchor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::MacroTable;
    use crate::parser::{compile, compile_rules};

    fn dfa_for(src: &str) -> Dfa {
        compile(src, &MacroTable::new()).unwrap().to_dfa()
    }

    #[test]
    fn single_literal_two_states() {
        let dfa = dfa_for("a");
        assert_eq!(dfa.len(), 2);
        let start = dfa.state(dfa.start());
        let next = start.follow(b'a').unwrap();
        assert!(dfa.state(next).is_accepting());
        for c in 0u8..128 {
            if c != b'a' {
                assert!(start.follow(c).is_none());
            }
        }
    }

    #[test]
    fn alternation_shares_accept_state() {
        let dfa = dfa_for("a|b");
        assert_eq!(dfa.len(), 2);
        let start = dfa.state(dfa.start());
        let via_a = start.follow(b'a').unwrap();
        let via_b = start.follow(b'b').unwrap();
        assert_eq!(via_a, via_b);
        assert!(dfa.state(via_a).is_accepting());
    }

    #[test]
    fn star_loops_back_to_same_state() {
        let dfa = dfa_for("ab*c");
        let s0 = dfa.start();
        let after_a = dfa.state(s0).follow(b'a').unwrap();
        let after_b = dfa.state(after_a).follow(b'b').unwrap();
        assert_eq!(after_b, dfa.state(after_b).follow(b'b').unwrap());
        let accept = dfa.state(after_a).follow(b'c').unwrap();
        assert!(dfa.state(accept).is_accepting());
        let accept_via_b = dfa.state(after_b).follow(b'c').unwrap();
        assert!(dfa.state(accept_via_b).is_accepting());
    }

    #[test]
    fn character_range() {
        let dfa = dfa_for("[a-c]");
        let start = dfa.state(dfa.start());
        for b in [b'a', b'b', b'c'] {
            assert!(start.follow(b).is_some());
        }
        assert!(start.follow(b'd').is_none());
    }

    #[test]
    fn dot_rejects_newline_and_cr() {
        let dfa = dfa_for(".");
        let start = dfa.state(dfa.start());
        assert!(start.follow(b'\n').is_none());
        assert!(start.follow(b'\r').is_none());
        assert!(start.follow(b'a').is_some());
    }

    #[test]
    fn anchors_on_accepting_state() {
        let dfa = dfa_for("^ab$");
        let accepting = dfa.states().iter().find(|s| s.is_accepting()).unwrap();
        assert!(accepting.anchor.contains(Anchor::LINE_START));
        assert!(accepting.anchor.contains(Anchor::LINE_END));
    }

    #[test]
    fn no_two_states_share_a_subset() {
        let dfa = dfa_for("(a|b)*abb");
        let mut seen = std::collections::HashSet::new();
        for state in dfa.states() {
            assert!(seen.insert(state.nfa_subset.clone()), "duplicate subset");
        }
    }

    #[test]
    fn transition_totality_over_alphabet() {
        let dfa = dfa_for("(a|b)*abb");
        for state in dfa.states() {
            for c in 0u8..128 {
                // Either a concrete target or an explicit reject -- both are
                // `Option<usize>`, so this just confirms `follow` is total
                // over the byte range without panicking.
                let _ = state.follow(c);
            }
        }
    }

    #[test]
    fn accept_priority_prefers_earlier_declared_rule() {
        // Two separately-declared rules that overlap on input "a"; the
        // worklist's ε-closure keeps the smaller NFA index on a tie, and
        // `compile_rules` allocates earlier rules' nodes first, so the
        // first rule's action wins regardless of iteration order.
        let macros = MacroTable::new();
        let nfa = compile_rules(&["a  { first }", "a  { second }"], &macros).unwrap();
        let dfa = nfa.to_dfa();
        let start = dfa.state(dfa.start());
        let accept = dfa.state(start.follow(b'a').unwrap());
        assert_eq!(accept.accept_string.as_deref(), Some("{ first }"));
    }

    #[test]
    fn compile_rules_keeps_each_rule_reachable() {
        let macros = MacroTable::new();
        let nfa = compile_rules(&["a { a_action }", "b { b_action }"], &macros).unwrap();
        let dfa = nfa.to_dfa();
        let start = dfa.state(dfa.start());
        let via_a = dfa.state(start.follow(b'a').unwrap());
        let via_b = dfa.state(start.follow(b'b').unwrap());
        assert_eq!(via_a.accept_string.as_deref(), Some("{ a_action }"));
        assert_eq!(via_b.accept_string.as_deref(), Some("{ b_action }"));
    }
}
