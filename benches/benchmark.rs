use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lexforge::lexer::MacroTable;
use lexforge::parser::{compile, compile_rules};

const IDENT: &str = "[a-zA-Z_][a-zA-Z0-9_]*";
const FLOAT: &str = r#"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?"#;
const STRING: &str = r#"\"([^\"\\]|\\.)*\""#;

pub fn nfa_construction(c: &mut Criterion) {
    let macros = MacroTable::new();
    c.bench_function("compile single pattern", |b| {
        b.iter(|| compile(black_box(FLOAT), &macros).unwrap())
    });
}

pub fn dfa_construction(c: &mut Criterion) {
    let macros = MacroTable::new();
    let nfa = compile(FLOAT, &macros).unwrap();
    c.bench_function("subset construction", |b| b.iter(|| nfa.to_dfa()));
}

pub fn multi_rule_compile(c: &mut Criterion) {
    let macros = MacroTable::new();
    let rules = [IDENT, FLOAT, STRING];
    c.bench_function("compile_rules (3 rules)", |b| {
        b.iter(|| compile_rules(black_box(&rules), &macros).unwrap())
    });
}

criterion_group!(
    benches,
    nfa_construction,
    dfa_construction,
    multi_rule_compile
);
criterion_main!(benches);
