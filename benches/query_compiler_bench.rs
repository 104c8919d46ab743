use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use search_query::dnf;
use search_query::lexer::Lexer;
use search_query::parser::Parser;
use search_query::{parse, QueryCompiler, SearchType};
use std::hint::black_box;

const CASES: &[(&str, &str)] = &[
    ("simple", "repo:foo bar"),
    ("medium", r#"repo:^github\.com/org/ -file:_test\.go$ lang:go case:yes "fmt.Println""#),
    (
        "complex",
        "(repo:a or repo:b or repo:c) (file:x or -file:y) not (lang:go or lang:rust) count:100 (foo or bar or baz)",
    ),
];

// Lexing only.
fn benchmark_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_performance");
    for &(name, query) in CASES {
        group.bench_with_input(BenchmarkId::new("tokenize", name), &query, |b, &query| {
            b.iter(|| {
                let tokens: Vec<_> = Lexer::new(black_box(query)).collect();
                black_box(tokens)
            })
        });
    }
    group.finish();
}

// Parsing from pre-lexed tokens.
fn benchmark_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_performance");
    for &(name, query) in CASES {
        let tokens: Vec<_> = Lexer::new(query).collect();
        group.bench_with_input(BenchmarkId::new("parse", name), &tokens, |b, tokens| {
            b.iter(|| {
                let mut parser = Parser::new(query, black_box(tokens), SearchType::Regex);
                match parser.parse() {
                    Ok(q) => black_box(q),
                    Err(e) => panic!("parse failed: {e}"),
                }
            })
        });
    }
    group.finish();
}

// Normalization of a parsed tree.
fn benchmark_dnf(c: &mut Criterion) {
    let mut group = c.benchmark_group("dnf_performance");
    for &(name, query) in CASES {
        let q = parse(query, SearchType::Regex).expect("benchmark query parses");
        group.bench_with_input(BenchmarkId::new("to_dnf", name), &q, |b, q| {
            b.iter(|| black_box(dnf::to_dnf(black_box(q))))
        });
    }
    group.finish();
}

// Full pipeline: parse, normalize, validate.
fn benchmark_compile(c: &mut Criterion) {
    let compiler = QueryCompiler::new();
    let mut group = c.benchmark_group("compile_performance");
    for &(name, query) in CASES {
        group.bench_with_input(BenchmarkId::new("compile", name), &query, |b, &query| {
            b.iter(|| black_box(compiler.compile(black_box(query))))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_lexer,
    benchmark_parser,
    benchmark_dnf,
    benchmark_compile
);
criterion_main!(benches);
