//! 表达式引擎性能基准测试
//!
//! 覆盖反向解析、正向序列化以及编辑会话逐 token 追加的开销。

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rule_expression::{
    EditSession, ExpressionConfig, FactorDef, ForwardSerializer, LexicalCatalog, ParameterDef,
    ReverseParser, TokenKind,
};
use std::collections::HashMap;
use std::hint::black_box;
use std::sync::Arc;

/// 创建带有若干多词参数与多词条件的目录
fn create_catalog(extra_parameters: usize) -> LexicalCatalog {
    let mut parameters = vec![
        ParameterDef::new(1, "Age"),
        ParameterDef::new(2, "Salary"),
        ParameterDef::new(3, "Loan Amount"),
        ParameterDef::new(4, "Home City"),
    ];
    for i in 0..extra_parameters {
        parameters.push(ParameterDef::new(
            100 + i as i64,
            format!("Custom Parameter {i}"),
        ));
    }

    let mut factors = HashMap::new();
    factors.insert(
        1,
        vec![
            FactorDef::single("18"),
            FactorDef::single("21"),
            FactorDef::range("30", "40"),
        ],
    );
    factors.insert(2, vec![FactorDef::range("20", "30")]);
    factors.insert(4, vec![FactorDef::single("New York")]);

    LexicalCatalog::new(
        parameters,
        factors,
        ["=", ">", "<", "In List", "Not In List", "Range"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    )
    .unwrap()
}

const SIMPLE: &str = "Age > 18";
const NESTED: &str =
    "Loan Amount > 5000 AND ( Age Range 30-40 OR Home City Not In List New York ) OR Salary = 20-30";

fn long_expression(clauses: usize) -> String {
    (0..clauses)
        .map(|i| format!("( Age > {i} AND Home City In List New York )"))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// 反向解析基准
fn bench_parse(c: &mut Criterion) {
    let catalog = create_catalog(0);
    let parser = ReverseParser::new(&catalog);

    let mut group = c.benchmark_group("parse");
    group.bench_function("simple", |b| b.iter(|| parser.parse(black_box(SIMPLE))));
    group.bench_function("nested", |b| b.iter(|| parser.parse(black_box(NESTED))));

    for clauses in [4, 16, 64] {
        let expression = long_expression(clauses);
        group.bench_with_input(
            BenchmarkId::new("clauses", clauses),
            &expression,
            |b, expression| b.iter(|| parser.parse(black_box(expression))),
        );
    }

    group.finish();
}

/// 目录规模对参数匹配的影响
fn bench_catalog_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_scaling");

    for size in [10, 100, 1000] {
        let catalog = create_catalog(size);
        let parser = ReverseParser::new(&catalog);
        group.bench_with_input(BenchmarkId::new("parameters", size), &size, |b, _| {
            b.iter(|| parser.parse(black_box(NESTED)))
        });
    }

    group.finish();
}

/// 正向序列化基准
fn bench_serialize(c: &mut Criterion) {
    let catalog = create_catalog(0);
    let tokens = ReverseParser::new(&catalog).parse(NESTED).tokens;

    let mut group = c.benchmark_group("serialize");

    let plain = ExpressionConfig::default();
    let serializer = ForwardSerializer::new(&catalog, &plain);
    group.bench_function("display", |b| {
        b.iter(|| serializer.display(black_box(&tokens)))
    });
    group.bench_function("payload", |b| {
        b.iter(|| serializer.payload(black_box(&tokens)))
    });

    let spaced = ExpressionConfig {
        spaced_range_display: true,
    };
    let spaced_serializer = ForwardSerializer::new(&catalog, &spaced);
    group.bench_function("display_spaced_range", |b| {
        b.iter(|| spaced_serializer.display(black_box(&tokens)))
    });

    group.finish();
}

/// 编辑会话逐步追加基准
fn bench_session(c: &mut Criterion) {
    let catalog = Arc::new(create_catalog(0));
    let steps = [
        (TokenKind::Parameter, "Loan Amount"),
        (TokenKind::Operator, ">"),
        (TokenKind::Factor, "5000"),
        (TokenKind::LogicalOperator, "AND"),
        (TokenKind::OpenParen, "("),
        (TokenKind::Parameter, "Age"),
        (TokenKind::Operator, "Range"),
        (TokenKind::Factor, "30-40"),
        (TokenKind::CloseParen, ")"),
    ];

    let mut group = c.benchmark_group("session");

    group.bench_function("append_and_finalize", |b| {
        b.iter(|| {
            let mut session = EditSession::new(Arc::clone(&catalog));
            for (kind, value) in &steps {
                session.append(*kind, value).unwrap();
            }
            black_box(session.finalize().unwrap())
        })
    });

    group.bench_function("load_for_edit", |b| {
        b.iter(|| EditSession::load_for_edit(Arc::clone(&catalog), black_box(NESTED)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_catalog_scaling,
    bench_serialize,
    bench_session,
);

criterion_main!(benches);
