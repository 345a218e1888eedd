use criterion::{criterion_group, criterion_main, Criterion};
use errors::ErrorReporter;

pub fn criterion_benchmark(c: &mut Criterion) {
    let source = (0..1000)
        .map(|i| format!("(-{i}.5 * \"s{i}\" + {i} / !true) != nil // term {i}\n"))
        .collect::<Vec<_>>()
        .join(" == ");

    c.bench_function("scan", |b| {
        b.iter(|| {
            let mut errors = ErrorReporter::new();
            scanner::scan(&source, &mut errors)
        })
    });

    c.bench_function("scan and parse", |b| {
        b.iter(|| {
            let mut errors = ErrorReporter::new();
            let expr = parser::parse_source(&source, &mut errors);
            assert!(expr.is_some());
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
