//! Benchmarks for markdown parsing and inline formatting.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use markview::document::Document;
use markview::inline::format_inline;
use markview::style::Style;

fn bench_parse_simple(c: &mut Criterion) {
    let md = "# Hello\n\nWorld";
    c.bench_function("parse_simple", |b| b.iter(|| Document::parse(black_box(md))));
}

fn bench_parse_medium(c: &mut Criterion) {
    let md = include_str!("../tests/fixtures/sample.md");
    c.bench_function("parse_medium", |b| b.iter(|| Document::parse(black_box(md))));
}

fn bench_format_inline(c: &mut Criterion) {
    let text = "Some **bold** and *italic* text with `code`, ~~old~~ words, \
                a [link](https://example.com) and math $e^{i\\pi}$ at the end.";
    let base = Style::default();
    c.bench_function("format_inline", |b| {
        b.iter(|| format_inline(black_box(text), &base))
    });
}

criterion_group!(benches, bench_parse_simple, bench_parse_medium, bench_format_inline);
criterion_main!(benches);
