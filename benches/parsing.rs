//! Benchmarks for transcript parsing and statistics.
//!
//! Run with: `cargo bench`
//! Run specific group: `cargo bench --bench parsing -- stats`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use bloop::lexicon::Lexicon;
use bloop::parser::TranscriptParser;
use bloop::sampler::MessageSampler;
use bloop::stats::{gap, StatsEngine};

// =============================================================================
// Test Data Generators
// =============================================================================

fn generate_transcript(count: usize) -> String {
    let texts = [
        "good morning everyone hope the day treats you well",
        "running a bit late will be there soon",
        "did anyone remember to book the tickets for saturday",
        "🔥🔥🔥",
        "ok",
        "the photos from the trip are finally uploaded somewhere safe",
    ];
    let mut lines = Vec::with_capacity(count);
    for i in 0..count {
        let sender = if i % 2 == 0 { "Alice" } else { "Bob" };
        let day = 1 + (i / 480) % 27;
        let hour = (8 + i / 60) % 24;
        let minute = i % 60;
        lines.push(format!(
            "{day}/3/2024, {hour:02}:{minute:02} - {sender}: {}",
            texts[i % texts.len()]
        ));
    }
    lines.join("\n")
}

fn lexicon() -> Lexicon {
    Lexicon::from_parts(
        ["the", "and", "you", "for", "with"],
        ["created group", "omitted media"],
    )
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_parsing(c: &mut Criterion) {
    let lex = lexicon();
    let parser = TranscriptParser::new(&lex);

    let mut group = c.benchmark_group("parse");
    for count in [100, 1_000, 10_000] {
        let transcript = generate_transcript(count);
        group.throughput(Throughput::Bytes(transcript.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(count),
            &transcript,
            |b, transcript| b.iter(|| parser.parse_text(black_box(transcript))),
        );
    }
    group.finish();
}

fn bench_stats(c: &mut Criterion) {
    let lex = lexicon();
    let parser = TranscriptParser::new(&lex);
    let engine = StatsEngine::new(&lex);

    let mut group = c.benchmark_group("stats");
    for count in [100, 1_000, 10_000] {
        let outcome = parser.parse_text(&generate_transcript(count));
        let break_minutes = gap::dynamic_convo_break(&outcome.messages);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(count),
            &outcome.messages,
            |b, messages| {
                b.iter(|| engine.calculate(black_box(messages), break_minutes).unwrap())
            },
        );
    }
    group.finish();
}

fn bench_sampler(c: &mut Criterion) {
    let lex = lexicon();
    let parser = TranscriptParser::new(&lex);
    let outcome = parser.parse_text(&generate_transcript(10_000));
    let sampler = MessageSampler::new(2.0).with_seed(42);

    c.bench_function("sampler/10000", |b| {
        b.iter(|| sampler.sample(black_box(&outcome.messages)))
    });
}

criterion_group!(benches, bench_parsing, bench_stats, bench_sampler);
criterion_main!(benches);
