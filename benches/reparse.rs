use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use streamark::markdown::{block_math, inline_math, ExtensionSet, Parser};
use streamark::render::Renderer;

fn make_document(sections: usize) -> String {
    let mut doc = String::new();
    for i in 0..sections {
        doc.push_str(&format!("## Section {i}\n\n"));
        doc.push_str(
            "Some **bold** text, a `code span`, a [link](https://example.com) and $x^2$.\n\n",
        );
        doc.push_str("- first item\n- second *item*\n\n");
        doc.push_str("```rust\nfn main() {\n    println!(\"hi\");\n}\n```\n\n");
    }
    doc
}

/// Char-aligned prefixes of `doc`, `chunk` characters apart, like the
/// buffer snapshots a stream produces.
fn prefixes(doc: &str, chunk: usize) -> Vec<&str> {
    let mut ends: Vec<usize> = doc
        .char_indices()
        .map(|(i, _)| i)
        .step_by(chunk)
        .skip(1)
        .collect();
    ends.push(doc.len());
    ends.into_iter().map(|end| &doc[..end]).collect()
}

fn bench_reparse(c: &mut Criterion) {
    let plain = Parser::new();
    let extended =
        Parser::with_extensions(ExtensionSet::new().with(block_math()).with(inline_math()));
    let renderer = Renderer::new();

    for &sections in &[4usize, 32usize] {
        let doc = make_document(sections);
        let snapshots = prefixes(&doc, 16);

        let mut group = c.benchmark_group(format!("reparse_sections{sections}"));
        group.throughput(Throughput::Bytes(doc.len() as u64));

        group.bench_function(BenchmarkId::new("final", doc.len()), |b| {
            b.iter(|| plain.parse_final(&doc))
        });
        group.bench_function(BenchmarkId::new("tolerant", doc.len()), |b| {
            b.iter(|| plain.parse(&doc))
        });

        // Every chunk re-parses the whole buffer, so a stream costs the sum
        // over its prefixes.
        group.bench_function(BenchmarkId::new("stream", snapshots.len()), |b| {
            b.iter(|| {
                for snapshot in &snapshots {
                    let _ = plain.parse(snapshot);
                }
            })
        });
        group.bench_function(BenchmarkId::new("stream_extensions", snapshots.len()), |b| {
            b.iter(|| {
                for snapshot in &snapshots {
                    let _ = extended.parse(snapshot);
                }
            })
        });
        group.bench_function(BenchmarkId::new("stream_render", snapshots.len()), |b| {
            b.iter(|| {
                for snapshot in &snapshots {
                    let _ = renderer.render(&plain.parse(snapshot));
                }
            })
        });

        group.finish();
    }
}

criterion_group!(benches, bench_reparse);
criterion_main!(benches);
