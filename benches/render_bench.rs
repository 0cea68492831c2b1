use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use wp_vrt::blocks::parse_blocks;
use wp_vrt::discovery::build_manifest;
use wp_vrt::host::{Host, MemoryOptions, MemorySite, PatternDef, SiteFixture};
use wp_vrt::sample::Synthesizer;
use wp_vrt::{Hooks, RenderContext, Router, Vrt, VrtConfig};

fn bench_vrt() -> Vrt {
    let fixture = SiteFixture {
        patterns: (0..20)
            .map(|i| PatternDef {
                name: format!("bench/pattern-{i}"),
                title: Some(format!("Pattern {i}")),
                content: "<!-- wp:group --><div class=\"wp-block-group\"><!-- wp:paragraph --><p>Copy</p><!-- /wp:paragraph --><!-- wp:latest-posts /--></div><!-- /wp:group -->".into(),
                categories: vec!["bench".into()],
            })
            .collect(),
        ..Default::default()
    };
    let host = Host::from_site(Arc::new(MemorySite::from_fixture(fixture)), Arc::new(MemoryOptions::new()));
    Vrt::new(host, Hooks::new(), VrtConfig::default())
}

fn bench_synthesize(c: &mut Criterion) {
    let vrt = bench_vrt();
    let synth = Synthesizer::new(vrt.host.catalog.as_ref(), &vrt.hooks);
    c.bench_function("synthesize_quote_variation", |b| {
        b.iter(|| synth.synthesize(black_box("core/quote"), black_box(Some("plain"))))
    });

    let markup = synth.synthesize("core/columns", None);
    c.bench_function("parse_sample_markup", |b| b.iter(|| parse_blocks(black_box(&markup))));
}

fn bench_render(c: &mut Criterion) {
    let vrt = bench_vrt();
    let router = Router::new(&vrt);
    let mut ctx = RenderContext::new();

    c.bench_function("render_block_page", |b| {
        b.iter(|| router.respond(&mut ctx, black_box("/wp-vrt/block/core-paragraph")))
    });
    c.bench_function("render_dynamic_pattern_page", |b| {
        b.iter(|| router.respond(&mut ctx, black_box("/wp-vrt/pattern/bench-pattern-7")))
    });
    c.bench_function("discovery_manifest", |b| b.iter(|| build_manifest(&vrt, false)));
}

criterion_group!(benches, bench_synthesize, bench_render);
criterion_main!(benches);
