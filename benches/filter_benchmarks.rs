use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use http::Request;
use rybbit_feeder::app::{Config, WebsiteMapping};
use rybbit_feeder::diagnostics::Diagnostics;
use rybbit_feeder::domain::{RemoteAddr, RequestMeta};
use rybbit_feeder::filter::{FilterEngine, FilterRules};
use rybbit_feeder::intercept::build_event;
use std::sync::Arc;

fn engine() -> FilterEngine {
    let config = Config {
        websites: vec![
            WebsiteMapping::new("example.com", "1"),
            WebsiteMapping::new("blog.example.com", "2"),
        ],
        ignore_ips: vec!["10.0.0.0/8".into(), "192.168.0.0/16".into(), "2001:db8::/32".into()],
        ignore_urls: vec![r"^/admin".into(), r"[?&]preview=".into()],
        ignore_user_agents: vec!["bot".into(), "crawler".into(), "curl".into()],
        ..Config::default()
    };
    FilterEngine::new(
        FilterRules::compile(&config).unwrap(),
        Arc::new(config.site_map()),
        Diagnostics::new("bench", false),
    )
}

fn request(path: &str, user_agent: &str) -> Request<()> {
    Request::builder()
        .uri(path)
        .header("host", "blog.example.com")
        .header("user-agent", user_agent)
        .header("x-real-ip", "203.0.113.20")
        .header("accept-language", "en-GB,en;q=0.9")
        .extension(RemoteAddr("203.0.113.20:50000".parse().unwrap()))
        .body(())
        .unwrap()
}

fn benchmark_should_track(c: &mut Criterion) {
    let engine = engine();
    let tracked = request("/posts/rust-async", "Mozilla/5.0 (Macintosh)");
    let asset = request("/static/app.js", "Mozilla/5.0 (Macintosh)");
    let crawler = request("/posts/rust-async", "Googlebot/2.1");

    let mut group = c.benchmark_group("should_track");
    group.throughput(Throughput::Elements(1));

    group.bench_function("tracked_page", |b| {
        b.iter(|| engine.should_track(&RequestMeta::from_request(std::hint::black_box(&tracked))));
    });

    group.bench_function("static_asset", |b| {
        b.iter(|| engine.should_track(&RequestMeta::from_request(std::hint::black_box(&asset))));
    });

    group.bench_function("ignored_user_agent", |b| {
        b.iter(|| engine.should_track(&RequestMeta::from_request(std::hint::black_box(&crawler))));
    });

    group.finish();
}

fn benchmark_event_build(c: &mut Criterion) {
    let engine = engine();
    let tracked = request("/posts/rust-async", "Mozilla/5.0 (Macintosh)");

    c.bench_function("build_event", |b| {
        b.iter(|| {
            let meta = RequestMeta::from_request(std::hint::black_box(&tracked));
            std::hint::black_box(build_event(&engine, "api-key", &meta))
        });
    });
}

criterion_group!(benches, benchmark_should_track, benchmark_event_build);
criterion_main!(benches);
