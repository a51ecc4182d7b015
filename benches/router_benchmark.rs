use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use httpcore::{HttpStatus, Request, Response, Router, Verb};

fn ok(request: &Request) -> Response {
    Response::reply(request, HttpStatus::Ok).build()
}

fn build_router(patterns: usize) -> Router {
    let mut router = Router::new();
    router.register(Verb::Get, "/", ok).unwrap();
    for i in 0..patterns {
        router
            .register(Verb::Get, &format!("/api/v{}/items/:id", i), ok)
            .unwrap();
    }
    router.register(Verb::Get, "/static/*", ok).unwrap();
    router.set_default_get(ok);
    router
}

fn exact_match_benchmark(c: &mut Criterion) {
    let router = build_router(10);
    c.bench_function("router_exact_match", |b| {
        b.iter(|| router.resolve(Verb::Get, black_box("/")).miss());
    });
}

fn pattern_match_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("router_pattern_match");
    for patterns in [1usize, 10, 100] {
        let router = build_router(patterns);
        let path = format!("/api/v{}/items/42", patterns - 1);
        group.bench_with_input(BenchmarkId::from_parameter(patterns), &path, |b, path| {
            b.iter(|| router.resolve(Verb::Get, black_box(path)).miss());
        });
    }
    group.finish();
}

fn miss_benchmark(c: &mut Criterion) {
    let router = build_router(100);
    c.bench_function("router_method_not_allowed", |b| {
        b.iter(|| router.resolve(Verb::Delete, black_box("/nowhere")).miss());
    });
}

criterion_group!(benches, exact_match_benchmark, pattern_match_benchmark, miss_benchmark);
criterion_main!(benches);
