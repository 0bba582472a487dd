// benches/resolve.rs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fibre_di::{Container, Lifetime, Resolver};
use std::sync::Arc;
use std::thread;

// --- Fixtures ---

struct Config {
  url: String,
}

struct Repository {
  config: Arc<Config>,
}

struct Handler {
  repository: Arc<Repository>,
}

fn container() -> Container {
  let container = Container::new();
  container.register_instance(Config {
    url: "postgres://localhost/bench".to_string(),
  });
  container.register(Lifetime::PerContainer, |r| {
    Ok(Repository {
      config: r.resolve::<Config>()?,
    })
  });
  container.register(Lifetime::PerRequest, |r| {
    Ok(Handler {
      repository: r.resolve::<Repository>()?,
    })
  });
  container
}

// --- Benchmarks ---

fn bench_lifetimes(c: &mut Criterion) {
  let root = container();
  let mut group = c.benchmark_group("Resolve/Lifetime");
  group.throughput(Throughput::Elements(1));

  group.bench_function("PerContainer/cached", |b| {
    b.iter(|| black_box(root.resolve::<Repository>().unwrap()))
  });
  group.bench_function("PerRequest/two_levels", |b| {
    b.iter(|| black_box(root.resolve::<Handler>().unwrap().repository.config.url.len()))
  });
  group.bench_function("Instance/registered", |b| {
    b.iter(|| black_box(root.resolve::<Config>().unwrap()))
  });

  let scope = root.scope().scope();
  root.values().set(7_u64);
  group.bench_function("Ambient/ancestor", |b| {
    b.iter(|| black_box(scope.resolve::<u64>().unwrap()))
  });
  group.finish();
}

fn bench_scopes(c: &mut Criterion) {
  let root = container();
  let mut group = c.benchmark_group("Resolve/Scope");

  for depth in [1_usize, 4, 16] {
    group.bench_with_input(BenchmarkId::new("create_and_resolve", depth), &depth, |b, &depth| {
      b.iter(|| {
        let mut scope = root.scope();
        for _ in 1..depth {
          scope = scope.scope();
        }
        black_box(scope.resolve::<Handler>().unwrap())
      })
    });
  }
  group.finish();
}

fn bench_contention(c: &mut Criterion) {
  let root = container();
  let mut group = c.benchmark_group("Resolve/Contention");

  for threads in [2_usize, 4, 8] {
    group.throughput(Throughput::Elements((threads * 1_000) as u64));
    group.bench_with_input(BenchmarkId::new("PerContainer", threads), &threads, |b, &threads| {
      b.iter(|| {
        thread::scope(|s| {
          for _ in 0..threads {
            s.spawn(|| {
              for _ in 0..1_000 {
                black_box(root.resolve::<Repository>().unwrap());
              }
            });
          }
        })
      })
    });
  }
  group.finish();
}

criterion_group!(benches, bench_lifetimes, bench_scopes, bench_contention);
criterion_main!(benches);
