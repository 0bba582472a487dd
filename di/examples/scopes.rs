use fibre_di::{resolve, Container, Lifetime, Resolver};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// A shared pool created once for the whole application.
struct ConnectionPool {
  size: usize,
}

// One unit of work per request scope.
struct UnitOfWork {
  id: u64,
  pool: Arc<ConnectionPool>,
}

// The request id is bound as an ambient value on each scope.
struct RequestId(u64);

fn main() {
  // Run with RUST_LOG=fibre_di=trace to watch registrations and resolution.
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let app = Container::new();
  let next_unit = Arc::new(AtomicU64::new(1));

  // --- Registration ---

  app.register(Lifetime::PerContainer, |_| {
    println!("  (creating connection pool)");
    Ok(ConnectionPool { size: 8 })
  });

  let counter = Arc::clone(&next_unit);
  app.register(Lifetime::PerScope, move |r| {
    Ok(UnitOfWork {
      id: counter.fetch_add(1, Ordering::SeqCst),
      pool: r.resolve::<ConnectionPool>()?,
    })
  });

  // --- One scope per request ---

  for request in [100_u64, 200, 300] {
    let scope = app.scope();
    scope.values().set(RequestId(request));

    let first = resolve!(scope, UnitOfWork);
    let again = resolve!(scope, UnitOfWork);
    let request_id = resolve!(scope, RequestId);

    println!(
      "request {} -> unit of work #{} (pool of {}), reused within scope: {}",
      request_id.0,
      first.id,
      first.pool.size,
      Arc::ptr_eq(&first, &again)
    );
  }

  // The request id never leaks back into the application container.
  assert!(app.resolve::<RequestId>().is_err());
}
