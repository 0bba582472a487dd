use fibre_di::{resolve, Container, Interface, Lifetime, Resolver, Value};
use std::sync::Arc;

// 1. Define the abstraction (the trait)
trait Logger: Send + Sync {
  fn log(&self, message: &str);
}

// 2. Define concrete implementations
struct ConsoleLogger;
impl Logger for ConsoleLogger {
  fn log(&self, message: &str) {
    println!("[CONSOLE LOG]: {}", message);
  }
}

struct PrefixLogger {
  prefix: String,
}
impl Logger for PrefixLogger {
  fn log(&self, message: &str) {
    println!("[{}]: {}", self.prefix, message);
  }
}

// 3. Define a service that depends on the abstraction
struct ReportService {
  logger: Arc<dyn Logger>,
}

impl ReportService {
  fn generate_report(&self) {
    self.logger.log("Starting report generation.");
    self.logger.log("Finished report generation.");
  }
}

fn main() {
  let container = Container::new();

  // --- Registration ---

  // The factory hands back the trait object directly.
  container.register_trait::<dyn Logger, _>(Lifetime::PerContainer, |_| Ok(Arc::new(ConsoleLogger)));

  // Alternatively, declare which concrete types implement the trait and let
  // the factory produce any of them as an erased value.
  let logger = Interface::<dyn Logger>::new()
    .implemented_by::<ConsoleLogger>(|l| l as Arc<dyn Logger>)
    .implemented_by::<PrefixLogger>(|l| l as Arc<dyn Logger>);
  container.register_named(logger, "audit", Lifetime::PerContainer, |_| {
    Ok(Value::new(PrefixLogger {
      prefix: "AUDIT".to_string(),
    }))
  });

  // The ReportService factory resolves its own dependency.
  container.register(Lifetime::PerScope, |r| {
    Ok(ReportService {
      logger: r.resolve::<dyn Logger>()?,
    })
  });

  // --- Resolution and Usage ---
  println!("Resolving the high-level service...");
  let report_service = resolve!(container, ReportService);
  report_service.generate_report();

  let audit = resolve!(container, trait Logger, "audit");
  audit.log("report generated");
}
