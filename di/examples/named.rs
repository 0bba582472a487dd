use fibre_di::{resolve_all_named, Container, Error, Lifetime, Resolver, Target};
use std::collections::HashMap;
use std::sync::Arc;

fn main() -> Result<(), Error> {
  let container = Container::new();

  // --- Named Bindings ---

  container.register_instance_with_name("primary", String::from("postgres://primary"));
  container.register_instance_with_name("replica", String::from("postgres://replica"));
  container.register_with_name("pool_size", Lifetime::PerContainer, |_| Ok(16_usize));

  println!("primary: {}", container.resolve_named::<String>("primary")?);
  println!("replica: {}", container.resolve_named::<String>("replica")?);

  // --- Several Targets At Once ---

  let mut primary: Option<Arc<String>> = None;
  let mut pool_size: Option<Arc<usize>> = None;
  let mut named: HashMap<&str, Vec<&mut dyn Target>> = HashMap::new();
  named.insert("primary", vec![&mut primary as &mut dyn Target]);
  named.insert("pool_size", vec![&mut pool_size as &mut dyn Target]);
  resolve_all_named(&container, &mut named)?;
  drop(named);

  println!(
    "resolved together: {} with {} connections",
    primary.as_deref().map(String::as_str).unwrap_or_default(),
    pool_size.as_deref().copied().unwrap_or_default()
  );

  // --- Missing Bindings ---

  match container.resolve_named::<String>("archive") {
    Err(err) => println!("expected failure: {err}"),
    Ok(_) => unreachable!("nothing is registered as \"archive\""),
  }

  Ok(())
}
