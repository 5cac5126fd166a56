use fibre_autowire::{resolve, Error, ParamDescriptor, ServiceContainer, TypeDescriptor};
use std::panic;

struct Port {
  number: u16,
}

fn main() {
  let container = ServiceContainer::new();
  container.register(
    TypeDescriptor::new("Port", |args| Ok(Port { number: args.value("number")? }))
      .param(ParamDescriptor::builtin("number", "int")),
  );

  // --- Using the panicking `resolve!` macro ---
  println!("Attempting to resolve a service that was never registered...");

  let result = panic::catch_unwind(|| {
    let container = ServiceContainer::new();
    // This line will panic!
    let _service = resolve!(container, Port, "UnregisteredService");
  });

  assert!(result.is_err(), "resolve! should have panicked.");
  println!("Successfully caught the expected panic from resolve!.");

  // --- Using the fallible `get()` method ---
  println!("\nNow, resolving an unknown identifier with `get()`...");
  match container.get("UnregisteredService") {
    Err(Error::NotFound { id }) => println!("Correctly received NotFound for '{}'.", id),
    other => panic!("Expected NotFound, got {:?}", other.map(|_| ())),
  }

  // --- A known type whose builtin parameter has no default ---
  println!("\nResolving 'Port', whose `number` has no default...");
  match container.get("Port") {
    Err(e) => println!("Correctly failed: {} (cause: {})", e, e.root_cause()),
    Ok(_) => panic!("Port should not be constructible without a number"),
  }

  let port = container
    .get_as_with::<Port>("Port", fibre_autowire::args! { "number" => serde_json::json!(8080) })
    .unwrap();
  println!("With an explicit override it resolves: port {}", port.number);
}
