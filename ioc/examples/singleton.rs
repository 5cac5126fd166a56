use fibre_autowire::{ParamDescriptor, ServiceContainer, TypeDescriptor};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

// A connection pool that gets a unique ID upon creation.
struct ConnectionPool {
  id: usize,
}

// A request handler that depends on the pool.
struct RequestHandler {
  pool: Arc<ConnectionPool>,
}

// A global, thread-safe counter to generate unique IDs.
static ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn main() {
  let container = ServiceContainer::new();

  // --- Singleton Registration ---
  // This constructor will only be called ONCE per identifier.
  container.register(
    TypeDescriptor::new("ConnectionPool", |_| {
      println!("Creating SINGLETON ConnectionPool...");
      Ok(ConnectionPool {
        id: ID_COUNTER.fetch_add(1, Ordering::SeqCst),
      })
    })
    .singleton(),
  );

  // --- Transient Registration ---
  // This constructor will be called EVERY time the handler is resolved.
  container.register(
    TypeDescriptor::new("RequestHandler", |args| {
      println!("Creating TRANSIENT RequestHandler...");
      Ok(RequestHandler {
        pool: args.service("pool")?,
      })
    })
    .param(ParamDescriptor::service("pool", "ConnectionPool")),
  );

  println!("--- Resolving Handlers ---");
  let h1 = container.get_as::<RequestHandler>("RequestHandler").unwrap();
  let h2 = container.get_as::<RequestHandler>("RequestHandler").unwrap();
  println!("Handler 1 pool ID: {}, Handler 2 pool ID: {}", h1.pool.id, h2.pool.id);

  assert!(!Arc::ptr_eq(&h1, &h2), "Handlers should be different");
  assert!(
    Arc::ptr_eq(&h1.pool, &h2.pool),
    "Both handlers should share the singleton pool"
  );
  println!("Handlers are distinct and share one pool, as expected.");
}
