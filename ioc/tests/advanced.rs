mod common;

use common::*;
use fibre_autowire::{
  DirectoryCrawler, Error, ParamDescriptor, ServiceContainer, StaticDiscovery, TypeDescriptor,
  TypeDiscovery,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc, Barrier,
};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

// --- Advanced Test Fixtures ---

trait Storage: Send + Sync {
  fn location(&self) -> String;
}

struct DiskStorage {
  root: String,
}

impl Storage for DiskStorage {
  fn location(&self) -> String {
    format!("disk:{}", self.root)
  }
}

// Depends on a bind key rather than on its parameter's declared type.
struct Uploader {
  storage: Arc<DiskStorage>,
}

fn fixture_names() -> Vec<&'static str> {
  vec![CLASS_A, CLASS_B, CLASS_C, CLASS_D, SKILL, CANDIDATE]
}

// --- Alias Tests ---

#[test]
fn test_alias_resolves_like_concrete_type() {
  let counters = Counters::default();
  let container = container_with_fixtures(&counters);
  container.add_alias("b.default", CLASS_B);

  let via_alias = container.get_as::<ClassB>("b.default").unwrap();
  let direct = container.get_as::<ClassB>(CLASS_B).unwrap();

  assert_eq!(via_alias.count, direct.count);
  assert!(!Arc::ptr_eq(&via_alias, &direct));
  assert!(Arc::ptr_eq(&via_alias.a, &direct.a));
}

#[test]
fn test_aliases_are_last_write_wins() {
  let counters = Counters::default();
  let container = container_with_fixtures(&counters);

  container.add_alias("thing", CLASS_A);
  container.add_alias("thing", CLASS_B);

  assert_eq!(container.alias_of("thing").as_deref(), Some(CLASS_B));
  assert!(container.get_as::<ClassB>("thing").is_ok());
}

#[test]
fn test_register_with_aliases_applies_provides_hints() {
  let counters = Counters::default();
  let container = ServiceContainer::new();
  container.register_with_aliases(class_a(&counters));

  let via_interface = container.get_as::<ClassA>(INTERFACE_A).unwrap();
  let via_key = container.get_as::<ClassA>("testAlias").unwrap();

  // Singletons are cached per identifier.
  assert_eq!(via_interface.serial, 1);
  assert_eq!(via_key.serial, 2);
  assert!(Arc::ptr_eq(
    &via_interface,
    &container.get_as::<ClassA>(INTERFACE_A).unwrap()
  ));
}

#[test]
fn test_inject_bind_key_overrides_declared_type() {
  let container = ServiceContainer::new();
  container.register_instance("storage.primary", DiskStorage { root: "/srv".into() });
  container.register(
    TypeDescriptor::new("Uploader", |args| {
      Ok(Uploader {
        storage: args.service("storage")?,
      })
    })
    .param(ParamDescriptor::service("storage", "Storage").inject("storage.primary")),
  );

  let uploader = container.get_as::<Uploader>("Uploader").unwrap();

  assert_eq!(uploader.storage.location(), "disk:/srv");
}

#[test]
fn test_inject_on_builtin_parameter_resolves_from_container() {
  struct Dsn {
    value: Arc<String>,
  }
  let container = ServiceContainer::new();
  container.register_instance("db.dsn", String::from("postgres://localhost"));
  container.register(
    TypeDescriptor::new("Dsn", |args| Ok(Dsn { value: args.service("dsn")? }))
      .param(ParamDescriptor::builtin("dsn", "string").inject("db.dsn")),
  );

  let dsn = container.get_as::<Dsn>("Dsn").unwrap();
  assert_eq!(dsn.value.as_str(), "postgres://localhost");
}

// --- Discovery Tests ---

#[test]
fn test_provides_annotation_via_discovery() {
  let counters = Counters::default();
  let container = container_with_fixtures(&counters);
  let discovery = StaticDiscovery::new(fixture_names());

  let registered = container
    .load_definitions(&discovery, Path::new("."), "example::", false)
    .unwrap();

  assert_eq!(registered, 2);
  assert_eq!(container.alias_of(INTERFACE_A).as_deref(), Some(CLASS_A));
  assert!(container.get_as::<ClassA>(INTERFACE_A).is_ok());
  assert!(container.get_as::<ClassA>("testAlias").is_ok());
}

#[test]
fn test_discovery_is_idempotent() {
  let counters = Counters::default();
  let container = container_with_fixtures(&counters);
  let discovery = StaticDiscovery::new(fixture_names());

  container
    .load_definitions(&discovery, Path::new("."), "example", false)
    .unwrap();
  let once = (container.alias_of(INTERFACE_A), container.alias_of("testAlias"));
  container
    .load_definitions(&discovery, Path::new("."), "example", false)
    .unwrap();
  let twice = (container.alias_of(INTERFACE_A), container.alias_of("testAlias"));

  assert_eq!(once, twice);
}

#[test]
fn test_discovery_of_unregistered_type_fails() {
  let container = ServiceContainer::new();
  let discovery = StaticDiscovery::new(["example::Ghost"]);

  let err = container
    .load_definitions(&discovery, Path::new("."), "example", false)
    .unwrap_err();

  assert!(err
    .find_in_chain(|e| matches!(e, Error::UnknownType { .. }))
    .is_some());
}

#[test]
fn test_directory_crawler_maps_files_to_type_names() {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path();
  fs::create_dir_all(root.join("nested")).unwrap();
  fs::write(root.join("ClassA.rs"), "pub struct ClassA;\n").unwrap();
  fs::write(root.join("nested/Skill.rs"), "pub struct Skill { title: String }\n").unwrap();
  fs::write(root.join("mod.rs"), "mod nested;\n").unwrap();
  fs::write(root.join("notes.txt"), "not a type").unwrap();

  let names = DirectoryCrawler::new()
    .discover(root, "example", true)
    .unwrap();

  assert_eq!(names, vec!["example::ClassA", "example::nested::Skill"]);
}

#[test]
fn test_directory_crawler_enforces_declarations() {
  let dir = tempfile::tempdir().unwrap();
  fs::write(dir.path().join("Wrong.rs"), "pub struct Other;\n").unwrap();

  let crawler = DirectoryCrawler::new();
  assert!(crawler.discover(dir.path(), "app", false).is_ok());

  let err = crawler.discover(dir.path(), "app", true).unwrap_err();
  assert!(matches!(err, Error::Discovery { .. }));
}

#[test]
fn test_directory_crawler_with_custom_extension() {
  let dir = tempfile::tempdir().unwrap();
  fs::write(dir.path().join("Invoice.def"), "enum Invoice {}\n").unwrap();
  fs::write(dir.path().join("Ignored.rs"), "struct Ignored;\n").unwrap();

  let names = DirectoryCrawler::with_extension("def")
    .discover(dir.path(), "", true)
    .unwrap();

  assert_eq!(names, vec!["Invoice"]);
}

#[test]
fn test_load_definitions_from_directory() {
  let counters = Counters::default();
  let container = container_with_fixtures(&counters);
  let dir = tempfile::tempdir().unwrap();
  fs::write(dir.path().join("ClassA.rs"), "pub struct ClassA;\n").unwrap();
  fs::write(dir.path().join("ClassB.rs"), "pub struct ClassB;\n").unwrap();

  container
    .load_definitions(&DirectoryCrawler::new(), dir.path(), "example", true)
    .unwrap();

  assert_eq!(container.alias_of("testAlias").as_deref(), Some(CLASS_A));
  assert_eq!(container.alias_of(INTERFACE_A).as_deref(), Some(CLASS_A));
}

// --- Cycles and Concurrency ---

#[test]
fn test_circular_dependency_is_an_error() {
  let container = ServiceContainer::new();
  container.register(
    TypeDescriptor::new("Chicken", |_| Ok(()))
      .param(ParamDescriptor::service("egg", "Egg"))
      .singleton(),
  );
  container.register(
    TypeDescriptor::new("Egg", |_| Ok(())).param(ParamDescriptor::service("chicken", "Chicken")),
  );

  let err = container.get("Chicken").unwrap_err();

  assert!(matches!(&err, Error::Container { id, .. } if id == "Chicken"));
  assert!(err
    .find_in_chain(|e| matches!(e, Error::CircularDependency { id } if id == "Chicken"))
    .is_some());
  // The failed attempt left no half-built singleton behind.
  assert!(container.get("Chicken").is_err());
}

#[test]
fn test_concurrent_singleton_resolution_constructs_once() {
  const THREADS: usize = 8;
  let built = Arc::new(AtomicUsize::new(0));
  let container = Arc::new(ServiceContainer::new());
  container.register({
    let built = built.clone();
    TypeDescriptor::new("Pool", move |_| {
      built.fetch_add(1, Ordering::SeqCst);
      thread::sleep(Duration::from_millis(20));
      Ok(String::from("pool"))
    })
    .singleton()
  });

  let barrier = Arc::new(Barrier::new(THREADS));
  let handles: Vec<_> = (0..THREADS)
    .map(|_| {
      let container = container.clone();
      let barrier = barrier.clone();
      thread::spawn(move || {
        barrier.wait();
        container.get_as::<String>("Pool").unwrap()
      })
    })
    .collect();
  let pools: Vec<Arc<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

  assert_eq!(built.load(Ordering::SeqCst), 1);
  assert!(pools.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[test]
fn test_singleton_cycle_across_threads_fails_instead_of_blocking() {
  let container = Arc::new(ServiceContainer::new());
  // Holds each thread inside its own singleton long enough for the other to start.
  container.register(TypeDescriptor::new("Slow", |_| {
    thread::sleep(Duration::from_millis(200));
    Ok(())
  }));
  container.register(
    TypeDescriptor::new("Left", |_| Ok(()))
      .param(ParamDescriptor::service("slow", "Slow"))
      .param(ParamDescriptor::service("right", "Right"))
      .singleton(),
  );
  container.register(
    TypeDescriptor::new("Right", |_| Ok(()))
      .param(ParamDescriptor::service("slow", "Slow"))
      .param(ParamDescriptor::service("left", "Left"))
      .singleton(),
  );

  let barrier = Arc::new(Barrier::new(2));
  let (tx, rx) = mpsc::channel();
  for id in ["Left", "Right"] {
    let container = container.clone();
    let barrier = barrier.clone();
    let tx = tx.clone();
    thread::spawn(move || {
      barrier.wait();
      let cyclic = match container.get(id) {
        Ok(_) => false,
        Err(err) => err
          .find_in_chain(|e| matches!(e, Error::CircularDependency { .. }))
          .is_some(),
      };
      let _ = tx.send((id, cyclic));
    });
  }

  for _ in 0..2 {
    let (id, cyclic) = rx
      .recv_timeout(Duration::from_secs(5))
      .expect("resolution blocked on the other thread");
    assert!(cyclic, "{id} did not report the cycle");
  }
}

#[test]
fn test_separate_containers_are_isolated() {
  let counters = Counters::default();
  let first = container_with_fixtures(&counters);
  let second = ServiceContainer::new();

  first.add_alias("only-here", CLASS_A);

  assert!(first.has("only-here"));
  assert!(!second.has("only-here"));
  assert!(second.get(CLASS_A).unwrap_err().is_not_found());
}
