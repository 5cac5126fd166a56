#![allow(dead_code)]

use fibre_autowire::{Callable, ParamDescriptor, ServiceContainer, TypeDescriptor};
use serde_json::json;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

pub const CLASS_A: &str = "example::ClassA";
pub const CLASS_B: &str = "example::ClassB";
pub const CLASS_C: &str = "example::ClassC";
pub const CLASS_D: &str = "example::ClassD";
pub const INTERFACE_A: &str = "example::InterfaceA";
pub const SKILL: &str = "example::Skill";
pub const CANDIDATE: &str = "example::Candidate";

// --- Test Fixtures ---

/// A singleton that provides `InterfaceA` and `testAlias`.
#[derive(Debug)]
pub struct ClassA {
  pub serial: usize,
}

impl ClassA {
  pub fn func_without_parameters(&self) -> Callable<bool> {
    Callable::new("ClassA::func_without_parameters", |_| Ok(true))
  }

  pub fn func_with_parameters(&self) -> Callable<bool> {
    Callable::new("ClassA::func_with_parameters", |args| {
      let x: i64 = args.value("x")?;
      let _c = args.service::<ClassC>("c")?;
      Ok(x >= 0)
    })
    .param(ParamDescriptor::builtin("x", "int"))
    .param(ParamDescriptor::service("c", CLASS_C))
  }

  pub fn func_with_default_parameter(&self) -> Callable<i64> {
    Callable::new("ClassA::func_with_default_parameter", |args| {
      Ok(args.value::<i64>("x")?)
    })
    .param(ParamDescriptor::builtin("x", "int").with_default(1))
  }
}

#[derive(Debug)]
pub struct ClassB {
  pub a: Arc<ClassA>,
  pub count: i64,
}

pub struct ClassC {
  pub a: Arc<ClassA>,
  pub b: Arc<ClassB>,
}

pub struct ClassD {
  pub x: i64,
}

#[derive(Debug)]
pub struct Skill {
  pub title: String,
}

pub struct Candidate {
  pub name: Option<String>,
  pub age: Option<u32>,
  pub skills: Vec<Arc<Skill>>,
}

/// Construction counters, one per fixture type.
#[derive(Clone, Default)]
pub struct Counters {
  pub a: Arc<AtomicUsize>,
  pub b: Arc<AtomicUsize>,
  pub c: Arc<AtomicUsize>,
  pub d: Arc<AtomicUsize>,
}

impl Counters {
  pub fn a(&self) -> usize {
    self.a.load(Ordering::SeqCst)
  }
  pub fn b(&self) -> usize {
    self.b.load(Ordering::SeqCst)
  }
  pub fn c(&self) -> usize {
    self.c.load(Ordering::SeqCst)
  }
}

pub fn class_a(counters: &Counters) -> TypeDescriptor {
  let counter = counters.a.clone();
  TypeDescriptor::new(CLASS_A, move |_| {
    Ok(ClassA {
      serial: counter.fetch_add(1, Ordering::SeqCst) + 1,
    })
  })
  .singleton()
  .provides(INTERFACE_A)
  .provides("testAlias")
}

pub fn class_b(counters: &Counters) -> TypeDescriptor {
  let counter = counters.b.clone();
  TypeDescriptor::new(CLASS_B, move |args| {
    counter.fetch_add(1, Ordering::SeqCst);
    Ok(ClassB {
      a: args.service("a")?,
      count: args.value("count")?,
    })
  })
  .param(ParamDescriptor::service("a", CLASS_A))
  .param(ParamDescriptor::builtin("count", "int").with_default(2))
}

pub fn class_c(counters: &Counters) -> TypeDescriptor {
  let counter = counters.c.clone();
  TypeDescriptor::new(CLASS_C, move |args| {
    counter.fetch_add(1, Ordering::SeqCst);
    Ok(ClassC {
      a: args.service("a")?,
      b: args.service("b")?,
    })
  })
  .param(ParamDescriptor::service("a", CLASS_A))
  .param(ParamDescriptor::service("b", CLASS_B))
}

pub fn class_d(counters: &Counters) -> TypeDescriptor {
  let counter = counters.d.clone();
  TypeDescriptor::new(CLASS_D, move |args| {
    counter.fetch_add(1, Ordering::SeqCst);
    Ok(ClassD { x: args.value("x")? })
  })
  .param(ParamDescriptor::builtin("x", "int"))
}

pub fn skill() -> TypeDescriptor {
  TypeDescriptor::new(SKILL, |args| Ok(Skill { title: args.value("title")? }))
    .param(ParamDescriptor::builtin("title", "string"))
}

pub fn candidate() -> TypeDescriptor {
  TypeDescriptor::new(CANDIDATE, |args| {
    Ok(Candidate {
      name: args.optional("name")?,
      age: args.optional("age")?,
      skills: args.list("skills")?,
    })
  })
  .param(ParamDescriptor::builtin("name", "string").nullable().with_default(json!(null)))
  .param(ParamDescriptor::builtin("age", "int").nullable().with_default(json!(null)))
  .param(
    ParamDescriptor::builtin("skills", "array")
      .array_of(SKILL)
      .with_default(json!([])),
  )
}

/// A container with every fixture type in its catalog and no aliases.
pub fn container_with_fixtures(counters: &Counters) -> ServiceContainer {
  let container = ServiceContainer::new();
  register_fixtures(&container, counters);
  container
}

pub fn register_fixtures(container: &ServiceContainer, counters: &Counters) {
  container.register(class_a(counters));
  container.register(class_b(counters));
  container.register(class_c(counters));
  container.register(class_d(counters));
  container.register(skill());
  container.register(candidate());
}
