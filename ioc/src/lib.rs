//! # Fibre Autowire
//!
//! A descriptor-driven dependency-injection container with data hydration.
//!
//! Each constructible type is described once by a [`TypeDescriptor`]: its
//! constructor parameters in order, whether it is a singleton, and which
//! aliases it provides. The container then builds object graphs on request,
//! resolving every parameter it can and failing loudly on the ones it cannot.
//!
//! ## Core Concepts
//!
//! - **Identifier**: the string used to request a service, either a type name
//!   or an alias.
//! - **Resolution**: [`ServiceContainer::get`] builds the concrete type behind an
//!   identifier, recursively resolving non-builtin parameters.
//! - **Singletons**: instances of types marked [`TypeDescriptor::singleton`] are
//!   cached per identifier for the container's lifetime.
//! - **Hydration**: [`ServiceContainer::hydrate`] maps JSON records onto
//!   constructor parameters, nesting as deep as the data goes.
//! - **Invocation**: [`ServiceContainer::invoke`] calls a [`Callable`] with
//!   resolved arguments.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_autowire::{ParamDescriptor, ServiceContainer, TypeDescriptor};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct Skill {
//!   title: String,
//! }
//!
//! struct Candidate {
//!   name: Option<String>,
//!   skills: Vec<Arc<Skill>>,
//! }
//!
//! let container = ServiceContainer::new();
//! container.register(
//!   TypeDescriptor::new("Skill", |args| Ok(Skill { title: args.value("title")? }))
//!     .param(ParamDescriptor::builtin("title", "string")),
//! );
//! container.register(
//!   TypeDescriptor::new("Candidate", |args| {
//!     Ok(Candidate {
//!       name: args.optional("name")?,
//!       skills: args.list("skills")?,
//!     })
//!   })
//!   .param(ParamDescriptor::builtin("name", "string").nullable())
//!   .param(ParamDescriptor::builtin("skills", "array").array_of("Skill").with_default(json!([]))),
//! );
//!
//! let candidate = container
//!   .hydrate_one::<Candidate>(
//!     "Candidate",
//!     &json!({ "name": "John Doe", "skills": [{ "title": "Rust" }] }),
//!   )
//!   .unwrap();
//!
//! assert_eq!(candidate.name.as_deref(), Some("John Doe"));
//! assert_eq!(candidate.skills[0].title, "Rust");
//! ```

mod args;
mod builder;
mod cache;
mod config;
mod container;
mod core;
mod descriptor;
mod discovery;
mod error;
mod hydrate;
mod invoke;
mod macros;
mod registry;

pub use args::{Argument, ArgumentError, Arguments, Instance};
pub use builder::ContainerBuilder;
pub use cache::{Cache, CacheValue, JsonFileCache, MemoryCache, ALIASES_KEY, SINGLETONS_KEY};
pub use config::{ContainerConfig, SingletonHydration};
pub use container::ServiceContainer;
pub use descriptor::{Injectable, ParamDescriptor, TypeDescriptor};
pub use discovery::{DirectoryCrawler, StaticDiscovery, TypeDiscovery};
pub use error::{BoxError, Error, Result};
pub use hydrate::Hydrated;
pub use invoke::Callable;
