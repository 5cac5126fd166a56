//! Public macros for ergonomic resolution and argument building.

/// Resolves a typed service from a container, panicking if it cannot be built.
///
/// For a non-panicking version, use `container.get_as::<T>(id)` directly.
///
/// # Examples
///
/// ```
/// use fibre_autowire::{resolve, ServiceContainer};
///
/// let container = ServiceContainer::new();
/// container.register_instance("greeting", String::from("hello"));
///
/// let message = resolve!(container, String, "greeting");
/// assert_eq!(*message, "hello");
/// ```
#[macro_export]
macro_rules! resolve {
  ($container:expr, $type:ty, $id:expr) => {
    $container.get_as::<$type>($id).unwrap_or_else(|e| {
      panic!(
        "Failed to resolve required service '{}' as {}: {}",
        $id,
        std::any::type_name::<$type>(),
        e
      )
    })
  };
}

/// Builds an [`Arguments`](crate::Arguments) map from `name => argument` pairs.
///
/// Each argument may be anything convertible into an
/// [`Argument`](crate::Argument): a `serde_json::Value`, an `Instance` or a
/// list of arguments.
///
/// ```
/// use fibre_autowire::{args, Argument};
/// use serde_json::json;
///
/// let overrides = args! {
///   "x" => json!(1),
///   "name" => json!("John"),
///   "logger" => Argument::service(String::from("stdout")),
/// };
/// assert_eq!(overrides.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
  () => {
    $crate::Arguments::new()
  };
  ($($name:expr => $value:expr),+ $(,)?) => {{
    let mut arguments = $crate::Arguments::new();
    $( arguments.insert($name, $value); )+
    arguments
  }};
}
