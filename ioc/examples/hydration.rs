use fibre_autowire::{ParamDescriptor, ServiceContainer, TypeDescriptor};
use serde_json::json;
use std::sync::Arc;

struct Skill {
  title: String,
}

struct Candidate {
  name: String,
  age: Option<u32>,
  skills: Vec<Arc<Skill>>,
}

fn main() {
  let container = ServiceContainer::new();

  container.register(
    TypeDescriptor::new("Skill", |args| Ok(Skill { title: args.value("title")? }))
      .param(ParamDescriptor::builtin("title", "string")),
  );
  container.register(
    TypeDescriptor::new("Candidate", |args| {
      Ok(Candidate {
        name: args.value("name")?,
        age: args.optional("age")?,
        skills: args.list("skills")?,
      })
    })
    .param(ParamDescriptor::builtin("name", "string"))
    .param(ParamDescriptor::builtin("age", "int").nullable())
    .param(ParamDescriptor::builtin("skills", "array").array_of("Skill").with_default(json!([]))),
  );

  // --- A batch of flat records ---
  let skills = container
    .hydrate_many::<Skill>("Skill", &json!([{ "title": "PHP" }, { "title": "Java" }]))
    .unwrap();
  for skill in &skills {
    println!("Skill: {}", skill.title);
  }

  // --- A nested record ---
  let candidate = container
    .hydrate_one::<Candidate>(
      "Candidate",
      &json!({
        "name": "John Doe",
        "age": 25,
        "skills": [{ "title": "PHP" }, { "title": "Rust" }],
      }),
    )
    .unwrap();

  println!(
    "{} ({}) knows {}",
    candidate.name,
    candidate.age.map(|a| a.to_string()).unwrap_or_else(|| "?".into()),
    candidate
      .skills
      .iter()
      .map(|s| s.title.as_str())
      .collect::<Vec<_>>()
      .join(", ")
  );
  assert_eq!(candidate.skills.len(), 2);
}
