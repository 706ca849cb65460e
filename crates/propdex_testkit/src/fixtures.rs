//! Fixture entities and their metadata.
//!
//! Every fixture comes with a metadata constructor so tests can register
//! exactly the entities they need.

use propdex_core::{
    EmbeddableMetadata, EntityMetadata, EnumLabel, IndexResult, IndexType, MetadataRegistry,
    PropertyIndex,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Class name of [`Person`].
pub const PERSON_CLASS: &str = "org.propdex.fixtures.Person";

/// Class name of [`Employe`].
pub const EMPLOYE_CLASS: &str = "org.propdex.fixtures.Employe";

/// Class name of [`SingularEntityEmbeddable`].
pub const SINGULAR_CLASS: &str = "org.propdex.fixtures.SingularEntityEmbeddable";

/// Day of the week, indexed by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    /// All days, Monday first.
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];
}

impl EnumLabel for Day {
    fn label(&self) -> &'static str {
        match self {
            Day::Monday => "MONDAY",
            Day::Tuesday => "TUESDAY",
            Day::Wednesday => "WEDNESDAY",
            Day::Thursday => "THURSDAY",
            Day::Friday => "FRIDAY",
            Day::Saturday => "SATURDAY",
            Day::Sunday => "SUNDAY",
        }
    }
}

/// A person with an age and a favourite day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Identifier.
    pub person_id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub person_name: Option<String>,
    /// Age in years.
    pub age: Option<i32>,
    /// Favourite day.
    #[serde(default)]
    pub day: Option<Day>,
}

impl Person {
    /// Creates a person with an identifier and an age.
    pub fn new(id: &str, age: i32) -> Self {
        Self {
            person_id: Some(id.to_string()),
            person_name: None,
            age: Some(age),
            day: None,
        }
    }

    /// Sets the name.
    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.person_name = Some(name.to_string());
        self
    }

    /// Sets the day.
    #[must_use]
    pub fn on(mut self, day: Day) -> Self {
        self.day = Some(day);
        self
    }
}

/// Metadata for [`Person`]: `PERSON_ID`, `PERSON_NAME`, `AGE`, `DAY`.
pub fn person_metadata() -> EntityMetadata<Person> {
    EntityMetadata::builder(PERSON_CLASS)
        .id("personId", "PERSON_ID", |p: &Person| p.person_id.clone())
        .property(
            PropertyIndex::new("personName", "PERSON_NAME", IndexType::None),
            |p: &Person| p.person_name.clone(),
        )
        .property(
            PropertyIndex::new("age", "AGE", IndexType::Asc),
            |p: &Person| p.age,
        )
        .enumerated(
            PropertyIndex::new("day", "DAY", IndexType::None),
            |p: &Person| p.day,
        )
        .build()
        .expect("person metadata")
}

/// An employee; used to exercise property descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employe {
    /// Identifier.
    pub emp_id: String,
    /// Name.
    pub emp_name: String,
}

/// The descriptor of `Employe.empName` as declared on the entity.
pub fn emp_name_index(index_type: &str, boost: f32) -> IndexResult<PropertyIndex> {
    PropertyIndex::parse("empName", "EMP_NAME", index_type)?.with_boost(boost)
}

/// Metadata for [`Employe`] with a boosted name.
pub fn employe_metadata() -> EntityMetadata<Employe> {
    EntityMetadata::builder(EMPLOYE_CLASS)
        .id("empId", "EMP_ID", |e: &Employe| e.emp_id.clone())
        .property(
            emp_name_index("ASC", 1.2).expect("employe descriptor"),
            |e: &Employe| e.emp_name.clone(),
        )
        .build()
        .expect("employe metadata")
}

/// First embeddable: one text field stored as `embeddedField`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddableEntity {
    /// Indexed as `embeddedField`.
    pub field: Option<String>,
}

/// Second embeddable: a float and a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddableEntityTwo {
    /// Indexed as `field`.
    pub field: Option<f32>,
    /// Indexed as `name`.
    pub name: Option<String>,
}

/// An entity owning one of each embeddable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingularEntityEmbeddable {
    /// Identifier.
    pub key: i32,
    /// Indexed as `name`.
    pub name: Option<String>,
    /// Indexed as `field`.
    pub field: Option<String>,
    /// First embedded object.
    pub embeddable_entity: Option<EmbeddableEntity>,
    /// Second embedded object.
    pub embeddable_entity_two: Option<EmbeddableEntityTwo>,
}

impl SingularEntityEmbeddable {
    /// The entity used by the embeddable scenarios: key 1 with both
    /// embeddables set.
    pub fn sample() -> Self {
        Self {
            key: 1,
            name: Some("entity".to_string()),
            field: Some("name".to_string()),
            embeddable_entity: Some(EmbeddableEntity {
                field: Some("embeddedField1".to_string()),
            }),
            embeddable_entity_two: Some(EmbeddableEntityTwo {
                field: Some(1.0),
                name: Some("name".to_string()),
            }),
        }
    }
}

fn embeddable_entity_metadata() -> EmbeddableMetadata<EmbeddableEntity> {
    EmbeddableMetadata::builder("EmbeddableEntity")
        .property(
            PropertyIndex::named("embeddedField"),
            |e: &EmbeddableEntity| e.field.clone(),
        )
        .build()
        .expect("embeddable metadata")
}

fn embeddable_entity_two_metadata() -> EmbeddableMetadata<EmbeddableEntityTwo> {
    EmbeddableMetadata::builder("EmbeddableEntityTwo")
        .property(PropertyIndex::named("field"), |e: &EmbeddableEntityTwo| e.field)
        .property(PropertyIndex::named("name"), |e: &EmbeddableEntityTwo| {
            e.name.clone()
        })
        .build()
        .expect("embeddable metadata")
}

/// Metadata for [`SingularEntityEmbeddable`].
///
/// The owner and the second embeddable both declare `name` and `field`,
/// so mapped documents carry two values for each.
pub fn singular_metadata() -> EntityMetadata<SingularEntityEmbeddable> {
    EntityMetadata::builder(SINGULAR_CLASS)
        .id("key", "key", |s: &SingularEntityEmbeddable| s.key)
        .property(PropertyIndex::named("name"), |s: &SingularEntityEmbeddable| {
            s.name.clone()
        })
        .property(PropertyIndex::named("field"), |s: &SingularEntityEmbeddable| {
            s.field.clone()
        })
        .embedded(
            "embeddableEntity",
            embeddable_entity_metadata(),
            |s: &SingularEntityEmbeddable| s.embeddable_entity.as_ref(),
        )
        .embedded(
            "embeddableEntityTwo",
            embeddable_entity_two_metadata(),
            |s: &SingularEntityEmbeddable| s.embeddable_entity_two.as_ref(),
        )
        .build()
        .expect("singular metadata")
}

/// Registered metadata for every fixture.
pub struct Fixtures {
    /// The registry holding all fixtures.
    pub registry: Arc<MetadataRegistry>,
    /// [`Person`] metadata.
    pub person: Arc<EntityMetadata<Person>>,
    /// [`Employe`] metadata.
    pub employe: Arc<EntityMetadata<Employe>>,
    /// [`SingularEntityEmbeddable`] metadata.
    pub singular: Arc<EntityMetadata<SingularEntityEmbeddable>>,
}

impl Fixtures {
    /// Registers every fixture entity.
    pub fn new() -> Self {
        let mut registry = MetadataRegistry::new();
        let person = registry.register(person_metadata()).expect("register person");
        let employe = registry
            .register(employe_metadata())
            .expect("register employe");
        let singular = registry
            .register(singular_metadata())
            .expect("register singular");
        Self {
            registry: Arc::new(registry),
            person,
            employe,
            singular,
        }
    }
}

impl Default for Fixtures {
    fn default() -> Self {
        Self::new()
    }
}

const PEOPLE_JSON: &str = r#"[
    {"person_id": "p1", "person_name": "alice", "age": 32, "day": "TUESDAY"},
    {"person_id": "p2", "person_name": "bob", "age": 35, "day": "FRIDAY"},
    {"person_id": "p3", "person_name": "carol ann", "age": 32, "day": "SUNDAY"},
    {"person_id": "p4", "person_name": "dave", "age": 41},
    {"person_id": "p5", "age": 27, "day": "TUESDAY"}
]"#;

/// A small population of people shared by the scenario tests.
pub fn sample_people() -> Vec<Person> {
    serde_json::from_str(PEOPLE_JSON).expect("sample people")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_population_parses() {
        let people = sample_people();
        assert_eq!(people.len(), 5);
        assert_eq!(people[0].day, Some(Day::Tuesday));
        assert_eq!(people[3].day, None);
        assert_eq!(people[4].person_name, None);
    }

    #[test]
    fn fixtures_register_once() {
        let fixtures = Fixtures::new();
        assert_eq!(fixtures.registry.len(), 3);
        assert!(fixtures.registry.contains(SINGULAR_CLASS));
        assert_eq!(fixtures.person.simple_name(), "Person");
    }
}
