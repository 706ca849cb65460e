//! Property-based test generators using proptest.

use crate::fixtures::{Day, Person};
use proptest::prelude::*;

/// Strategy for identifiers such as `p17`.
pub fn person_id_strategy() -> impl Strategy<Value = String> {
    (0u32..10_000).prop_map(|n| format!("p{n}"))
}

/// Strategy for a favourite day.
pub fn day_strategy() -> impl Strategy<Value = Day> {
    prop::sample::select(Day::ALL.to_vec())
}

/// Strategy for lowercase single-word names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{2,12}").expect("Invalid regex")
}

/// Strategy for people with an identifier; the other attributes may be
/// absent.
pub fn person_strategy() -> impl Strategy<Value = Person> {
    (
        person_id_strategy(),
        prop::option::of(name_strategy()),
        prop::option::of(-120i32..120),
        prop::option::of(day_strategy()),
    )
        .prop_map(|(id, name, age, day)| Person {
            person_id: Some(id),
            person_name: name,
            age,
            day,
        })
}

/// Strategy for people with distinct identifiers.
pub fn distinct_people_strategy(max: usize) -> impl Strategy<Value = Vec<Person>> {
    prop::collection::vec(person_strategy(), 1..=max).prop_map(|people| {
        people
            .into_iter()
            .enumerate()
            .map(|(i, mut p)| {
                p.person_id = Some(format!("p{i}"));
                p
            })
            .collect()
    })
}

/// One mutation in a person's lifecycle.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Write the person.
    Write(Person),
    /// Update to the given age.
    Update(i32),
    /// Remove the person.
    Remove,
}

/// Strategy for a sequence of mutations applied to one identifier.
pub fn mutation_strategy(len: usize) -> impl Strategy<Value = Vec<Mutation>> {
    let mutation = prop_oneof![
        (-120i32..120).prop_map(|age| Mutation::Write(Person::new("p1", age))),
        (-120i32..120).prop_map(Mutation::Update),
        Just(Mutation::Remove),
    ];
    prop::collection::vec(mutation, 1..=len)
}
