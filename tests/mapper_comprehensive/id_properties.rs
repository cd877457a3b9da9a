//! Identifier strategies: parsing is idempotent, encoding assigns an id
//! once, AutoIncrement counts up from its start or from the stored maximum.

use docmap::{Document, DocumentStore, IdKind, IdStrategies, NativeId, ObjectId, Value, ID_KEY};
use proptest::prelude::*;

use crate::common::*;

/// AutoIncrement entity starting at 100
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ticket {
    id: Option<String>,
}

impl Entity for Ticket {
    fn describe() -> EntityTypeBuilder {
        EntityTypeBuilder::new()
            .collection("tickets")
            .id("id", IdSpec::auto_increment_from(100))
    }

    fn instantiate() -> Option<Self> {
        Some(Ticket::default())
    }

    fn get_field(&self, name: &str) -> Result<FieldValue, FieldAccessError> {
        match name {
            "id" => Ok(self.id.clone().into()),
            _ => Err(FieldAccessError::unknown(name)),
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldAccessError> {
        match name {
            "id" => self.id = take(name, value)?,
            _ => return Err(FieldAccessError::unknown(name)),
        }
        Ok(())
    }
}

fn reparse(strategies: &IdStrategies, spec: &IdSpec, raw: &str) -> (NativeId, NativeId) {
    let once = strategies.parse(spec, "T", raw).unwrap();
    let twice = strategies.parse(spec, "T", &once.to_string()).unwrap();
    (once, twice)
}

proptest! {
    #[test]
    fn generated_parse_is_idempotent(bytes in any::<[u8; 12]>()) {
        let raw = hex::encode(bytes);
        let (once, twice) = reparse(&IdStrategies::new(), &IdSpec::generated(), &raw);
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.to_string(), raw);
    }

    #[test]
    fn auto_increment_parse_is_idempotent(n in any::<i64>()) {
        let (once, twice) = reparse(&IdStrategies::new(), &IdSpec::auto_increment(), &n.to_string());
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once, NativeId::Long(n));
    }

    #[test]
    fn user_defined_parse_is_idempotent(raw in "[A-Za-z0-9_-]{1,32}") {
        let (once, twice) = reparse(&IdStrategies::new(), &IdSpec::user_defined(), &raw);
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once, NativeId::String(raw));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn auto_increment_follows_stored_max(max in 0i64..1_000_000, n in 1usize..6) {
        let t = TestMapper::new();
        t.store
            .insert("books", Document::new().with(ID_KEY, Value::Int(max)))
            .unwrap();

        let books = insert_books(&t.mapper, "b", n);
        let ids: Vec<String> = books.iter().map(|b| b.id.clone().unwrap()).collect();
        let expected: Vec<String> = (1..=n as i64).map(|k| (max + k).to_string()).collect();
        prop_assert_eq!(ids, expected);
    }
}

// ============================================================================
// Encoding twice yields the same id
// ============================================================================

#[test]
fn generated_id_is_assigned_on_first_encode_only() {
    let t = TestMapper::new();
    let mut pet = Pet::named("Rex");

    let first = t.mapper.to_document(&mut pet).unwrap();
    let assigned = pet.id.clone().unwrap();
    let second = t.mapper.to_document(&mut pet).unwrap();

    assert_eq!(pet.id.as_deref(), Some(assigned.as_str()));
    assert_eq!(first.get(ID_KEY), second.get(ID_KEY));
    assert!(matches!(first.get(ID_KEY), Some(Value::ObjectId(oid)) if oid.to_string() == assigned));
    assert_eq!(t.store.stats().insert, 0);
}

#[test]
fn auto_increment_id_is_assigned_on_first_encode_only() {
    let t = TestMapper::new();
    let mut book = Book::titled("Dune");

    let first = t.mapper.to_document(&mut book).unwrap();
    let second = t.mapper.to_document(&mut book).unwrap();

    assert_eq!(book.id.as_deref(), Some("1"));
    assert_eq!(first.get(ID_KEY), Some(&Value::Int(1)));
    assert_eq!(second.get(ID_KEY), Some(&Value::Int(1)));
    // The stored maximum is consulted only while the id is empty
    assert_eq!(t.store.stats().max_id, 1);
}

#[test]
fn user_defined_id_is_never_replaced() {
    let t = TestMapper::new();
    let mut shelf = Shelf::new("attic");

    let first = t.mapper.to_document(&mut shelf).unwrap();
    let second = t.mapper.to_document(&mut shelf).unwrap();

    assert_eq!(shelf.id.as_deref(), Some("attic"));
    assert_eq!(first.get(ID_KEY), Some(&Value::from("attic")));
    assert_eq!(first, second);
}

#[test]
fn insert_then_save_keeps_one_document_per_entity() {
    let t = TestMapper::new();
    let mut book = Book {
        author: Some(Author {
            publisher: Some(Publisher::named("Ace")),
            ..Author::named("Herbert")
        }),
        ..Book::titled("Dune")
    };
    t.mapper.insert(&mut book).unwrap();
    let ids = (
        book.id.clone(),
        book.author.as_ref().and_then(|a| a.id.clone()),
        book.author.as_ref().and_then(|a| a.publisher.as_ref()).and_then(|p| p.id.clone()),
    );
    assert!(ids.0.is_some() && ids.1.is_some() && ids.2.is_some());

    t.mapper.save(&mut book).unwrap();
    t.mapper.save(&mut book).unwrap();

    assert_eq!(t.mapper.count::<Book>().unwrap(), 1);
    assert_eq!(t.mapper.count::<Author>().unwrap(), 1);
    assert_eq!(t.mapper.count::<Publisher>().unwrap(), 1);
    assert_eq!(book.id, ids.0);
    assert_eq!(book.author.as_ref().and_then(|a| a.id.clone()), ids.1);
}

// ============================================================================
// AutoIncrement
// ============================================================================

#[test]
fn auto_increment_starts_at_one_by_default() {
    let t = TestMapper::new();
    let books = insert_books(&t.mapper, "b", 3);
    let ids: Vec<_> = books.iter().map(|b| b.id.as_deref().unwrap()).collect();
    assert_eq!(ids, ["1", "2", "3"]);
    assert_eq!(t.store.stats().max_id, 3);
}

#[test]
fn auto_increment_honors_declared_start() {
    let t = TestMapper::new();
    let mut first = Ticket::default();
    let mut second = Ticket::default();
    assert_eq!(t.mapper.insert(&mut first).unwrap(), NativeId::Long(100));
    assert_eq!(t.mapper.insert(&mut second).unwrap(), NativeId::Long(101));
}

#[test]
fn configured_default_start_applies_to_undeclared_fields() {
    let t = TestMapper::with_config(MapperConfig {
        default_auto_increment_start: 500,
        ..MapperConfig::default()
    });
    let books = insert_books(&t.mapper, "b", 1);
    assert_eq!(books[0].id.as_deref(), Some("500"));

    // A declared start still wins
    let mut ticket = Ticket::default();
    assert_eq!(t.mapper.insert(&mut ticket).unwrap(), NativeId::Long(100));
}

#[test]
fn generated_ids_are_assigned_and_written_back() {
    let t = TestMapper::new();
    let mut pet = Pet::named("Rex");
    let id = t.mapper.insert(&mut pet).unwrap();

    let hex = pet.id.clone().unwrap();
    assert!(ObjectId::is_valid(&hex));
    assert_eq!(id.to_string(), hex);
    assert!(matches!(id, NativeId::ObjectId(_)));
    assert!(t.store.contains("pets", &id));
}

#[test]
fn existing_id_is_kept_on_save() {
    let t = TestMapper::new();
    let mut pet = Pet::named("Rex");
    t.mapper.insert(&mut pet).unwrap();
    let before = pet.id.clone();

    pet.name = "Max".into();
    t.mapper.save(&mut pet).unwrap();
    assert_eq!(pet.id, before);
    assert_eq!(t.mapper.count::<Pet>().unwrap(), 1);

    let stored: Pet = t.mapper.find_by_id(before.as_deref().unwrap()).unwrap().unwrap();
    assert_eq!(stored.name, "Max");
}

#[test]
fn user_defined_id_is_required() {
    let t = TestMapper::new();
    let mut shelf = Shelf {
        id: None,
        ..Shelf::default()
    };
    let err = t.mapper.insert(&mut shelf).unwrap_err();
    assert!(matches!(err, MapperError::MissingUserDefinedId { .. }));
    assert_eq!(t.store.stats().insert, 0);

    let mut shelf = Shelf::new("attic");
    assert_eq!(
        t.mapper.insert(&mut shelf).unwrap(),
        NativeId::String("attic".into())
    );
}

#[test]
fn malformed_ids_are_rejected() {
    let strategies = IdStrategies::new();
    assert_eq!(strategies.get(IdKind::Generated).kind(), IdKind::Generated);

    for (spec, raw) in [
        (IdSpec::generated(), "not-hex"),
        (IdSpec::auto_increment(), "twelve"),
        (IdSpec::user_defined(), ""),
    ] {
        let err = strategies.parse(&spec, "T", raw).unwrap_err();
        assert!(matches!(err, MapperError::InvalidIdFormat { .. }), "{raw:?}");
    }

    let t = TestMapper::new();
    let err = t.mapper.find_by_id::<Book>("twelve").unwrap_err();
    assert!(matches!(err, MapperError::InvalidIdFormat { .. }));
}
