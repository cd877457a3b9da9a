//! Ids assigned below the first level of a write reach the caller's
//! entity graph, so writing the same graph again creates nothing new.

use crate::common::*;

/// Embedded value holding a reference that creates and reads its target
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Imprint {
    label: String,
    publisher: Option<Publisher>,
}

impl Imprint {
    fn of(label: &str, publisher: &str) -> Self {
        Imprint {
            label: label.to_string(),
            publisher: Some(Publisher::named(publisher)),
        }
    }

    fn publisher_id(&self) -> Option<String> {
        self.publisher.as_ref().and_then(|p| p.id.clone())
    }
}

impl Entity for Imprint {
    fn describe() -> EntityTypeBuilder {
        EntityTypeBuilder::new()
            .embeddable()
            .property("label", FieldType::string())
            .reference(
                "publisher",
                FieldType::entity::<Publisher>(),
                RefOptions::new().cascade(CascadeSpec::CREATE | CascadeSpec::READ),
            )
    }

    fn instantiate() -> Option<Self> {
        Some(Imprint::default())
    }

    fn get_field(&self, name: &str) -> Result<FieldValue, FieldAccessError> {
        match name {
            "label" => Ok(self.label.clone().into()),
            "publisher" => Ok(FieldValue::entity(self.publisher.clone())),
            _ => Err(FieldAccessError::unknown(name)),
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldAccessError> {
        match name {
            "label" => self.label = take::<Option<String>>(name, value)?.unwrap_or_default(),
            "publisher" => self.publisher = take_entity(name, value)?,
            _ => return Err(FieldAccessError::unknown(name)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Catalog {
    id: Option<String>,
    main: Option<Imprint>,
    others: Vec<Imprint>,
}

impl Entity for Catalog {
    fn describe() -> EntityTypeBuilder {
        EntityTypeBuilder::new()
            .collection("catalogs")
            .id("id", IdSpec::generated())
            .embedded("main", FieldType::entity::<Imprint>())
            .embedded_collection("others", FieldType::list(FieldType::entity::<Imprint>()))
    }

    fn instantiate() -> Option<Self> {
        Some(Catalog::default())
    }

    fn get_field(&self, name: &str) -> Result<FieldValue, FieldAccessError> {
        match name {
            "id" => Ok(self.id.clone().into()),
            "main" => Ok(FieldValue::entity(self.main.clone())),
            "others" => Ok(FieldValue::entities(self.others.clone())),
            _ => Err(FieldAccessError::unknown(name)),
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldAccessError> {
        match name {
            "id" => self.id = take(name, value)?,
            "main" => self.main = take_entity(name, value)?,
            "others" => self.others = take_entities(name, value)?,
            _ => return Err(FieldAccessError::unknown(name)),
        }
        Ok(())
    }
}

fn publisher_of(book: &Book) -> Option<&Publisher> {
    book.author.as_ref().and_then(|a| a.publisher.as_ref())
}

#[test]
fn updated_target_passes_back_the_id_of_its_new_child() {
    let t = TestMapper::new();
    let mut author = Author::named("Herbert");
    t.mapper.insert(&mut author).unwrap();

    // Stored author (UPDATE) with an unsaved publisher (CREATE below it)
    let mut book = Book {
        author: Some(Author {
            publisher: Some(Publisher::named("Chilton")),
            ..author.clone()
        }),
        ..Book::titled("Dune")
    };
    t.mapper.insert(&mut book).unwrap();

    let publisher_id = publisher_of(&book).and_then(|p| p.id.clone());
    assert!(publisher_id.is_some());
    assert_eq!(t.mapper.count::<Publisher>().unwrap(), 1);

    t.store.reset_stats();
    t.mapper.save(&mut book).unwrap();
    assert_eq!(t.store.stats().insert, 0);
    assert_eq!(t.mapper.count::<Publisher>().unwrap(), 1);
    assert_eq!(publisher_of(&book).and_then(|p| p.id.clone()), publisher_id);

    let stored: Author = t.mapper.find_by_id(author.id.as_deref().unwrap()).unwrap().unwrap();
    assert_eq!(stored.publisher.and_then(|p| p.id), publisher_id);
}

#[test]
fn embedded_values_pass_back_ids_of_created_references() {
    let t = TestMapper::new();
    let mut catalog = Catalog {
        id: None,
        main: Some(Imprint::of("hardcover", "Ace")),
        others: vec![Imprint::of("paperback", "Orbit"), Imprint::of("audio", "Tor")],
    };
    t.mapper.insert(&mut catalog).unwrap();

    assert!(catalog.id.is_some());
    assert!(catalog.main.as_ref().and_then(Imprint::publisher_id).is_some());
    assert!(catalog.others.iter().all(|i| i.publisher_id().is_some()));
    assert_eq!(t.mapper.count::<Publisher>().unwrap(), 3);

    t.mapper.save(&mut catalog).unwrap();
    let doc = t.mapper.to_document(&mut catalog).unwrap();
    assert_eq!(t.mapper.count::<Publisher>().unwrap(), 3);
    assert_eq!(t.mapper.count::<Catalog>().unwrap(), 1);

    // Re-encoding is stable once every id is in place
    assert_eq!(t.mapper.to_document(&mut catalog).unwrap(), doc);
}

#[test]
fn references_inside_embedded_values_are_read_together() {
    let t = TestMapper::new();
    let mut catalog = Catalog {
        id: None,
        main: Some(Imprint::of("hardcover", "Ace")),
        others: vec![Imprint::of("paperback", "Orbit"), Imprint::of("audio", "Tor")],
    };
    t.mapper.insert(&mut catalog).unwrap();

    t.store.reset_stats();
    let found: Catalog = t
        .mapper
        .find_by_id(catalog.id.as_deref().unwrap())
        .unwrap()
        .unwrap();

    // One call for the catalog, one per embedded field for its publishers
    assert_eq!(t.store.stats().find_by_id, 2);
    assert_eq!(t.store.stats().find_by_ids, 1);
    assert_eq!(found, catalog);
}
