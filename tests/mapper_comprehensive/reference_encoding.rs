//! Reference wire forms: reduced references carry the bare native id, full
//! references a `DbRef`; reading the other form is an error.

use docmap::{DbRef, Document, NativeId, ObjectId, Value, ID_KEY};

use crate::common::*;

fn saved_author(t: &TestMapper, name: &str) -> Author {
    let mut author = Author::named(name);
    t.mapper.insert(&mut author).unwrap();
    author
}

fn native(author: &Author) -> NativeId {
    NativeId::ObjectId(ObjectId::parse_str(author.id.as_deref().unwrap()).unwrap())
}

#[test]
fn reduced_reference_is_the_native_id() {
    let t = TestMapper::new();
    let author = saved_author(&t, "Le Guin");
    let mut book = Book {
        author: Some(author.clone()),
        ..Book::titled("Earthsea")
    };

    let doc = t.mapper.to_document(&mut book).unwrap();
    assert_eq!(doc.get("author"), Some(&native(&author).to_value()));
    assert!(matches!(doc.get("author"), Some(Value::ObjectId(_))));
}

#[test]
fn full_reference_carries_the_collection() {
    let t = TestMapper::new();
    let editor = saved_author(&t, "Campbell");
    let mut book = Book {
        editor: Some(editor.clone()),
        ..Book::titled("Foundation")
    };

    let doc = t.mapper.to_document(&mut book).unwrap();
    assert_eq!(
        doc.get("editor"),
        Some(&Value::Ref(DbRef::new("authors", native(&editor))))
    );
}

#[test]
fn absent_reference_is_not_written() {
    let t = TestMapper::new();
    let mut book = Book::titled("Alone");
    let doc = t.mapper.to_document(&mut book).unwrap();
    assert!(doc.get("author").is_none());
    assert!(doc.get("editor").is_none());
}

#[test]
fn references_decode_back_to_ids() {
    let t = TestMapper::new();
    let author = saved_author(&t, "Herbert");
    let editor = saved_author(&t, "Campbell");
    let mut book = Book {
        author: Some(author.clone()),
        editor: Some(editor.clone()),
        ..Book::titled("Dune")
    };
    t.mapper.insert(&mut book).unwrap();

    let found: Book = t.mapper.find_by_id(book.id.as_deref().unwrap()).unwrap().unwrap();
    // author cascades reads, editor stays a stub
    assert_eq!(found.author, Some(author));
    assert_eq!(
        found.editor,
        Some(Author {
            id: editor.id.clone(),
            ..Author::default()
        })
    );
}

#[test]
fn full_reference_in_reduced_field_is_rejected() {
    let t = TestMapper::new();
    let author = saved_author(&t, "Asimov");
    let doc = Document::new()
        .with(ID_KEY, Value::Int(1))
        .with("title", "Robots")
        .with("author", Value::Ref(DbRef::new("authors", native(&author))));

    let err = t.mapper.from_document::<Book>(&doc).unwrap_err();
    match err {
        MapperError::ReferenceMismatch {
            field, expected, ..
        } => {
            assert_eq!(field, "author");
            assert_eq!(expected, "reduced reference");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn bare_id_in_full_field_is_rejected() {
    let t = TestMapper::new();
    let editor = saved_author(&t, "Campbell");
    let doc = Document::new()
        .with(ID_KEY, Value::Int(1))
        .with("editor", native(&editor).to_value());

    let err = t.mapper.from_document::<Book>(&doc).unwrap_err();
    assert!(matches!(
        err,
        MapperError::ReferenceMismatch {
            expected: "full reference",
            ..
        }
    ));
}

#[test]
fn resolver_converts_both_forms() {
    let t = TestMapper::new();
    let ty = t.mapper.register::<Author>().unwrap();
    let id = ObjectId::new().to_hex();
    let resolver = t.mapper.resolver();

    let reduced = resolver.to_reference(&ty, &id, true).unwrap();
    let full = resolver.to_reference(&ty, &id, false).unwrap();
    assert_eq!(resolver.from_reference(&reduced, true).unwrap(), id);
    assert_eq!(resolver.from_reference(&full, false).unwrap(), id);

    let mismatch = resolver.from_reference(&full, true).unwrap_err();
    assert_eq!(mismatch.expected, "reduced reference");
    assert_eq!(mismatch.found, full.type_name());
}

#[test]
fn reference_to_unsaved_entity_without_create_fails() {
    let t = TestMapper::new();
    let mut book = Book {
        editor: Some(Author::named("Nobody")),
        ..Book::titled("Orphan")
    };
    let err = t.mapper.insert(&mut book).unwrap_err();
    assert!(matches!(err, MapperError::UnsavedEntity { .. }));
    assert_eq!(t.mapper.count::<Author>().unwrap(), 0);
}

#[test]
fn skipping_cascade_persist_needs_saved_targets() {
    let t = TestMapper::new();
    let mut book = Book {
        author: Some(Author::named("Pending")),
        ..Book::titled("Draft")
    };
    t.mapper.register::<Book>().unwrap();
    let err = t.mapper.to_document_with(&mut book, true).unwrap_err();
    assert!(matches!(err, MapperError::UnsavedEntity { .. }));
    assert_eq!(t.store.stats().insert, 0);
}
