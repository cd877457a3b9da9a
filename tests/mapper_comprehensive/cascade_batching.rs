//! Reference cascades: batched fetches, ordering, nested paths, eager
//! reads bounded by depth, and create/update cascades on write.

use std::sync::Arc;

use docmap::TypeHandle;

use crate::common::*;

/// Singly linked chain that eagerly reads and creates its successor
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    id: Option<String>,
    label: String,
    next: Option<Box<Node>>,
}

impl Node {
    fn chain(labels: &[&str]) -> Option<Node> {
        labels.iter().rev().fold(None, |next, label| {
            Some(Node {
                id: None,
                label: label.to_string(),
                next: next.map(Box::new),
            })
        })
    }

    fn labels(&self) -> Vec<String> {
        let mut out = vec![self.label.clone()];
        let mut cursor = self.next.as_deref();
        while let Some(node) = cursor {
            out.push(node.label.clone());
            cursor = node.next.as_deref();
        }
        out
    }
}

impl Entity for Node {
    fn describe() -> EntityTypeBuilder {
        EntityTypeBuilder::new()
            .collection("nodes")
            .id("id", IdSpec::generated())
            .property("label", FieldType::string())
            .reference(
                "next",
                FieldType::entity::<Node>(),
                RefOptions::new().cascade(CascadeSpec::CREATE | CascadeSpec::READ),
            )
    }

    fn instantiate() -> Option<Self> {
        Some(Node::default())
    }

    fn get_field(&self, name: &str) -> Result<FieldValue, FieldAccessError> {
        match name {
            "id" => Ok(self.id.clone().into()),
            "label" => Ok(self.label.clone().into()),
            "next" => Ok(FieldValue::entity(self.next.as_deref().cloned())),
            _ => Err(FieldAccessError::unknown(name)),
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldAccessError> {
        match name {
            "id" => self.id = take(name, value)?,
            "label" => self.label = take::<Option<String>>(name, value)?.unwrap_or_default(),
            "next" => self.next = take_entity::<Node>(name, value)?.map(Box::new),
            _ => return Err(FieldAccessError::unknown(name)),
        }
        Ok(())
    }
}

fn stored_shelf(t: &TestMapper, id: &str, books: &[Book], ranked: &[Book]) -> Shelf {
    let mut shelf = Shelf::new(id);
    shelf.books = books.to_vec();
    shelf.ranked = ranked.to_vec();
    t.mapper.insert(&mut shelf).unwrap();
    t.mapper.find_by_id(id).unwrap().unwrap()
}

// ============================================================================
// Batched fetch
// ============================================================================

#[test]
fn unresolved_collection_decodes_to_stubs() {
    let t = TestMapper::new();
    let books = insert_books(&t.mapper, "b", 3);
    let shelf = stored_shelf(&t, "main", &books, &[]);

    let stubs: Vec<Book> = books.iter().map(stub_of).collect();
    assert_eq!(shelf.books, stubs);
    assert_eq!(shelf.label, "MAIN");
}

#[test]
fn collection_fetch_is_one_batched_lookup() {
    let t = TestMapper::new();
    let books = insert_books(&t.mapper, "b", 5);
    let mut shelf = stored_shelf(&t, "main", &books, &[]);

    t.store.reset_stats();
    t.mapper.fetch_cascade(&mut shelf, &["books"]).unwrap();

    let stats = t.store.stats();
    assert_eq!(stats.find_by_ids, 1);
    assert_eq!(stats.find_by_id, 0);
    assert_eq!(shelf.books, books);
}

#[test]
fn deleted_targets_drop_out_of_the_collection() {
    let t = TestMapper::new();
    let books = insert_books(&t.mapper, "b", 5);
    stored_shelf(&t, "main", &books, &[]);

    assert!(t.mapper.remove(&books[1]).unwrap());
    assert!(t.mapper.remove(&books[3]).unwrap());

    let mut shelf: Shelf = t.mapper.find_by_id("main").unwrap().unwrap();
    assert_eq!(shelf.books.len(), 5);
    t.mapper.fetch_cascade(&mut shelf, &["books"]).unwrap();
    assert_eq!(
        shelf.books,
        vec![books[0].clone(), books[2].clone(), books[4].clone()]
    );
}

#[test]
fn declared_sort_orders_the_fetched_collection() {
    let t = TestMapper::new();
    let books = insert_books(&t.mapper, "r", 5);
    let reversed: Vec<Book> = books.iter().rev().cloned().collect();
    let mut shelf = stored_shelf(&t, "ranked", &[], &reversed);

    t.mapper.fetch_cascade(&mut shelf, &["ranked"]).unwrap();
    let titles: Vec<&str> = shelf.ranked.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["r-0", "r-1", "r-2", "r-3", "r-4"]);
}

#[test]
fn fetching_many_owners_shares_one_lookup() {
    let t = TestMapper::new();
    let books = insert_books(&t.mapper, "b", 6);
    let mut shelves = vec![
        stored_shelf(&t, "left", &books[..3], &[]),
        stored_shelf(&t, "right", &books[2..], &[]),
    ];

    t.store.reset_stats();
    t.mapper.fetch_cascade_all(&mut shelves, &["books"]).unwrap();

    assert_eq!(t.store.stats().lookups(), 1);
    assert_eq!(shelves[0].books, books[..3].to_vec());
    assert_eq!(shelves[1].books, books[2..].to_vec());
}

#[test]
fn nested_path_resolves_each_level() {
    let t = TestMapper::new();
    let mut book = Book {
        author: Some(Author {
            publisher: Some(Publisher::named("Ace")),
            ..Author::named("Herbert")
        }),
        ..Book::titled("Dune")
    };
    t.mapper.insert(&mut book).unwrap();

    let mut found: Book = t.mapper.find_by_id(book.id.as_deref().unwrap()).unwrap().unwrap();
    let publisher = found.author.as_ref().and_then(|a| a.publisher.clone()).unwrap();
    assert!(publisher.id.is_some());
    assert_eq!(publisher.name, "");

    t.store.reset_stats();
    t.mapper.fetch_cascade(&mut found, &["author.publisher"]).unwrap();
    assert_eq!(t.store.stats().lookups(), 2);

    let author = found.author.unwrap();
    assert_eq!(author.name, "Herbert");
    assert_eq!(author.publisher.unwrap().name, "Ace");
}

#[test]
fn invalid_fetch_paths_are_rejected() {
    let t = TestMapper::new();
    let mut book = Book {
        author: Some(Author::named("Herbert")),
        ..Book::titled("Dune")
    };
    t.mapper.insert(&mut book).unwrap();

    let err = t.mapper.fetch_cascade(&mut book, &["title"]).unwrap_err();
    assert!(matches!(err, MapperError::CascadePath { .. }));

    let err = t.mapper.fetch_cascade(&mut book, &["missing"]).unwrap_err();
    assert!(matches!(err, MapperError::FieldNotFound { .. }));

    let err = t.mapper.fetch_cascade(&mut book, &["author.name"]).unwrap_err();
    assert!(matches!(err, MapperError::CascadePath { .. }));
}

// ============================================================================
// Eager reads
// ============================================================================

#[test]
fn read_cascade_resolves_unless_skipped() {
    let t = TestMapper::new();
    let mut book = Book {
        author: Some(Author::named("Herbert")),
        ..Book::titled("Dune")
    };
    t.mapper.insert(&mut book).unwrap();
    let doc = t.mapper.to_document(&mut book).unwrap();

    let eager: Book = t.mapper.from_document(&doc).unwrap();
    assert_eq!(eager.author.as_ref().unwrap().name, "Herbert");

    let lazy = t
        .mapper
        .from_document_with(TypeHandle::of::<Book>(), &doc, true)
        .unwrap();
    let lazy = docmap::downcast_entity::<Book>(lazy).unwrap();
    assert_eq!(lazy.author.as_ref().unwrap().name, "");
    assert_eq!(lazy.author.unwrap().id, book.author.unwrap().id);
}

#[test]
fn find_by_ids_reads_all_authors_in_one_lookup() {
    let t = TestMapper::new();
    let mut ids = Vec::new();
    for i in 0..4 {
        let mut book = Book {
            author: Some(Author::named(&format!("author-{i}"))),
            editor: None,
            ..Book::titled(&format!("b-{i}"))
        };
        t.mapper.insert(&mut book).unwrap();
        ids.push(book.id.unwrap());
    }
    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();

    t.store.reset_stats();
    let books: Vec<Book> = t.mapper.find_by_ids(&ids).unwrap();

    // One call for the books, one for every author they point at
    let stats = t.store.stats();
    assert_eq!(stats.find_by_ids, 2);
    assert_eq!(stats.find_by_id, 0);
    let names: Vec<&str> = books
        .iter()
        .map(|b| b.author.as_ref().unwrap().name.as_str())
        .collect();
    assert_eq!(names, ["author-0", "author-1", "author-2", "author-3"]);
}

#[test]
fn eager_reads_batch_each_level_across_owners() {
    let t = TestMapper::new();
    let mut heads = Vec::new();
    for prefix in ["x", "y", "z"] {
        let labels: Vec<String> = (0..3).map(|i| format!("{prefix}{i}")).collect();
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
        let mut head = Node::chain(&labels).unwrap();
        t.mapper.insert(&mut head).unwrap();
        heads.push(head.id.unwrap());
    }
    let ids: Vec<&str> = heads.iter().map(String::as_str).collect();

    t.store.reset_stats();
    let nodes: Vec<Node> = t.mapper.find_by_ids(&ids).unwrap();

    // Heads, then second nodes, then third nodes
    assert_eq!(t.store.stats().lookups(), 3);
    let mut chains: Vec<Vec<String>> = nodes.iter().map(Node::labels).collect();
    chains.sort();
    assert_eq!(
        chains,
        [["x0", "x1", "x2"], ["y0", "y1", "y2"], ["z0", "z1", "z2"]]
    );
}

#[test]
fn read_cascade_stops_at_the_depth_bound() {
    let t = TestMapper::new();
    let mut head = Node::chain(&["a", "b", "c"]).unwrap();
    t.mapper.insert(&mut head).unwrap();
    assert_eq!(t.mapper.count::<Node>().unwrap(), 3);

    let id = head.id.clone().unwrap();
    let full: Node = t.mapper.find_by_id(&id).unwrap().unwrap();
    assert_eq!(full.labels(), ["a", "b", "c"]);

    let shallow = EntityMapper::with_config(
        t.store.clone(),
        MapperConfig {
            max_cascade_depth: 1,
            ..MapperConfig::default()
        },
    )
    .unwrap();
    let cut: Node = shallow.find_by_id(&id).unwrap().unwrap();
    assert_eq!(cut.labels(), ["a", "b", ""]);
    assert!(cut.next.unwrap().next.unwrap().id.is_some());

    let mut again: Node = shallow.find_by_id(&id).unwrap().unwrap();
    let err = shallow.fetch_cascade(&mut again, &["next.next"]).unwrap_err();
    assert!(matches!(err, MapperError::DepthExceeded { limit: 1, .. }));
}

// ============================================================================
// Write cascades
// ============================================================================

#[test]
fn create_cascade_inserts_new_targets() {
    let t = TestMapper::new();
    let mut author = Author {
        publisher: Some(Publisher::named("Ace")),
        ..Author::named("Herbert")
    };
    t.mapper.insert(&mut author).unwrap();

    let publisher = author.publisher.as_ref().unwrap();
    assert!(publisher.id.is_some());
    assert_eq!(t.mapper.count::<Publisher>().unwrap(), 1);

    // Already-saved targets are not written again without UPDATE
    t.store.reset_stats();
    author.publisher.as_mut().unwrap().name = "Changed".into();
    t.mapper.save(&mut author).unwrap();
    assert_eq!(t.store.stats().save, 1);
    let stored: Publisher = t
        .mapper
        .find_by_id(author.publisher.unwrap().id.as_deref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, "Ace");
}

#[test]
fn update_cascade_rewrites_saved_targets() {
    let t = TestMapper::new();
    let mut book = Book {
        author: Some(Author::named("Herbert")),
        ..Book::titled("Dune")
    };
    t.mapper.insert(&mut book).unwrap();

    book.author.as_mut().unwrap().name = "Frank Herbert".into();
    t.store.reset_stats();
    t.mapper.save(&mut book).unwrap();
    assert_eq!(t.store.stats().save, 2);

    let author_id = book.author.as_ref().unwrap().id.clone().unwrap();
    let stored: Author = t.mapper.find_by_id(&author_id).unwrap().unwrap();
    assert_eq!(stored.name, "Frank Herbert");
}

#[test]
fn save_writes_the_owner_and_its_updated_target() {
    let store = Arc::new(MemoryStore::new());
    let mapper = EntityMapper::new(store.clone());

    let mut author = Author::named("Herbert");
    mapper.insert(&mut author).unwrap();
    let mut book = Book {
        author: Some(author.clone()),
        editor: Some(author),
        ..Book::titled("Dune")
    };
    mapper.insert(&mut book).unwrap();

    store.reset_stats();
    mapper.save(&mut book).unwrap();
    // The editor field has no cascade, so only the book and its author
    assert_eq!(store.stats().save, 2);
    assert_eq!(store.stats().insert, 0);
}
