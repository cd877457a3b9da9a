//! Post-commit listeners and `docmap.toml` configuration.

use std::sync::Arc;

use docmap::{EntityListener, EntityType, HookEvent, MapperResult, CONFIG_FILE_NAME};
use parking_lot::Mutex;
use tempfile::TempDir;

use crate::common::*;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<(HookEvent, String)>>,
}

impl Recorder {
    fn take(&self) -> Vec<(HookEvent, String)> {
        std::mem::take(&mut *self.events.lock())
    }

    fn push(&self, event: HookEvent, ty: &EntityType) -> MapperResult<()> {
        self.events.lock().push((event, ty.type_name().to_string()));
        Ok(())
    }
}

impl EntityListener for Recorder {
    fn on_insert(&self, ty: &EntityType, _entity: &dyn Entity) -> MapperResult<()> {
        self.push(HookEvent::Insert, ty)
    }

    fn on_update(&self, ty: &EntityType, _entity: &dyn Entity) -> MapperResult<()> {
        self.push(HookEvent::Update, ty)
    }

    fn on_remove(&self, ty: &EntityType, _entity: &dyn Entity) -> MapperResult<()> {
        self.push(HookEvent::Remove, ty)
    }
}

struct Refusing;

impl EntityListener for Refusing {
    fn on_insert(&self, ty: &EntityType, _entity: &dyn Entity) -> MapperResult<()> {
        Err(MapperError::Config(format!("refusing {}", ty.type_name())))
    }
}

fn recorded(events: &[(HookEvent, &str)]) -> Vec<(HookEvent, String)> {
    events.iter().map(|(e, n)| (*e, n.to_string())).collect()
}

// ============================================================================
// Hooks
// ============================================================================

#[test]
fn listeners_see_every_committed_write() {
    let t = TestMapper::new();
    let recorder = Arc::new(Recorder::default());
    t.mapper.add_listener(recorder.clone());

    let mut author = Author {
        publisher: Some(Publisher::named("Ace")),
        ..Author::named("Herbert")
    };
    t.mapper.insert(&mut author).unwrap();
    assert_eq!(
        recorder.take(),
        recorded(&[(HookEvent::Insert, "Publisher"), (HookEvent::Insert, "Author")])
    );

    t.mapper.save(&mut author).unwrap();
    assert_eq!(recorder.take(), recorded(&[(HookEvent::Update, "Author")]));

    t.mapper.remove(&author).unwrap();
    assert_eq!(recorder.take(), recorded(&[(HookEvent::Remove, "Author")]));

    // Nothing was removed, nothing is reported
    t.mapper.remove(&author).unwrap();
    assert!(recorder.take().is_empty());
}

#[test]
fn failing_listener_does_not_undo_the_write() {
    let t = TestMapper::new();
    let recorder = Arc::new(Recorder::default());
    t.mapper.add_listener(Arc::new(Refusing));
    t.mapper.add_listener(recorder.clone());
    assert_eq!(t.mapper.hooks().len(), 2);

    let mut pet = Pet::named("Rex");
    t.mapper.insert(&mut pet).unwrap();
    assert_eq!(t.mapper.count::<Pet>().unwrap(), 1);
    // Later listeners still run
    assert_eq!(recorder.take(), recorded(&[(HookEvent::Insert, "Pet")]));
}

#[test]
fn failed_write_fires_nothing() {
    let t = TestMapper::new();
    let recorder = Arc::new(Recorder::default());
    t.mapper.add_listener(recorder.clone());

    let mut shelf = Shelf::default();
    assert!(t.mapper.insert(&mut shelf).is_err());
    assert!(recorder.take().is_empty());
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn mapper_reads_its_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        "max_cascade_depth = 2\ndefault_auto_increment_start = 10\nlog_field_errors = false\n",
    )
    .unwrap();

    let store = Arc::new(MemoryStore::new());
    let mapper = EntityMapper::with_config_file(store, &path).unwrap();
    assert_eq!(mapper.config().max_cascade_depth, 2);
    assert!(!mapper.config().log_field_errors);
    assert_eq!(mapper.config().metadata_cache_capacity, 0);

    let books = insert_books(&mapper, "b", 2);
    assert_eq!(books[1].id.as_deref(), Some("11"));
}

#[test]
fn default_file_is_written_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    MapperConfig::write_default_if_missing(&path).unwrap();
    assert_eq!(MapperConfig::from_file(&path).unwrap(), MapperConfig::default());

    let custom = MapperConfig {
        max_cascade_depth: 3,
        ..MapperConfig::default()
    };
    custom.write_to_file(&path).unwrap();
    MapperConfig::write_default_if_missing(&path).unwrap();
    assert_eq!(MapperConfig::from_file(&path).unwrap(), custom);
}

#[test]
fn zero_depth_is_rejected() {
    let err = MapperConfig::from_toml_str("max_cascade_depth = 0").unwrap_err();
    assert!(matches!(err, MapperError::Config(_)));

    let store = Arc::new(MemoryStore::new());
    let config = MapperConfig {
        max_cascade_depth: 0,
        ..MapperConfig::default()
    };
    assert!(EntityMapper::with_config(store, config).is_err());
}

#[test]
fn unreadable_config_names_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.toml");
    match MapperConfig::from_file(&path).unwrap_err() {
        MapperError::Config(msg) => assert!(msg.contains("missing.toml")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn bounded_metadata_cache_rebuilds_evicted_types() {
    let t = TestMapper::with_config(MapperConfig {
        metadata_cache_capacity: 1,
        ..MapperConfig::default()
    });

    let mut pet = Pet::named("Rex");
    t.mapper.insert(&mut pet).unwrap();
    let mut tenant = Tenant::default();
    t.mapper.insert(&mut tenant).unwrap();

    let found: Pet = t.mapper.find_by_id(pet.id.as_deref().unwrap()).unwrap().unwrap();
    assert_eq!(found, pet);

    let stats = t.mapper.metadata().stats();
    assert!(stats.evictions >= 1);
    assert!(stats.builds >= 3);
    assert!(t.mapper.metadata().len() <= 1);
}
