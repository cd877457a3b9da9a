//! Identifier strategies
//!
//! Each strategy produces an id when the in-memory identifier is empty and
//! parses string-form ids into the store's native representation.
//!
//! | kind          | native form  | generate                      |
//! |---------------|--------------|-------------------------------|
//! | Generated     | `ObjectId`   | fresh 96-bit id               |
//! | AutoIncrement | `Long`       | stored max plus one, or start |
//! | UserDefined   | `String`     | fails                         |

use docmap_core::{DocumentStore, NativeId, ObjectId};
use tracing::debug;

use crate::error::{MapperError, MapperResult};
use crate::metadata::{IdKind, IdSpec};

/// Inputs a strategy may consult
pub struct IdContext<'a> {
    /// Simple name of the entity type
    pub type_name: &'a str,
    /// Collection of the entity type, if it has one
    pub collection: Option<&'a str>,
    /// Options of the identifier field
    pub spec: &'a IdSpec,
    /// AutoIncrement start when the field sets none
    pub default_start: i64,
    /// Store to query for aggregates
    pub store: &'a dyn DocumentStore,
}

/// Produces and parses identifiers
pub trait IdStrategy: Send + Sync {
    /// Strategy kind
    fn kind(&self) -> IdKind;

    /// Produce a fresh id for an entity whose identifier is empty
    fn generate(&self, ctx: &IdContext<'_>) -> MapperResult<NativeId>;

    /// Parse a string-form id
    ///
    /// # Errors
    ///
    /// `InvalidIdFormat` if `raw` has no native form under this strategy.
    fn parse(&self, type_name: &str, raw: &str) -> MapperResult<NativeId>;

    /// Id to encode: the parsed current id, or a fresh one when empty
    fn resolve(&self, ctx: &IdContext<'_>, current: Option<&str>) -> MapperResult<NativeId> {
        match current {
            Some(raw) if !raw.is_empty() => self.parse(ctx.type_name, raw),
            _ => self.generate(ctx),
        }
    }
}

fn invalid(type_name: &str, raw: &str, reason: impl Into<String>) -> MapperError {
    MapperError::InvalidIdFormat {
        type_name: type_name.to_string(),
        id: raw.to_string(),
        reason: reason.into(),
    }
}

/// Fresh object ids
#[derive(Debug, Default)]
pub struct GeneratedId;

impl IdStrategy for GeneratedId {
    fn kind(&self) -> IdKind {
        IdKind::Generated
    }

    fn generate(&self, _ctx: &IdContext<'_>) -> MapperResult<NativeId> {
        Ok(NativeId::ObjectId(ObjectId::new()))
    }

    fn parse(&self, type_name: &str, raw: &str) -> MapperResult<NativeId> {
        ObjectId::parse_str(raw)
            .map(NativeId::ObjectId)
            .map_err(|e| invalid(type_name, raw, e.to_string()))
    }
}

/// Largest stored id plus one
///
/// Allocation reads the collection's current maximum and adds one. Two
/// concurrent inserts of the same type can read the same maximum and
/// compute the same id; the second insert then fails with a duplicate key.
/// Serialize AutoIncrement inserts externally, or use `Generated` or
/// `UserDefined` for entities written concurrently.
#[derive(Debug, Default)]
pub struct AutoIncrementId;

impl IdStrategy for AutoIncrementId {
    fn kind(&self) -> IdKind {
        IdKind::AutoIncrement
    }

    fn generate(&self, ctx: &IdContext<'_>) -> MapperResult<NativeId> {
        let collection = ctx.collection.ok_or_else(|| MapperError::NotACollection {
            type_name: ctx.type_name.to_string(),
        })?;
        let start = ctx.spec.start.unwrap_or(ctx.default_start);
        let next = match ctx.store.max_id(collection)? {
            None => start,
            Some(NativeId::Long(max)) => max.checked_add(1).ok_or_else(|| {
                invalid(ctx.type_name, &max.to_string(), "id space exhausted")
            })?,
            Some(other) => {
                return Err(invalid(
                    ctx.type_name,
                    &other.to_string(),
                    "stored id is not an integer",
                ))
            }
        };
        debug!(
            target: "docmap::id",
            type_name = ctx.type_name,
            collection,
            id = next,
            "Allocated auto-increment id"
        );
        Ok(NativeId::Long(next))
    }

    fn parse(&self, type_name: &str, raw: &str) -> MapperResult<NativeId> {
        raw.trim()
            .parse::<i64>()
            .map(NativeId::Long)
            .map_err(|e| invalid(type_name, raw, e.to_string()))
    }
}

/// Ids supplied by the caller
#[derive(Debug, Default)]
pub struct UserDefinedId;

impl IdStrategy for UserDefinedId {
    fn kind(&self) -> IdKind {
        IdKind::UserDefined
    }

    fn generate(&self, ctx: &IdContext<'_>) -> MapperResult<NativeId> {
        Err(MapperError::MissingUserDefinedId {
            type_name: ctx.type_name.to_string(),
        })
    }

    fn parse(&self, type_name: &str, raw: &str) -> MapperResult<NativeId> {
        if raw.is_empty() {
            return Err(invalid(type_name, raw, "empty id"));
        }
        Ok(NativeId::String(raw.to_string()))
    }
}

/// The three strategies, looked up by kind
pub struct IdStrategies {
    generated: Box<dyn IdStrategy>,
    auto_increment: Box<dyn IdStrategy>,
    user_defined: Box<dyn IdStrategy>,
}

impl Default for IdStrategies {
    fn default() -> Self {
        IdStrategies {
            generated: Box::new(GeneratedId),
            auto_increment: Box::new(AutoIncrementId),
            user_defined: Box::new(UserDefinedId),
        }
    }
}

impl IdStrategies {
    /// Built-in strategies
    pub fn new() -> Self {
        Self::default()
    }

    /// Strategy for `kind`
    pub fn get(&self, kind: IdKind) -> &dyn IdStrategy {
        match kind {
            IdKind::Generated => self.generated.as_ref(),
            IdKind::AutoIncrement => self.auto_increment.as_ref(),
            IdKind::UserDefined => self.user_defined.as_ref(),
        }
    }

    /// Parse `raw` under the strategy of `spec`
    pub fn parse(&self, spec: &IdSpec, type_name: &str, raw: &str) -> MapperResult<NativeId> {
        self.get(spec.kind).parse(type_name, raw)
    }
}
