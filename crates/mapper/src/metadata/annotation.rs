//! Field markers
//!
//! The configuration surface a type uses to describe its fields. Markers
//! are read once when the type's metadata is built.

use std::fmt;
use std::str::FromStr;

use docmap_core::SortSpec;

/// Identifier generation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    /// Fresh 96-bit object id
    Generated,
    /// Largest stored id plus one
    AutoIncrement,
    /// Supplied by the caller
    UserDefined,
}

impl IdKind {
    /// Lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            IdKind::Generated => "generated",
            IdKind::AutoIncrement => "auto_increment",
            IdKind::UserDefined => "user_defined",
        }
    }
}

/// Identifier options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSpec {
    /// Strategy
    pub kind: IdKind,
    /// First AutoIncrement value; `None` uses the mapper default
    pub start: Option<i64>,
}

impl IdSpec {
    /// Generated object id
    pub fn generated() -> Self {
        IdSpec {
            kind: IdKind::Generated,
            start: None,
        }
    }

    /// AutoIncrement starting at the configured default
    pub fn auto_increment() -> Self {
        IdSpec {
            kind: IdKind::AutoIncrement,
            start: None,
        }
    }

    /// AutoIncrement starting at `start`
    pub fn auto_increment_from(start: i64) -> Self {
        IdSpec {
            kind: IdKind::AutoIncrement,
            start: Some(start),
        }
    }

    /// Caller-supplied id
    pub fn user_defined() -> Self {
        IdSpec {
            kind: IdKind::UserDefined,
            start: None,
        }
    }
}

impl Default for IdSpec {
    fn default() -> Self {
        Self::generated()
    }
}

bitflags::bitflags! {
    /// Cascade flags on a reference field
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CascadeSpec: u8 {
        /// No cascading
        const NONE = 0;
        /// Insert unsaved referenced entities on encode
        const CREATE = 0b0001;
        /// Resolve referenced entities eagerly on decode
        const READ = 0b0010;
        /// Save already-stored referenced entities on encode
        const UPDATE = 0b0100;
        /// Delete referenced entities with the owner
        const DELETE = 0b1000;
        /// Every flag
        const ALL = Self::CREATE.bits()
            | Self::READ.bits()
            | Self::UPDATE.bits()
            | Self::DELETE.bits();
    }
}

impl Default for CascadeSpec {
    fn default() -> Self {
        CascadeSpec::empty()
    }
}

const FLAG_LETTERS: [(char, CascadeSpec); 4] = [
    ('C', CascadeSpec::CREATE),
    ('R', CascadeSpec::READ),
    ('U', CascadeSpec::UPDATE),
    ('D', CascadeSpec::DELETE),
];

/// Parses flag letters, e.g. `"CRUD"`, `"cd"` or `""`
impl FromStr for CascadeSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut spec = CascadeSpec::NONE;
        for c in s.chars().filter(|c| !c.is_whitespace()) {
            let upper = c.to_ascii_uppercase();
            match FLAG_LETTERS.iter().find(|(letter, _)| *letter == upper) {
                Some((_, flag)) => spec |= *flag,
                None => return Err(format!("unknown cascade flag '{}'", c)),
            }
        }
        Ok(spec)
    }
}

impl fmt::Display for CascadeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (letter, flag) in FLAG_LETTERS {
            if self.contains(flag) {
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CascadeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CascadeSpec({})", self)
    }
}

/// Options shared by `Ref` and `RefList`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RefOptions {
    /// Wire name override
    pub name: Option<String>,
    /// Cascade flags
    pub cascade: CascadeSpec,
    /// Store the bare id instead of a collection+id record
    pub reduced: bool,
    /// Ordering applied by batched lookups (collections only)
    pub sort: Option<SortSpec>,
}

impl RefOptions {
    /// Full reference, no cascading
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the wire name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set cascade flags
    pub fn cascade(mut self, cascade: CascadeSpec) -> Self {
        self.cascade = cascade;
        self
    }

    /// Use the reduced encoding
    pub fn reduced(mut self) -> Self {
        self.reduced = true;
        self
    }

    /// Order batched lookups
    pub fn sorted(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// One marker on a field
#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    /// The identifier
    Id(IdSpec),
    /// Scalar property options
    Property {
        /// Wire name override
        name: Option<String>,
        /// Left out of default projections
        lazy: bool,
    },
    /// Embedded sub-document
    Embed {
        /// Wire name override
        name: Option<String>,
    },
    /// Array, collection or map of embedded sub-documents
    EmbedList {
        /// Wire name override
        name: Option<String>,
    },
    /// Single reference
    Ref(RefOptions),
    /// Array, collection or map of references
    RefList(RefOptions),
    /// Never mapped
    Ignore,
}

impl Marker {
    /// `Property` with a wire name override
    pub fn named(name: impl Into<String>) -> Self {
        Marker::Property {
            name: Some(name.into()),
            lazy: false,
        }
    }

    /// Lazy `Property`
    pub fn lazy() -> Self {
        Marker::Property {
            name: None,
            lazy: true,
        }
    }

    /// `Embed` without override
    pub fn embed() -> Self {
        Marker::Embed { name: None }
    }

    /// `EmbedList` without override
    pub fn embed_list() -> Self {
        Marker::EmbedList { name: None }
    }
}
