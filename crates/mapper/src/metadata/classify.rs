//! Field role classification
//!
//! Maps a field's markers to exactly one role. When several markers are
//! present the first match in this order wins:
//!
//! Identifier > EmbeddedObject > EmbeddedCollection > Reference >
//! ReferenceCollection > Ignored > Scalar
//!
//! A field without markers is a Scalar.

use docmap_core::SortSpec;

use super::annotation::{CascadeSpec, IdSpec, Marker, RefOptions};

/// Reference options kept on the descriptor
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceSpec {
    /// Cascade flags
    pub cascade: CascadeSpec,
    /// Bare id encoding
    pub reduced: bool,
    /// Ordering of batched lookups
    pub sort: Option<SortSpec>,
}

impl From<&RefOptions> for ReferenceSpec {
    fn from(opts: &RefOptions) -> Self {
        ReferenceSpec {
            cascade: opts.cascade,
            reduced: opts.reduced,
            sort: opts.sort.clone(),
        }
    }
}

/// Role of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRole {
    /// The document `_id`
    Identifier(IdSpec),
    /// Plain value
    Scalar {
        /// Excluded from default projections
        lazy: bool,
    },
    /// Nested sub-document
    EmbeddedObject,
    /// Container of nested sub-documents
    EmbeddedCollection,
    /// Single reference to another collection
    Reference(ReferenceSpec),
    /// Container of references
    ReferenceCollection(ReferenceSpec),
    /// Never mapped
    Ignored,
}

impl FieldRole {
    /// Lowercase name for logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            FieldRole::Identifier(_) => "identifier",
            FieldRole::Scalar { .. } => "scalar",
            FieldRole::EmbeddedObject => "embedded_object",
            FieldRole::EmbeddedCollection => "embedded_collection",
            FieldRole::Reference(_) => "reference",
            FieldRole::ReferenceCollection(_) => "reference_collection",
            FieldRole::Ignored => "ignored",
        }
    }

    /// Reference options for either reference role
    pub fn reference_spec(&self) -> Option<&ReferenceSpec> {
        match self {
            FieldRole::Reference(spec) | FieldRole::ReferenceCollection(spec) => Some(spec),
            _ => None,
        }
    }
}

/// Outcome of classifying one field
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Winning role
    pub role: FieldRole,
    /// Wire name override carried by the winning marker
    pub wire_name: Option<String>,
}

/// Classify a field from its markers
pub fn classify(markers: &[Marker]) -> Classification {
    let id = markers.iter().find_map(|m| match m {
        Marker::Id(spec) => Some(*spec),
        _ => None,
    });
    if let Some(spec) = id {
        return Classification {
            role: FieldRole::Identifier(spec),
            wire_name: None,
        };
    }

    if let Some(name) = markers.iter().find_map(|m| match m {
        Marker::Embed { name } => Some(name.clone()),
        _ => None,
    }) {
        return Classification {
            role: FieldRole::EmbeddedObject,
            wire_name: name,
        };
    }

    if let Some(name) = markers.iter().find_map(|m| match m {
        Marker::EmbedList { name } => Some(name.clone()),
        _ => None,
    }) {
        return Classification {
            role: FieldRole::EmbeddedCollection,
            wire_name: name,
        };
    }

    if let Some(opts) = markers.iter().find_map(|m| match m {
        Marker::Ref(opts) => Some(opts),
        _ => None,
    }) {
        return Classification {
            role: FieldRole::Reference(opts.into()),
            wire_name: opts.name.clone(),
        };
    }

    if let Some(opts) = markers.iter().find_map(|m| match m {
        Marker::RefList(opts) => Some(opts),
        _ => None,
    }) {
        return Classification {
            role: FieldRole::ReferenceCollection(opts.into()),
            wire_name: opts.name.clone(),
        };
    }

    if markers.iter().any(|m| matches!(m, Marker::Ignore)) {
        return Classification {
            role: FieldRole::Ignored,
            wire_name: None,
        };
    }

    let (wire_name, lazy) = markers
        .iter()
        .find_map(|m| match m {
            Marker::Property { name, lazy } => Some((name.clone(), *lazy)),
            _ => None,
        })
        .unwrap_or((None, false));
    Classification {
        role: FieldRole::Scalar { lazy },
        wire_name,
    }
}
