//! Persistent document tree for tessera.
//!
//! Content is addressed by [`Path`]s of child indices and [`Point`]s inside
//! text leaves. Every change is an [`Operation`]; applying one rebuilds the
//! touched lineage and transforms the selection and every live reference.

pub mod document;
pub mod error;
pub mod node;
pub mod operation;
pub mod path;
pub mod point;
mod query;
pub mod refs;

pub use document::{Document, ROOT_KIND};
pub use error::ModelError;
pub use node::{Element, Node, NodeId, Props, Text};
pub use operation::Operation;
pub use path::Path;
pub use point::{Affinity, Location, Point, Range, RangeAffinity};
pub use refs::{PathRefId, RangeRefId, Refs};
