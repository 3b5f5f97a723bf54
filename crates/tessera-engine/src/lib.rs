pub mod editor;
pub mod error;
pub mod focus;
pub mod identity;
pub mod mapping;
pub mod pending;
pub mod reconcile;
pub mod surface;

// Re-export key types for easier usage
pub use editor::{Editor, EditorOptions, FocusPolicy, QuirkOptions};
pub use error::EditorError;
pub use focus::{ManualScheduler, Scheduler, Task};
pub use identity::{IdentityRegistry, Key, PathResolutionError};
pub use mapping::{PointOptions, RangeOptions, SearchDirection};
pub use pending::{PendingAction, PendingState, StringDiff, TextDiff};
pub use surface::{
    EditorId, Role, SelectionSource, Surface, SurfaceNodeId, SurfacePoint, SurfaceRange,
    SurfaceSelection, render_document, render_document_into,
};
