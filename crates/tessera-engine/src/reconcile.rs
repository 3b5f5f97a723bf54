//! Key hand-over across operations.
//!
//! Applying an operation rebuilds every node on the path from the root to the
//! change. Before the operation runs we note, for each of those lineages,
//! which key sits at which path; afterwards the nodes now found at those paths
//! inherit the keys. Nodes outside the affected lineages are shared between
//! the old and new tree and keep their entries as they are.

use log::{debug, warn};
use tessera_model::{Affinity, Document, Operation, Path, PathRefId};

use crate::identity::{IdentityRegistry, Key};

/// What an operation needs re-keyed, computed before it is applied
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RekeyTargets {
    /// Every node from the root down to each of these paths
    pub levels: Vec<Path>,
    /// A node whose path is only known after the operation, followed with a
    /// path reference
    pub tracked: Option<Path>,
    pub release_user_selection: bool,
}

pub fn rekey_targets(op: &Operation) -> RekeyTargets {
    let mut targets = RekeyTargets::default();

    match op {
        Operation::InsertText { path, .. }
        | Operation::RemoveText { path, .. }
        | Operation::SetNode { path, .. }
        | Operation::SplitNode { path, .. } => {
            targets.levels.push(path.clone());
        }
        Operation::InsertNode { path, .. } | Operation::RemoveNode { path, .. } => {
            targets.levels.extend(path.parent());
        }
        Operation::MergeNode { path, .. } => {
            targets.levels.extend(path.previous());
        }
        Operation::MoveNode { path, new_path } => {
            let (Some(parent), Some(new_parent)) = (path.parent(), new_path.parent()) else {
                return targets;
            };
            targets.levels.push(parent.common(&new_parent));
            if path.is_before(new_path) {
                targets.levels.push(parent);
                targets.tracked = Some(new_parent);
            } else {
                targets.levels.push(new_parent);
                targets.tracked = Some(parent);
            }
        }
        Operation::SetSelection { .. } => {
            targets.release_user_selection = true;
        }
    }

    targets
}

/// Keys found along the targeted lineages, paired with their current paths
pub(crate) fn collect_matches(
    document: &Document,
    registry: &IdentityRegistry,
    targets: &RekeyTargets,
) -> Vec<(Path, Key)> {
    let mut matches = Vec::new();
    for target in &targets.levels {
        let Ok(levels) = document.levels(target) else {
            debug!("no lineage at {target}, nothing to re-key");
            continue;
        };
        matches.extend(
            levels
                .into_iter()
                .filter_map(|(path, node)| Some((path, registry.key(&node)?))),
        );
    }
    matches
}

/// Starts following the tracked node, if it has a key to hand over
pub(crate) fn track(
    document: &mut Document,
    registry: &IdentityRegistry,
    targets: &RekeyTargets,
) -> Option<(PathRefId, Key)> {
    let path = targets.tracked.as_ref()?;
    let key = registry.key(document.get(path)?)?;
    Some((document.path_ref(path.clone(), Some(Affinity::Forward)), key))
}

/// Gives each key to the node now at its path
pub(crate) fn restore(
    document: &Document,
    registry: &mut IdentityRegistry,
    matches: Vec<(Path, Key)>,
) {
    for (path, key) in matches {
        match document.get(&path) {
            Some(node) => registry.set_key(node, key),
            None => warn!("cannot re-key {key}: nothing left at {path}"),
        }
    }
}

/// Releases the tracking reference and re-keys the node it followed
pub(crate) fn restore_tracked(
    document: &mut Document,
    registry: &mut IdentityRegistry,
    tracked: (PathRefId, Key),
) {
    let (id, key) = tracked;
    match document.unref_path(id) {
        Some(path) => restore(document, registry, vec![(path, key)]),
        None => warn!("cannot re-key {key}: tracked node was removed"),
    }
}
