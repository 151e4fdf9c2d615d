use std::sync::Arc;

use treesync_shared::Tree;

use crate::toy::{Block, Unit};

/// Rewrites a tree bottom-up.
///
/// `f` sees every node after its children were rewritten and returns a
/// replacement, or `None` to keep the node. Nodes whose subtree did not
/// change are returned as the same instance, so an untouched tree comes back
/// `Arc::ptr_eq` to the input.
pub fn rewrite(
    tree: &Arc<dyn Tree>,
    f: &mut dyn FnMut(&Arc<dyn Tree>) -> Option<Arc<dyn Tree>>,
) -> Arc<dyn Tree> {
    let rebuilt = if let Some(unit) = tree.downcast_ref::<Unit>() {
        rewrite_list(&unit.statements, f).map(|statements| unit.with_statements(statements))
    } else if let Some(block) = tree.downcast_ref::<Block>() {
        rewrite_list(&block.statements, f).map(|statements| block.with_statements(statements))
    } else {
        None
    };

    let current = rebuilt.unwrap_or_else(|| tree.clone());
    f(&current).unwrap_or(current)
}

fn rewrite_list(
    trees: &[Arc<dyn Tree>],
    f: &mut dyn FnMut(&Arc<dyn Tree>) -> Option<Arc<dyn Tree>>,
) -> Option<Vec<Arc<dyn Tree>>> {
    let rewritten: Vec<Arc<dyn Tree>> = trees.iter().map(|tree| rewrite(tree, f)).collect();
    let changed = rewritten
        .iter()
        .zip(trees)
        .any(|(after, before)| !Arc::ptr_eq(after, before));
    if changed {
        Some(rewritten)
    } else {
        None
    }
}
