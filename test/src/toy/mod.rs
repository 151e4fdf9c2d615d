//! A small source tree dialect used to exercise the protocol end to end.

mod nodes;
mod rewrite;

pub use codec::{node_key, tree_identity, LiteralCodec, NodeKey, ToyCodec, ToyPlugin, TREE_FAMILY};
pub use nodes::{Block, Ident, Literal, Space, TypeDesc, Unit};
pub use render::render;
pub use rewrite::rewrite;

use std::sync::Arc;

use treesync_shared::{Tree, TreeId};

pub const TOY: &str = "toy";

pub fn unit(name: &str, statements: Vec<Arc<dyn Tree>>) -> Arc<dyn Tree> {
    Arc::new(Unit {
        id: TreeId::random(),
        name: name.to_string(),
        statements,
    })
}

pub fn block(statements: Vec<Arc<dyn Tree>>) -> Arc<dyn Tree> {
    Arc::new(Block {
        id: TreeId::random(),
        prefix: Space::new("\n"),
        statements,
    })
}

pub fn ident(name: &str, type_desc: Option<&Arc<TypeDesc>>) -> Arc<dyn Tree> {
    Arc::new(Ident {
        id: TreeId::random(),
        prefix: Space::new(" "),
        name: name.to_string(),
        type_desc: type_desc.cloned(),
    })
}

pub fn literal(value: i64) -> Arc<dyn Tree> {
    Arc::new(Literal {
        id: TreeId::random(),
        prefix: Space::new(" "),
        value,
    })
}

/// Statements of a unit or block, empty for leaves.
pub fn statements(tree: &Arc<dyn Tree>) -> &[Arc<dyn Tree>] {
    if let Some(unit) = tree.downcast_ref::<Unit>() {
        &unit.statements
    } else if let Some(block) = tree.downcast_ref::<Block>() {
        &block.statements
    } else {
        &[]
    }
}
