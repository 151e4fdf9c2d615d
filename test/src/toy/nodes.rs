use std::sync::Arc;

use treesync_shared::{
    impl_tree_any, required, Draft, ProtocolError, ReceiveQueue, RpcCodec, SendQueue, SyncError,
    Tree, TreeId,
};

use crate::toy::TOY;

/// Whitespace before a node. Sent by value.
#[derive(Debug)]
pub struct Space {
    pub whitespace: String,
}

impl Space {
    pub fn new(whitespace: &str) -> Arc<Self> {
        Arc::new(Self {
            whitespace: whitespace.to_string(),
        })
    }
}

#[derive(Default)]
pub struct SpaceDraft {
    whitespace: Option<String>,
}

impl Draft<Space> for SpaceDraft {
    fn of(value: &Space) -> Self {
        Self {
            whitespace: Some(value.whitespace.clone()),
        }
    }

    fn freeze(self) -> Result<Space, ProtocolError> {
        Ok(Space {
            whitespace: required(self.whitespace, Space::TYPE_NAME, "whitespace")?,
        })
    }
}

impl RpcCodec for Space {
    const TYPE_NAME: &'static str = "toy.Space";
    type Draft = SpaceDraft;

    fn rpc_send(&self, queue: &mut SendQueue<'_>) -> Result<(), SyncError> {
        queue.get_and_send(self, |space| &space.whitespace)
    }

    fn rpc_receive(draft: &mut SpaceDraft, queue: &mut ReceiveQueue<'_>) -> Result<(), SyncError> {
        queue.receive_into(&mut draft.whitespace)
    }
}

/// Resolved type of an expression, shared between every node of that type.
/// Sent by reference.
#[derive(Debug)]
pub struct TypeDesc {
    pub fqn: String,
}

impl TypeDesc {
    pub fn new(fqn: &str) -> Arc<Self> {
        Arc::new(Self {
            fqn: fqn.to_string(),
        })
    }
}

#[derive(Default)]
pub struct TypeDescDraft {
    fqn: Option<String>,
}

impl Draft<TypeDesc> for TypeDescDraft {
    fn of(value: &TypeDesc) -> Self {
        Self {
            fqn: Some(value.fqn.clone()),
        }
    }

    fn freeze(self) -> Result<TypeDesc, ProtocolError> {
        Ok(TypeDesc {
            fqn: required(self.fqn, TypeDesc::TYPE_NAME, "fqn")?,
        })
    }
}

impl RpcCodec for TypeDesc {
    const TYPE_NAME: &'static str = "toy.TypeDesc";
    type Draft = TypeDescDraft;

    fn rpc_send(&self, queue: &mut SendQueue<'_>) -> Result<(), SyncError> {
        queue.get_and_send(self, |desc| &desc.fqn)
    }

    fn rpc_receive(
        draft: &mut TypeDescDraft,
        queue: &mut ReceiveQueue<'_>,
    ) -> Result<(), SyncError> {
        queue.receive_into(&mut draft.fqn)
    }
}

/// Root of a toy source file.
#[derive(Debug)]
pub struct Unit {
    pub id: TreeId,
    pub name: String,
    pub statements: Vec<Arc<dyn Tree>>,
}

impl Unit {
    pub const TYPE_NAME: &'static str = "toy.Unit";

    pub fn with_statements(&self, statements: Vec<Arc<dyn Tree>>) -> Arc<dyn Tree> {
        Arc::new(Unit {
            id: self.id,
            name: self.name.clone(),
            statements,
        })
    }
}

impl Tree for Unit {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn tree_id(&self) -> Option<TreeId> {
        Some(self.id)
    }

    fn dialect(&self) -> Option<&'static str> {
        Some(TOY)
    }

    impl_tree_any!();
}

#[derive(Default)]
pub struct UnitDraft {
    pub id: Option<TreeId>,
    pub name: Option<String>,
    pub statements: Option<Vec<Arc<dyn Tree>>>,
}

impl Draft<Unit> for UnitDraft {
    fn of(value: &Unit) -> Self {
        Self {
            id: Some(value.id),
            name: Some(value.name.clone()),
            statements: Some(value.statements.clone()),
        }
    }

    fn freeze(self) -> Result<Unit, ProtocolError> {
        Ok(Unit {
            id: required(self.id, Unit::TYPE_NAME, "id")?,
            name: required(self.name, Unit::TYPE_NAME, "name")?,
            statements: required(self.statements, Unit::TYPE_NAME, "statements")?,
        })
    }
}

/// Nodes below the root carry an id of their own that survives rewrites, so
/// a changed node still pairs up with its previous version in a list.
#[derive(Debug)]
pub struct Block {
    pub id: TreeId,
    pub prefix: Arc<Space>,
    pub statements: Vec<Arc<dyn Tree>>,
}

impl Block {
    pub const TYPE_NAME: &'static str = "toy.Block";

    pub fn with_statements(&self, statements: Vec<Arc<dyn Tree>>) -> Arc<dyn Tree> {
        Arc::new(Block {
            id: self.id,
            prefix: self.prefix.clone(),
            statements,
        })
    }
}

impl Tree for Block {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    impl_tree_any!();
}

#[derive(Default)]
pub struct BlockDraft {
    pub id: Option<TreeId>,
    pub prefix: Option<Arc<Space>>,
    pub statements: Option<Vec<Arc<dyn Tree>>>,
}

impl Draft<Block> for BlockDraft {
    fn of(value: &Block) -> Self {
        Self {
            id: Some(value.id),
            prefix: Some(value.prefix.clone()),
            statements: Some(value.statements.clone()),
        }
    }

    fn freeze(self) -> Result<Block, ProtocolError> {
        Ok(Block {
            id: required(self.id, Block::TYPE_NAME, "id")?,
            prefix: required(self.prefix, Block::TYPE_NAME, "prefix")?,
            statements: required(self.statements, Block::TYPE_NAME, "statements")?,
        })
    }
}

#[derive(Debug)]
pub struct Ident {
    pub id: TreeId,
    pub prefix: Arc<Space>,
    pub name: String,
    pub type_desc: Option<Arc<TypeDesc>>,
}

impl Ident {
    pub const TYPE_NAME: &'static str = "toy.Ident";

    pub fn renamed(&self, name: &str) -> Arc<dyn Tree> {
        Arc::new(Ident {
            id: self.id,
            prefix: self.prefix.clone(),
            name: name.to_string(),
            type_desc: self.type_desc.clone(),
        })
    }
}

impl Tree for Ident {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    impl_tree_any!();
}

#[derive(Default)]
pub struct IdentDraft {
    pub id: Option<TreeId>,
    pub prefix: Option<Arc<Space>>,
    pub name: Option<String>,
    pub type_desc: Option<Arc<TypeDesc>>,
}

impl Draft<Ident> for IdentDraft {
    fn of(value: &Ident) -> Self {
        Self {
            id: Some(value.id),
            prefix: Some(value.prefix.clone()),
            name: Some(value.name.clone()),
            type_desc: value.type_desc.clone(),
        }
    }

    fn freeze(self) -> Result<Ident, ProtocolError> {
        Ok(Ident {
            id: required(self.id, Ident::TYPE_NAME, "id")?,
            prefix: required(self.prefix, Ident::TYPE_NAME, "prefix")?,
            name: required(self.name, Ident::TYPE_NAME, "name")?,
            type_desc: self.type_desc,
        })
    }
}

#[derive(Debug)]
pub struct Literal {
    pub id: TreeId,
    pub prefix: Arc<Space>,
    pub value: i64,
}

impl Literal {
    pub const TYPE_NAME: &'static str = "toy.Literal";

    pub fn with_value(&self, value: i64) -> Arc<dyn Tree> {
        Arc::new(Literal {
            id: self.id,
            prefix: self.prefix.clone(),
            value,
        })
    }
}

impl Tree for Literal {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    impl_tree_any!();
}

#[derive(Default)]
pub struct LiteralDraft {
    pub id: Option<TreeId>,
    pub prefix: Option<Arc<Space>>,
    pub value: Option<i64>,
}

impl Draft<Literal> for LiteralDraft {
    fn of(value: &Literal) -> Self {
        Self {
            id: Some(value.id),
            prefix: Some(value.prefix.clone()),
            value: Some(value.value),
        }
    }

    fn freeze(self) -> Result<Literal, ProtocolError> {
        Ok(Literal {
            id: required(self.id, Literal::TYPE_NAME, "id")?,
            prefix: required(self.prefix, Literal::TYPE_NAME, "prefix")?,
            value: required(self.value, Literal::TYPE_NAME, "value")?,
        })
    }
}
