use treesync_serde::{BitReader, BitWrite, BitWriter, Serde, SerdeErr};

use crate::{wire::Value, TreeId};

/// Asks the peer to apply a named visitor to a tree both sides track.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitRequest {
    pub visitor: String,
    pub tree_id: TreeId,
    /// Opaque to the session, handed to the visitor as-is
    pub context: Option<Value>,
}

impl Serde for VisitRequest {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.visitor.ser(writer);
        self.tree_id.ser(writer);
        self.context.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        // read visitor name
        let visitor = String::de(reader)?;

        // read tree id
        let tree_id = TreeId::de(reader)?;

        // read context
        let context = Option::<Value>::de(reader)?;

        Ok(Self {
            visitor,
            tree_id,
            context,
        })
    }
}

/// Whether the visitor produced a different tree, by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitResponse {
    pub modified: bool,
}

impl Serde for VisitResponse {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.modified.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            modified: bool::de(reader)?,
        })
    }
}

/// Pulls the next batch of the conversation for a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetTreeRequest {
    pub tree_id: TreeId,
    /// Set on the first pull of a conversation: any conversation still in
    /// flight for the tree is dropped and a fresh diff is started
    pub restart: bool,
}

impl GetTreeRequest {
    /// First pull of a new conversation.
    pub fn start(tree_id: TreeId) -> Self {
        Self {
            tree_id,
            restart: true,
        }
    }

    /// Pull that joins the conversation in flight, starting one if there is none.
    pub fn next(tree_id: TreeId) -> Self {
        Self {
            tree_id,
            restart: false,
        }
    }
}

impl Serde for GetTreeRequest {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.tree_id.ser(writer);
        self.restart.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            tree_id: TreeId::de(reader)?,
            restart: bool::de(reader)?,
        })
    }
}

/// Writes a message into a standalone byte buffer.
pub fn to_bytes<M: Serde>(message: &M) -> Vec<u8> {
    let mut writer = BitWriter::new();
    message.ser(&mut writer);
    writer.to_bytes()
}

pub fn from_bytes<M: Serde>(bytes: &[u8]) -> Result<M, SerdeErr> {
    let mut reader = BitReader::new(bytes);
    M::de(&mut reader)
}
