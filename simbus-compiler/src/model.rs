use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use simbus_types::BlockId;

/// One block instance as it appears in a model description on disk or over
/// the wire. `subsystem` is only present (and only meaningful) when `kind ==
/// "subsystem"`; it holds the nested model this instance expands to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDef {
    pub id: BlockId,
    pub kind: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub subsystem: Option<Box<ModelDef>>,
}

/// A directed signal connection from one block's output port to another
/// block's input port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDef {
    pub from_block: BlockId,
    #[serde(default)]
    pub from_port: usize,
    pub to_block: BlockId,
    #[serde(default)]
    pub to_port: usize,
}

/// A complete model: a flat or hierarchical set of block instances plus the
/// connections between them. `Inport`/`Outport` blocks inside a nested
/// `subsystem` model mark that subsystem's boundary ports; their `params`
/// carry a `"port": <index>` entry identifying which boundary port they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDef {
    #[serde(default)]
    pub blocks: Vec<BlockDef>,
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
}

impl BlockDef {
    pub fn port_index(&self) -> usize {
        self.params
            .get("port")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize
    }
}
