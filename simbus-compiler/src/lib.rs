mod flatten;
mod graph;
mod model;

pub use flatten::flatten_model;
pub use graph::{build_graph, topological_order, DependencyGraph};
pub use model::{BlockDef, ConnectionDef, ModelDef};

use simbus_blocks::Block;
use simbus_types::{BlockId, SimError};
use std::collections::HashMap;

/// One resolved input binding: the index (into `CompiledModel::blocks`) of
/// the producing block and which of its output ports to read. `None` means
/// the input port has no incoming connection and reads as `0.0`.
pub type InputBinding = Option<(usize, usize)>;

/// The result of compiling a `ModelDef`: a flat block list plus everything
/// the kernel needs to run a tick without re-deriving it every pass.
pub struct CompiledModel {
    pub ids: Vec<BlockId>,
    pub blocks: Vec<Block>,
    /// Indices into `blocks`, in an order where every non-state-holding
    /// consumer follows its producers.
    pub execution_order: Vec<usize>,
    /// `inputs[i]` are block `i`'s resolved input bindings, indexed by port.
    pub inputs: Vec<Vec<InputBinding>>,
}

impl CompiledModel {
    pub fn gather_inputs(&self, block_index: usize, scratch: &mut Vec<f64>) {
        scratch.clear();
        for binding in &self.inputs[block_index] {
            scratch.push(match binding {
                Some((producer, port)) => self.blocks[*producer].get_output(*port),
                None => 0.0,
            });
        }
    }
}

/// Flattens, instantiates, and schedules a model description. See `spec.md`
/// §4.4 for the five-step algorithm this mirrors: flatten subsystems, build
/// blocks, build the same-pass dependency graph, detect algebraic loops,
/// topologically order the result.
pub fn compile(model: ModelDef) -> Result<CompiledModel, SimError> {
    let flat = flatten_model(model);
    if flat.blocks.is_empty() {
        return Err(SimError::EmptyModel);
    }

    let mut ids = Vec::with_capacity(flat.blocks.len());
    let mut blocks = Vec::with_capacity(flat.blocks.len());
    let mut index_of: HashMap<BlockId, usize> = HashMap::with_capacity(flat.blocks.len());
    for def in &flat.blocks {
        let block = Block::from_kind_and_params(&def.id, &def.kind, &def.params)?;
        index_of.insert(def.id.clone(), blocks.len());
        ids.push(def.id.clone());
        blocks.push(block);
    }

    let graph = build_graph(&flat);
    let order_ids = topological_order(&graph)?;
    let execution_order: Vec<usize> = order_ids
        .iter()
        .map(|id| index_of[id])
        .collect();

    let mut inputs: Vec<Vec<InputBinding>> = vec![Vec::new(); blocks.len()];
    for conn in &flat.connections {
        let consumer = index_of[&conn.to_block];
        let producer = index_of[&conn.from_block];
        let row = &mut inputs[consumer];
        if row.len() <= conn.to_port {
            row.resize(conn.to_port + 1, None);
        }
        row[conn.to_port] = Some((producer, conn.from_port));
    }

    Ok(CompiledModel {
        ids,
        blocks,
        execution_order,
        inputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(id: &str, kind: &str, params: serde_json::Value) -> BlockDef {
        BlockDef {
            id: id.to_string(),
            kind: kind.to_string(),
            params: params.as_object().cloned().unwrap_or_default(),
            subsystem: None,
        }
    }

    #[test]
    fn empty_model_is_rejected() {
        let model = ModelDef::default();
        assert!(matches!(compile(model), Err(SimError::EmptyModel)));
    }

    #[test]
    fn compiles_constant_into_scope() {
        let model = ModelDef {
            blocks: vec![
                block("c", "constant", json!({"value": 3.0})),
                block("s", "scope", json!({"num_inputs": 1})),
            ],
            connections: vec![ConnectionDef {
                from_block: "c".into(),
                from_port: 0,
                to_block: "s".into(),
                to_port: 0,
            }],
        };
        let compiled = compile(model).expect("model compiles");
        assert_eq!(compiled.blocks.len(), 2);
        assert_eq!(compiled.execution_order.len(), 2);
    }

    #[test]
    fn rejects_pure_algebraic_loop() {
        let model = ModelDef {
            blocks: vec![
                block("g1", "gain", json!({"gain": 1.0})),
                block("g2", "gain", json!({"gain": 1.0})),
            ],
            connections: vec![
                ConnectionDef {
                    from_block: "g1".into(),
                    from_port: 0,
                    to_block: "g2".into(),
                    to_port: 0,
                },
                ConnectionDef {
                    from_block: "g2".into(),
                    from_port: 0,
                    to_block: "g1".into(),
                    to_port: 0,
                },
            ],
        };
        assert!(matches!(
            compile(model),
            Err(SimError::AlgebraicLoop { .. })
        ));
    }
}
