use crate::model::{BlockDef, ConnectionDef, ModelDef};
use simbus_types::BlockId;
use std::collections::HashMap;

/// Recursively expands every `subsystem` block into its contents, leaving a
/// model with no `subsystem`/`inport`/`outport` blocks. Recurses into nested
/// subsystems before splicing them into the parent, so subsystems containing
/// subsystems flatten fully in one call.
pub fn flatten_model(model: ModelDef) -> ModelDef {
    let mut blocks = Vec::new();
    let mut connections = model.connections;

    for block in model.blocks {
        if block.kind != "subsystem" {
            blocks.push(block);
            continue;
        }

        let inner = block.subsystem.unwrap_or_default();
        let flat_inner = flatten_model(*inner);
        let prefix = format!("{}::", block.id);

        let mut inner_blocks: Vec<BlockDef> = flat_inner
            .blocks
            .into_iter()
            .map(|mut b| {
                b.id = format!("{prefix}{}", b.id);
                b
            })
            .collect();
        let mut inner_conns: Vec<ConnectionDef> = flat_inner
            .connections
            .into_iter()
            .map(|mut c| {
                c.from_block = format!("{prefix}{}", c.from_block);
                c.to_block = format!("{prefix}{}", c.to_block);
                c
            })
            .collect();

        let mut inport_id_by_port: HashMap<usize, BlockId> = HashMap::new();
        let mut outport_id_by_port: HashMap<usize, BlockId> = HashMap::new();
        inner_blocks.retain(|b| match b.kind.as_str() {
            "inport" => {
                inport_id_by_port.insert(b.port_index(), b.id.clone());
                false
            }
            "outport" => {
                outport_id_by_port.insert(b.port_index(), b.id.clone());
                false
            }
            _ => true,
        });

        // Splice external inputs directly onto whatever each inport stub fed.
        let incoming: Vec<ConnectionDef> = connections
            .iter()
            .filter(|c| c.to_block == block.id)
            .cloned()
            .collect();
        connections.retain(|c| c.to_block != block.id);

        for ext in &incoming {
            if let Some(inport_id) = inport_id_by_port.get(&ext.to_port) {
                for ic in inner_conns.iter_mut() {
                    if &ic.from_block == inport_id {
                        ic.from_block = ext.from_block.clone();
                        ic.from_port = ext.from_port;
                    }
                }
            }
        }

        // Splice whatever fed each outport stub directly onto the external consumer.
        let outgoing: Vec<ConnectionDef> = connections
            .iter()
            .filter(|c| c.from_block == block.id)
            .cloned()
            .collect();
        connections.retain(|c| c.from_block != block.id);

        for ext in &outgoing {
            if let Some(outport_id) = outport_id_by_port.get(&ext.from_port) {
                if let Some(src) = inner_conns.iter().find(|ic| &ic.to_block == outport_id) {
                    connections.push(ConnectionDef {
                        from_block: src.from_block.clone(),
                        from_port: src.from_port,
                        to_block: ext.to_block.clone(),
                        to_port: ext.to_port,
                    });
                }
            }
        }

        // Drop the now-dangling connections into/out of the removed stubs.
        inner_conns.retain(|c| {
            !inport_id_by_port.values().any(|id| id == &c.from_block)
                && !outport_id_by_port.values().any(|id| id == &c.to_block)
        });

        blocks.extend(inner_blocks);
        connections.extend(inner_conns);
    }

    ModelDef { blocks, connections }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(id: &str, kind: &str) -> BlockDef {
        BlockDef {
            id: id.to_string(),
            kind: kind.to_string(),
            params: Default::default(),
            subsystem: None,
        }
    }

    fn port(mut b: BlockDef, idx: u64) -> BlockDef {
        b.params.insert("port".into(), json!(idx));
        b
    }

    #[test]
    fn flattens_a_single_nested_subsystem() {
        let inner = ModelDef {
            blocks: vec![
                port(leaf("in", "inport"), 0),
                leaf("gain", "gain"),
                port(leaf("out", "outport"), 0),
            ],
            connections: vec![
                ConnectionDef {
                    from_block: "in".into(),
                    from_port: 0,
                    to_block: "gain".into(),
                    to_port: 0,
                },
                ConnectionDef {
                    from_block: "gain".into(),
                    from_port: 0,
                    to_block: "out".into(),
                    to_port: 0,
                },
            ],
        };
        let model = ModelDef {
            blocks: vec![
                leaf("src", "constant"),
                BlockDef {
                    id: "sub".into(),
                    kind: "subsystem".into(),
                    params: Default::default(),
                    subsystem: Some(Box::new(inner)),
                },
                leaf("sink", "scope"),
            ],
            connections: vec![
                ConnectionDef {
                    from_block: "src".into(),
                    from_port: 0,
                    to_block: "sub".into(),
                    to_port: 0,
                },
                ConnectionDef {
                    from_block: "sub".into(),
                    from_port: 0,
                    to_block: "sink".into(),
                    to_port: 0,
                },
            ],
        };

        let flat = flatten_model(model);
        assert!(flat.blocks.iter().all(|b| b.kind != "subsystem"
            && b.kind != "inport"
            && b.kind != "outport"));
        assert!(flat
            .connections
            .iter()
            .any(|c| c.from_block == "src" && c.to_block == "sub::gain"));
        assert!(flat
            .connections
            .iter()
            .any(|c| c.from_block == "sub::gain" && c.to_block == "sink"));
    }
}
