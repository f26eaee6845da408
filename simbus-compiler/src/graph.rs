use crate::model::{ConnectionDef, ModelDef};
use simbus_blocks::is_state_holding;
use simbus_types::{BlockId, SimError};
use std::collections::{HashMap, HashSet, VecDeque};

/// A same-pass dependency: `consumer` must have `producer`'s current-pass
/// output available before it runs. Only recorded when `producer` is not
/// state-holding — a state-holding block's reported output this pass is
/// whatever its integrator cell already held before the pass began, so
/// nothing downstream needs to wait on it for THIS pass's value to be
/// correct. This is precisely what lets a feedback loop closed by an
/// integrator schedule without being flagged as an algebraic loop.
pub struct DependencyGraph {
    pub nodes: Vec<BlockId>,
    pub edges: HashMap<BlockId, Vec<BlockId>>,
    pub kind_of: HashMap<BlockId, String>,
}

pub fn build_graph(model: &ModelDef) -> DependencyGraph {
    let nodes: Vec<BlockId> = model.blocks.iter().map(|b| b.id.clone()).collect();
    let kind_of: HashMap<BlockId, String> = model
        .blocks
        .iter()
        .map(|b| (b.id.clone(), b.kind.clone()))
        .collect();
    let mut edges: HashMap<BlockId, Vec<BlockId>> =
        nodes.iter().map(|n| (n.clone(), Vec::new())).collect();

    for ConnectionDef {
        from_block,
        to_block,
        ..
    } in &model.connections
    {
        let producer_is_state_holding = kind_of
            .get(from_block)
            .map(|k| is_state_holding(k))
            .unwrap_or(false);
        if producer_is_state_holding {
            continue;
        }
        edges
            .entry(from_block.clone())
            .or_default()
            .push(to_block.clone());
    }

    DependencyGraph {
        nodes,
        edges,
        kind_of,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// DFS cycle search restricted to the given node set, used once Kahn's
/// algorithm has shown a cycle exists, purely to produce a readable cycle
/// path for the error message.
fn find_cycle(graph: &DependencyGraph, remaining: &HashSet<BlockId>) -> Vec<BlockId> {
    let mut color: HashMap<&BlockId, Color> =
        remaining.iter().map(|n| (n, Color::White)).collect();
    let mut stack = Vec::new();

    for start in remaining {
        if color[start] != Color::White {
            continue;
        }
        if let Some(cycle) = dfs_visit(graph, remaining, start, &mut color, &mut stack) {
            return cycle;
        }
    }
    Vec::new()
}

fn dfs_visit<'a>(
    graph: &'a DependencyGraph,
    remaining: &HashSet<BlockId>,
    node: &'a BlockId,
    color: &mut HashMap<&'a BlockId, Color>,
    stack: &mut Vec<&'a BlockId>,
) -> Option<Vec<BlockId>> {
    color.insert(node, Color::Gray);
    stack.push(node);

    if let Some(neighbors) = graph.edges.get(node) {
        for next in neighbors {
            if !remaining.contains(next) {
                continue;
            }
            match color.get(next).copied().unwrap_or(Color::White) {
                Color::White => {
                    if let Some(cycle) = dfs_visit(graph, remaining, next, color, stack) {
                        return Some(cycle);
                    }
                }
                Color::Gray => {
                    let start = stack.iter().position(|n| *n == next).unwrap_or(0);
                    let mut cycle: Vec<BlockId> =
                        stack[start..].iter().map(|n| (*n).clone()).collect();
                    cycle.push(next.clone());
                    return Some(cycle);
                }
                Color::Black => {}
            }
        }
    }

    stack.pop();
    color.insert(node, Color::Black);
    None
}

/// Kahn's algorithm. Returns the execution order, or an `AlgebraicLoop` error
/// naming one concrete cycle if the graph is not a DAG.
pub fn topological_order(graph: &DependencyGraph) -> Result<Vec<BlockId>, SimError> {
    let mut in_degree: HashMap<&BlockId, usize> = graph.nodes.iter().map(|n| (n, 0)).collect();
    for targets in graph.edges.values() {
        for t in targets {
            *in_degree.get_mut(t).expect("edge target is a known node") += 1;
        }
    }

    let mut queue: VecDeque<&BlockId> = graph
        .nodes
        .iter()
        .filter(|n| in_degree[n] == 0)
        .collect();
    let mut order = Vec::with_capacity(graph.nodes.len());

    while let Some(node) = queue.pop_front() {
        order.push(node.clone());
        if let Some(neighbors) = graph.edges.get(node) {
            for next in neighbors {
                let deg = in_degree.get_mut(next).expect("edge target is a known node");
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(next);
                }
            }
        }
    }

    if order.len() == graph.nodes.len() {
        return Ok(order);
    }

    let remaining: HashSet<BlockId> = graph
        .nodes
        .iter()
        .filter(|n| !order.contains(n))
        .cloned()
        .collect();
    let cycle = find_cycle(graph, &remaining);
    Err(SimError::AlgebraicLoop { cycle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockDef;

    fn block(id: &str, kind: &str) -> BlockDef {
        BlockDef {
            id: id.to_string(),
            kind: kind.to_string(),
            params: Default::default(),
            subsystem: None,
        }
    }

    #[test]
    fn feedback_through_an_integrator_is_not_a_loop() {
        let model = ModelDef {
            blocks: vec![block("sum", "sum"), block("integrator", "integrator")],
            connections: vec![
                ConnectionDef {
                    from_block: "sum".into(),
                    from_port: 0,
                    to_block: "integrator".into(),
                    to_port: 0,
                },
                ConnectionDef {
                    from_block: "integrator".into(),
                    from_port: 0,
                    to_block: "sum".into(),
                    to_port: 1,
                },
            ],
        };
        let graph = build_graph(&model);
        assert!(topological_order(&graph).is_ok());
    }

    #[test]
    fn pure_algebraic_cycle_is_rejected() {
        let model = ModelDef {
            blocks: vec![block("g1", "gain"), block("g2", "gain"), block("g3", "gain")],
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
                    to_block: "g3".into(),
                    to_port: 0,
                },
                ConnectionDef {
                    from_block: "g3".into(),
                    from_port: 0,
                    to_block: "g1".into(),
                    to_port: 0,
                },
            ],
        };
        let graph = build_graph(&model);
        match topological_order(&graph) {
            Err(SimError::AlgebraicLoop { cycle }) => assert!(!cycle.is_empty()),
            other => panic!("expected AlgebraicLoop, got {other:?}"),
        }
    }
}
