//! Phase dependency graph
//!
//! Phases may declare `phase_dependencies`. The graph reports dependencies on
//! phases that do not exist and cycles between phases.
//! Uses petgraph for graph operations.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use super::id::PhaseId;

/// A dependency graph over the phases of one roadmap
#[derive(Debug, Default)]
pub struct PhaseGraph {
    /// Edge direction: dependency -> dependent
    graph: DiGraph<PhaseId, ()>,

    /// Map from PhaseId to node index
    node_map: HashMap<PhaseId, NodeIndex>,

    /// (phase, missing dependency) pairs, in declaration order
    unknown: Vec<(PhaseId, PhaseId)>,
}

impl PhaseGraph {
    /// Builds a graph from `(phase, dependencies)` pairs in document order
    pub fn new<'a, I, D>(phases: I) -> Self
    where
        I: IntoIterator<Item = (&'a PhaseId, D)>,
        D: IntoIterator<Item = &'a PhaseId>,
    {
        let mut graph = Self::default();

        // First pass: add all nodes
        let phases: Vec<(&PhaseId, Vec<&PhaseId>)> = phases
            .into_iter()
            .map(|(id, deps)| (id, deps.into_iter().collect()))
            .collect();
        for (id, _) in &phases {
            if !graph.node_map.contains_key(*id) {
                let idx = graph.graph.add_node((*id).clone());
                graph.node_map.insert((*id).clone(), idx);
            }
        }

        // Second pass: add all edges
        for (id, deps) in &phases {
            let phase_idx = graph.node_map[*id];
            for dep in deps {
                match graph.node_map.get(*dep) {
                    Some(&dep_idx) => {
                        graph.graph.add_edge(dep_idx, phase_idx, ());
                    }
                    None => graph.unknown.push(((*id).clone(), (*dep).clone())),
                }
            }
        }

        graph
    }

    /// Dependencies that name a phase not present in the graph
    pub fn unknown_dependencies(&self) -> &[(PhaseId, PhaseId)] {
        &self.unknown
    }

    /// Groups of phases that depend on each other, including self-dependencies
    pub fn cycles(&self) -> Vec<Vec<PhaseId>> {
        let mut cycles: Vec<Vec<PhaseId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut ids: Vec<PhaseId> =
                    scc.into_iter().map(|idx| self.graph[idx].clone()).collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<PhaseId> {
        names.iter().map(|n| PhaseId::new(*n).unwrap()).collect()
    }

    fn build(spec: Vec<(&str, Vec<&str>)>) -> PhaseGraph {
        let owned: Vec<(PhaseId, Vec<PhaseId>)> = spec
            .into_iter()
            .map(|(id, deps)| (PhaseId::new(id).unwrap(), ids(&deps)))
            .collect();
        PhaseGraph::new(owned.iter().map(|(id, deps)| (id, deps.iter())))
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let graph = build(vec![("P3", vec!["P1", "P2"]), ("P1", vec![]), ("P2", vec!["P1"])]);

        assert!(graph.cycles().is_empty());
        assert!(graph.unknown_dependencies().is_empty());
    }

    #[test]
    fn reports_unknown_dependencies() {
        let graph = build(vec![("P1", vec!["P0"]), ("P2", vec!["P1"])]);

        let expected = vec![(PhaseId::new("P1").unwrap(), PhaseId::new("P0").unwrap())];
        assert_eq!(graph.unknown_dependencies(), expected.as_slice());
    }

    #[test]
    fn detects_cycles() {
        let graph = build(vec![
            ("A", vec!["C"]),
            ("B", vec!["A"]),
            ("C", vec!["B"]),
            ("D", vec![]),
        ]);

        assert_eq!(graph.cycles(), vec![ids(&["A", "B", "C"])]);
    }

    #[test]
    fn detects_self_dependency() {
        let graph = build(vec![("A", vec!["A"])]);

        assert_eq!(graph.cycles(), vec![ids(&["A"])]);
    }
}
