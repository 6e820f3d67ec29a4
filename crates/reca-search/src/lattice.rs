//! Exhaustive enumeration of the model lattice by breadth-first ascent
//! from the bottom reference model.

use crate::neighbors::{Full, Neighborhood};
use reca_core::manager::Direction;
use reca_core::model::Model;
use reca_core::variable::VariableList;
use std::collections::{BTreeSet, VecDeque};

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatticeEntry {
    pub model: Model,
    /// Edit distance from the bottom reference model.
    pub level: usize,
    pub has_loops: bool,
}

#[derive(Clone, Debug)]
pub struct Lattice {
    pub max_models: usize,
    pub loopless_only: bool,
}

impl Default for Lattice {
    fn default() -> Self {
        Lattice {
            max_models: 10_000,
            loopless_only: false,
        }
    }
}

impl Lattice {
    /// Walk the lattice upward from the bottom model, emitting each model
    /// once with its level. Traversal always crosses loop models so the
    /// loopless filter only affects what is emitted, not what is reachable.
    pub fn enumerate(&self, vars: &VariableList) -> Vec<LatticeEntry> {
        let bottom = Model::bottom_reference(vars);
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut queue: VecDeque<(Model, usize)> = VecDeque::new();
        let mut out = Vec::new();

        seen.insert(bottom.print_name(vars));
        queue.push_back((bottom, 0));

        while let Some((model, level)) = queue.pop_front() {
            if out.len() >= self.max_models {
                break;
            }
            let has_loops = model.has_loops(vars);
            if !self.loopless_only || !has_loops {
                out.push(LatticeEntry {
                    model: model.clone(),
                    level,
                    has_loops,
                });
            }
            for neighbor in Full.neighbors(vars, &model, Direction::Ascending) {
                let name = neighbor.print_name(vars);
                if seen.insert(name) {
                    queue.push_back((neighbor, level + 1));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_vars() -> VariableList {
        let mut vars = VariableList::new();
        vars.register("a", "a", 2, false).unwrap();
        vars.register("b", "b", 2, false).unwrap();
        vars.register("c", "c", 2, false).unwrap();
        vars
    }

    #[test]
    fn enumeration_starts_at_the_bottom() {
        let vars = three_vars();
        let entries = Lattice::default().enumerate(&vars);
        assert_eq!(entries[0].model.print_name(&vars), "A:B:C");
        assert_eq!(entries[0].level, 0);
        assert!(!entries[0].has_loops);
    }

    #[test]
    fn three_binary_variables_span_the_reachable_lattice() {
        let vars = three_vars();
        let entries = Lattice::default().enumerate(&vars);
        let names: Vec<String> = entries
            .iter()
            .map(|e| e.model.print_name(&vars))
            .collect();

        // bottom, the three pairings, the chains/forks, and the top; merge
        // and grow moves never raise the relation count, so the triangle
        // AB:AC:BC sits outside the reachable sublattice
        for expected in ["A:B:C", "AB:C", "AC:B", "A:BC", "AB:AC", "AB:BC", "AC:BC", "ABC"] {
            assert!(names.contains(&expected.to_string()), "missing {}", expected);
        }
        assert!(!names.contains(&"AB:AC:BC".to_string()));
        // every model appears exactly once
        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn levels_grow_monotonically_in_bfs_order() {
        let vars = three_vars();
        let entries = Lattice::default().enumerate(&vars);
        for pair in entries.windows(2) {
            assert!(pair[0].level <= pair[1].level);
        }
    }

    #[test]
    fn loopless_filter_drops_reachable_loop_models() {
        // three relations over four variables can close a cycle, e.g.
        // growing AB:BC:CD into AB:BC:ACD
        let mut vars = VariableList::new();
        vars.register("a", "a", 2, false).unwrap();
        vars.register("b", "b", 2, false).unwrap();
        vars.register("c", "c", 2, false).unwrap();
        vars.register("d", "d", 2, false).unwrap();

        let all = Lattice::default().enumerate(&vars);
        assert!(all.iter().any(|e| e.has_loops));

        let loopless = Lattice {
            loopless_only: true,
            ..Lattice::default()
        }
        .enumerate(&vars);

        assert!(loopless.len() < all.len());
        for entry in &loopless {
            assert!(!entry.has_loops);
        }
    }

    #[test]
    fn max_models_bounds_the_walk() {
        let vars = three_vars();
        let capped = Lattice {
            max_models: 4,
            ..Lattice::default()
        }
        .enumerate(&vars);
        assert_eq!(capped.len(), 4);
    }
}
