//! Sum-product belief propagation on a junction tree.
//!
//! Clique potentials are seeded with projections of the input distribution
//! and separator potentials with the projections onto each edge's
//! separator, so the tree starts out as the decomposable factorization
//! `product(psi_C) / product(phi_S)` of the maximum-entropy fit. The
//! collect and distribute passes then re-derive every separator from the
//! current clique potentials, multiplying each receiver by
//! `extend(mu) / extend(phi_old)`; on consistent projections the passes are
//! exact no-ops, and with degenerate (zero) separator cells the `0/0 := 0`
//! rule keeps the sweep safe. The reconstructed joint equals the IPF fit on
//! every decomposable model.

use crate::junction::JunctionTree;
use crate::key::{Key, StateIter};
use crate::table::ContingencyTable;
use crate::types::VariableIndex;
use crate::variable::VariableList;

const ZERO_EPS: f64 = 1e-300;

#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BpConfig {
    /// Divide each clique potential by its sum after propagation.
    pub normalize: bool,
}

/// Calibrated potentials after a collect/distribute sweep.
#[derive(Clone, Debug)]
pub struct BpResult {
    pub clique_potentials: Vec<ContingencyTable>,
    pub separator_potentials: Vec<ContingencyTable>,
    pub converged: bool,
}

/// Run one collect/distribute sweep over `tree` seeded from `input`.
///
/// `input` is expected normalized and sorted; potentials come out sorted.
pub fn propagate(
    input: &ContingencyTable,
    vars: &VariableList,
    tree: &JunctionTree,
    config: BpConfig,
) -> BpResult {
    let mut cliques: Vec<ContingencyTable> = tree
        .cliques()
        .iter()
        .map(|c| input.project(vars, c))
        .collect();
    let mut separators: Vec<ContingencyTable> = tree
        .edges()
        .iter()
        .map(|e| input.project(vars, &e.separator))
        .collect();
    let separator_masks: Vec<Key> = tree
        .edges()
        .iter()
        .map(|e| e.separator.build_mask(vars))
        .collect();

    // collect: child messages flow toward each component root
    for &(node, parent_edge) in tree.post_order() {
        let Some(edge) = parent_edge else { continue };
        let parent = tree.neighbor_of(edge, node);
        let message = cliques[node].project(vars, &tree.edges()[edge].separator);
        absorb(
            &mut cliques[parent],
            &separators[edge],
            &message,
            &separator_masks[edge],
        );
        separators[edge] = message;
    }

    // distribute: the symmetric pass from the roots outward
    for &(node, parent_edge) in tree.pre_order() {
        let Some(edge) = parent_edge else { continue };
        let parent = tree.neighbor_of(edge, node);
        let message = cliques[parent].project(vars, &tree.edges()[edge].separator);
        absorb(
            &mut cliques[node],
            &separators[edge],
            &message,
            &separator_masks[edge],
        );
        separators[edge] = message;
    }

    if config.normalize {
        for clique in &mut cliques {
            clique.normalize();
        }
    }

    BpResult {
        clique_potentials: cliques,
        separator_potentials: separators,
        converged: true,
    }
}

/// Multiply `target` cell-wise by `extend(message) / extend(old)` over the
/// separator slots. Zero denominators zero the cell: a vanished separator
/// marginal implies a vanished numerator.
fn absorb(
    target: &mut ContingencyTable,
    old: &ContingencyTable,
    message: &ContingencyTable,
    separator_mask: &Key,
) {
    target.map_values(|key, value| {
        let slot = key.apply_mask(separator_mask);
        let denominator = old.value(&slot);
        if denominator.abs() > ZERO_EPS {
            value * message.value(&slot) / denominator
        } else {
            0.0
        }
    });
}

/// Expand the calibrated tree into a joint distribution over the full state
/// space: `product(psi_C) / product(phi_S)` per assignment, with variables
/// no clique covers spread uniformly.
pub fn joint_table(
    result: &BpResult,
    tree: &JunctionTree,
    vars: &VariableList,
) -> ContingencyTable {
    let clique_masks: Vec<Key> = tree
        .cliques()
        .iter()
        .map(|c| c.build_mask(vars))
        .collect();
    let separator_masks: Vec<Key> = tree
        .edges()
        .iter()
        .map(|e| e.separator.build_mask(vars))
        .collect();

    let covered = tree
        .cliques()
        .iter()
        .fold(crate::relation::Relation::empty(), |acc, c| acc.union(c));
    let uncovered_states: f64 = vars
        .indices()
        .filter(|v| !covered.contains(*v))
        .map(|v| vars.var(v).cardinality().get() as f64)
        .product();

    let mut joint = ContingencyTable::new(vars.key_size());
    'states: for key in StateIter::new(vars) {
        let mut value = 1.0;
        for (potential, mask) in result.clique_potentials.iter().zip(&clique_masks) {
            value *= potential.value(&key.apply_mask(mask));
            if value == 0.0 {
                continue 'states;
            }
        }
        for (potential, mask) in result.separator_potentials.iter().zip(&separator_masks) {
            let denominator = potential.value(&key.apply_mask(mask));
            if denominator.abs() > ZERO_EPS {
                value /= denominator;
            } else {
                continue 'states;
            }
        }
        joint.add(key, value / uncovered_states);
    }
    joint
}

/// Marginal of one variable read off the smallest containing clique.
/// `None` when no clique covers the variable.
pub fn marginal_of(
    result: &BpResult,
    tree: &JunctionTree,
    vars: &VariableList,
    var: VariableIndex,
) -> Option<ContingencyTable> {
    let clique = tree.smallest_clique_containing(var)?;
    Some(result.clique_potentials[clique].marginal(vars, var))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::junction::build_junction_tree;
    use crate::model::Model;
    use crate::stats::entropy;

    fn four_vars() -> VariableList {
        let mut vars = VariableList::new();
        vars.register("a", "a", 3, false).unwrap();
        vars.register("b", "b", 2, false).unwrap();
        vars.register("c", "c", 2, false).unwrap();
        vars.register("d", "d", 2, false).unwrap();
        vars
    }

    fn skewed_table(vars: &VariableList) -> ContingencyTable {
        let mut table = ContingencyTable::new(vars.key_size());
        let mut weight = 1.0;
        for key in StateIter::new(vars) {
            table.add(key, weight);
            weight = (weight * 1.37) % 5.0 + 0.25;
        }
        table.sort();
        table.normalize();
        table
    }

    fn fit(vars: &VariableList, table: &ContingencyTable, spec: &str) -> ContingencyTable {
        let model = Model::parse(spec, vars).unwrap();
        let build = build_junction_tree(&model, vars);
        assert!(build.valid, "{} should be decomposable", spec);
        let tree = build.tree.unwrap();
        let result = propagate(table, vars, &tree, BpConfig::default());
        joint_table(&result, &tree, vars)
    }

    #[test]
    fn saturated_fit_reproduces_the_input() {
        let vars = four_vars();
        let table = skewed_table(&vars);
        let joint = fit(&vars, &table, "ABCD");
        assert!(table.max_abs_difference(&joint) < 1e-12);
    }

    #[test]
    fn independence_fit_is_the_product_of_marginals() {
        let vars = four_vars();
        let table = skewed_table(&vars);
        let joint = fit(&vars, &table, "A:B:C:D");

        let marginals: Vec<ContingencyTable> = vars
            .indices()
            .map(|v| table.marginal(&vars, v))
            .collect();
        for key in StateIter::new(&vars) {
            let expected: f64 = vars
                .indices()
                .map(|v| {
                    marginals[v.index()]
                        .value(&key.apply_mask(&crate::relation::Relation::new(vec![v]).build_mask(&vars)))
                })
                .product();
            assert!((joint.value(&key) - expected).abs() < 1e-12);
        }

        let h_sum: f64 = marginals.iter().map(entropy).sum();
        assert!((entropy(&joint) - h_sum).abs() < 1e-10);
    }

    #[test]
    fn chain_fit_matches_the_closed_form() {
        let vars = four_vars();
        let table = skewed_table(&vars);
        let joint = fit(&vars, &table, "AB:BC:CD");
        assert!((joint.sum() - 1.0).abs() < 1e-10);

        // H = sum H(clique) - sum H(separator)
        let model = Model::parse("AB:BC:CD", &vars).unwrap();
        let tree = build_junction_tree(&model, &vars).tree.unwrap();
        let mut expected = 0.0;
        for clique in tree.cliques() {
            expected += entropy(&table.project(&vars, clique));
        }
        for edge in tree.edges() {
            expected -= entropy(&table.project(&vars, &edge.separator));
        }
        assert!((entropy(&joint) - expected).abs() < 1e-10);
    }

    #[test]
    fn propagation_leaves_projection_consistent_potentials_calibrated() {
        let vars = four_vars();
        let table = skewed_table(&vars);
        let model = Model::parse("AC:BD:CD", &vars).unwrap();
        let tree = build_junction_tree(&model, &vars).tree.unwrap();
        let result = propagate(&table, &vars, &tree, BpConfig::default());

        for (clique, potential) in tree.cliques().iter().zip(&result.clique_potentials) {
            let target = table.project(&vars, clique);
            assert!(target.max_abs_difference(potential) < 1e-12);
        }
        for (edge, potential) in tree.edges().iter().zip(&result.separator_potentials) {
            let target = table.project(&vars, &edge.separator);
            assert!(target.max_abs_difference(potential) < 1e-12);
        }
    }

    #[test]
    fn uncovered_variables_expand_uniformly() {
        let vars = four_vars();
        let table = skewed_table(&vars);
        let joint = fit(&vars, &table, "AB:BC");
        assert!((joint.sum() - 1.0).abs() < 1e-10);

        // every D-slice of a covered assignment carries equal mass
        for key in StateIter::new(&vars) {
            let mut flipped = key.clone();
            let d = VariableIndex(3);
            flipped.set_value(&vars, d, 1 - key.get_value(&vars, d));
            assert!((joint.value(&key) - joint.value(&flipped)).abs() < 1e-12);
        }
    }

    #[test]
    fn marginal_queries_read_the_smallest_clique() {
        let vars = four_vars();
        let table = skewed_table(&vars);
        let model = Model::parse("AB:BC:CD", &vars).unwrap();
        let tree = build_junction_tree(&model, &vars).tree.unwrap();
        let result = propagate(&table, &vars, &tree, BpConfig::default());

        let marginal = marginal_of(&result, &tree, &vars, VariableIndex(1)).unwrap();
        let expected = table.marginal(&vars, VariableIndex(1));
        assert!(marginal.max_abs_difference(&expected) < 1e-12);
    }

    #[test]
    fn normalize_divides_each_potential_by_its_sum() {
        let vars = four_vars();
        let mut table = skewed_table(&vars);
        table.scale(4.0);
        let model = Model::parse("AB:CD", &vars).unwrap();
        let tree = build_junction_tree(&model, &vars).tree.unwrap();
        let result = propagate(&table, &vars, &tree, BpConfig { normalize: true });
        for potential in &result.clique_potentials {
            assert!((potential.sum() - 1.0).abs() < 1e-10);
        }
    }
}
