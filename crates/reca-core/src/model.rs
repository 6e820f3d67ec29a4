use crate::junction::build_junction_tree;
use crate::relation::Relation;
use crate::variable::VariableList;
use reca_error::{RecaError, RecaResult};

/// A structural model: a hypergraph of relations whose marginals jointly
/// constrain a factorized distribution.
///
/// Construction canonicalizes: relations are sorted lexicographically by
/// their variable-index sequences and exact duplicates are removed, so two
/// models over the same relations always compare equal and share a print
/// name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Model {
    relations: Vec<Relation>,
}

impl Model {
    pub fn new(mut relations: Vec<Relation>) -> Self {
        relations.sort();
        relations.dedup();
        Model { relations }
    }

    pub fn empty() -> Self {
        Model {
            relations: Vec::new(),
        }
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// The variables covered by at least one relation.
    pub fn covered_vars(&self) -> Relation {
        self.relations
            .iter()
            .fold(Relation::empty(), |acc, r| acc.union(r))
    }

    /// Canonical `:`-joined name, e.g. `"AC:BD"`.
    pub fn print_name(&self, vars: &VariableList) -> String {
        self.relations
            .iter()
            .map(|r| r.print_name(vars))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Drop relations that are proper subsets of another, then
    /// re-canonicalize.
    pub fn simplified(&self) -> Model {
        let mut relations = self.relations.clone();
        simplify_relations(&mut relations);
        Model::new(relations)
    }

    /// Decomposability test: true when the junction graph of the relations
    /// admits no running-intersection spanning tree (see
    /// [build_junction_tree]).
    pub fn has_loops(&self, vars: &VariableList) -> bool {
        !build_junction_tree(self, vars).valid
    }

    pub fn contains_dependent(&self, vars: &VariableList) -> bool {
        self.relations.iter().any(|r| r.contains_dependent(vars))
    }

    /// The reference model at the bottom of the lattice. Neutral systems get
    /// full independence; directed systems get the IV set joined with the
    /// DV set kept apart.
    pub fn bottom_reference(vars: &VariableList) -> Model {
        if vars.is_directed() {
            let iv = Relation::new(vars.independent_indices());
            let dv = Relation::new(vars.dependent_indices());
            Model::new(vec![iv, dv])
        } else {
            Model::new(
                vars.indices()
                    .map(|i| Relation::new(vec![i]))
                    .collect(),
            )
        }
    }

    /// The saturated model: a single relation over every variable.
    pub fn top_reference(vars: &VariableList) -> Model {
        Model::new(vec![Relation::new(vars.indices().collect())])
    }

    /// Parse colon-separated abbreviation groups, e.g. `"AB:BC"`. Each
    /// character of a group is looked up case-insensitively. The result is
    /// simplified. Empty or whitespace-only specs are rejected here; the
    /// manager maps them to its default reference model first.
    pub fn parse(spec: &str, vars: &VariableList) -> RecaResult<Model> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(RecaError::model_spec(
                spec.to_string(),
                "empty model specification",
            ));
        }
        let mut relations = Vec::new();
        for group in spec.split(':') {
            let group = group.trim();
            if group.is_empty() {
                return Err(RecaError::model_spec(
                    group.to_string(),
                    "empty relation group",
                ));
            }
            let mut members = Vec::new();
            for ch in group.chars() {
                match vars.by_abbrev(&ch.to_string()) {
                    Some(index) => members.push(index),
                    None => {
                        return Err(RecaError::model_spec(
                            ch.to_string(),
                            "unknown abbreviation",
                        ));
                    }
                }
            }
            relations.push(Relation::new(members));
        }
        simplify_relations(&mut relations);
        Ok(Model::new(relations))
    }
}

/// Remove relations that are proper subsets of another relation in the
/// list. Equal relations are not proper subsets of each other, so identical
/// duplicates both survive.
pub fn simplify_relations(relations: &mut Vec<Relation>) {
    let snapshot = relations.clone();
    relations.retain(|r| !snapshot.iter().any(|other| r.is_proper_subset_of(other)));
}

/// Degrees of freedom of a model by inclusion-exclusion over the relation
/// hypergraph: `sum over non-empty subsets S of (-1)^(|S|+1) * (NC(inter S) - 1)`,
/// where subsets with an empty variable intersection contribute nothing.
///
/// Subsets are walked depth-first with the running intersection threaded
/// through, so branches go dead as soon as the intersection empties; for
/// tree-like models the walk is quadratic rather than exponential.
pub fn model_df(model: &Model, vars: &VariableList) -> i64 {
    fn walk(
        relations: &[Relation],
        vars: &VariableList,
        start: usize,
        inter: &Relation,
        depth: usize,
        total: &mut i64,
    ) {
        for i in start..relations.len() {
            let next = if depth == 0 {
                relations[i].clone()
            } else {
                inter.intersection(&relations[i])
            };
            if depth > 0 && next.is_empty() {
                continue;
            }
            let sign = if depth % 2 == 0 { 1 } else { -1 };
            *total += sign * next.df(vars);
            walk(relations, vars, i + 1, &next, depth + 1, total);
        }
    }

    let mut total = 0;
    walk(model.relations(), vars, 0, &Relation::empty(), 0, &mut total);
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VariableIndex;

    fn four_vars() -> VariableList {
        let mut vars = VariableList::new();
        vars.register("a", "a", 3, false).unwrap();
        vars.register("b", "b", 2, false).unwrap();
        vars.register("c", "c", 2, false).unwrap();
        vars.register("d", "d", 2, false).unwrap();
        vars
    }

    fn directed_vars() -> VariableList {
        let mut vars = VariableList::new();
        vars.register("a", "a", 3, false).unwrap();
        vars.register("b", "b", 2, false).unwrap();
        vars.register("z", "z", 2, true).unwrap();
        vars
    }

    fn rel(ids: &[usize]) -> Relation {
        Relation::new(ids.iter().map(|&i| VariableIndex(i)).collect())
    }

    #[test]
    fn construction_canonicalizes() {
        let vars = four_vars();
        let m1 = Model::new(vec![rel(&[1, 3]), rel(&[0, 2]), rel(&[1, 3])]);
        let m2 = Model::new(vec![rel(&[0, 2]), rel(&[1, 3])]);
        assert_eq!(m1, m2);
        assert_eq!(m1.print_name(&vars), "AC:BD");
    }

    #[test]
    fn simplify_drops_proper_subsets_only() {
        let mut relations = vec![rel(&[0, 1]), rel(&[0, 1, 2]), rel(&[3])];
        simplify_relations(&mut relations);
        assert_eq!(relations, vec![rel(&[0, 1, 2]), rel(&[3])]);

        // equal relations are not proper subsets of one another: both stay
        let mut twins = vec![rel(&[0, 1]), rel(&[0, 1])];
        simplify_relations(&mut twins);
        assert_eq!(twins.len(), 2);
    }

    #[test]
    fn parse_round_trips_print_name() {
        let vars = four_vars();
        let model = Model::parse("ab:bc", &vars).unwrap();
        assert_eq!(model.print_name(&vars), "AB:BC");

        let simplified = Model::parse("AB:ABC", &vars).unwrap();
        assert_eq!(simplified.print_name(&vars), "ABC");
    }

    #[test]
    fn parse_names_the_offending_token() {
        let vars = four_vars();
        let err = Model::parse("AB:XQ", &vars).unwrap_err();
        assert_eq!(err.token(), Some("X"));

        let err = Model::parse("AB::BC", &vars).unwrap_err();
        assert!(err.to_string().contains("empty relation group"));

        assert!(Model::parse("  ", &vars).is_err());
    }

    #[test]
    fn reference_models_neutral() {
        let vars = four_vars();
        assert_eq!(Model::bottom_reference(&vars).print_name(&vars), "A:B:C:D");
        assert_eq!(Model::top_reference(&vars).print_name(&vars), "ABCD");
    }

    #[test]
    fn reference_models_directed() {
        let vars = directed_vars();
        assert_eq!(Model::bottom_reference(&vars).print_name(&vars), "AB:Z");
        assert_eq!(Model::top_reference(&vars).print_name(&vars), "ABZ");
        assert!(Model::bottom_reference(&vars).contains_dependent(&vars));
    }

    #[test]
    fn df_matches_known_reductions() {
        let vars = four_vars();
        // saturated: prod(c) - 1
        assert_eq!(model_df(&Model::top_reference(&vars), &vars), 23);
        // independence: sum(c - 1)
        assert_eq!(model_df(&Model::bottom_reference(&vars), &vars), 5);
        // chain AB:BC: DF(AB) + DF(BC) - DF(B)
        let chain = Model::parse("AB:BC", &vars).unwrap();
        assert_eq!(model_df(&chain, &vars), 5 + 3 - 1);
        // disjoint AC:BD: DF(AC) + DF(BD)
        let disjoint = Model::parse("AC:BD", &vars).unwrap();
        assert_eq!(model_df(&disjoint, &vars), 5 + 3);
        // triangle of triples over ABCD
        let triangle = Model::parse("ABD:ACD:BCD", &vars).unwrap();
        assert_eq!(model_df(&triangle, &vars), 19);
        // empty model
        assert_eq!(model_df(&Model::empty(), &vars), 0);
    }

    #[test]
    fn df_ignores_cardinality_one_variables() {
        let mut vars = VariableList::new();
        vars.register("a", "a", 3, false).unwrap();
        vars.register("u", "u", 1, false).unwrap();
        let bottom = Model::bottom_reference(&vars);
        assert_eq!(model_df(&bottom, &vars), 2);
    }
}
