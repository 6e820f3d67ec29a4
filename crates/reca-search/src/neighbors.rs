//! Neighbor generation over the model lattice.
//!
//! Three strategies share one shape: given a model and a direction, produce
//! the deduplicated next-door models. Ascending moves strictly raise the
//! degrees of freedom (merge two relations, or grow one by a variable);
//! descending moves strictly lower them (shrink a relation by a variable,
//! or split one off). Directed systems only keep candidates that still give
//! the dependent variables a home.

use reca_core::manager::Direction;
use reca_core::model::{Model, model_df};
use reca_core::relation::Relation;
use reca_core::variable::VariableList;
use std::collections::BTreeMap;

/// A neighbor-generation strategy, dispatched once per search level.
pub trait Neighborhood {
    fn neighbors(&self, vars: &VariableList, model: &Model, direction: Direction) -> Vec<Model>;
}

/// Which strategy a search runs with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NeighborKind {
    #[default]
    Loopless,
    Full,
    Disjoint,
}

impl NeighborKind {
    pub fn generator(&self) -> Box<dyn Neighborhood + Send + Sync> {
        match self {
            NeighborKind::Loopless => Box::new(Loopless),
            NeighborKind::Full => Box::new(Full),
            NeighborKind::Disjoint => Box::new(Disjoint),
        }
    }
}

/// Neighbors restricted to decomposable models.
pub struct Loopless;

/// The unfiltered construction, for exhaustive work on small problems.
pub struct Full;

/// Neighbors restricted to models whose relations share no variable.
pub struct Disjoint;

impl Neighborhood for Full {
    fn neighbors(&self, vars: &VariableList, model: &Model, direction: Direction) -> Vec<Model> {
        finish(vars, model, direction, raw_moves(vars, model, direction))
    }
}

impl Neighborhood for Loopless {
    fn neighbors(&self, vars: &VariableList, model: &Model, direction: Direction) -> Vec<Model> {
        let mut out = finish(vars, model, direction, raw_moves(vars, model, direction));
        out.retain(|m| !m.has_loops(vars));
        out
    }
}

impl Neighborhood for Disjoint {
    fn neighbors(&self, vars: &VariableList, model: &Model, direction: Direction) -> Vec<Model> {
        let moves = match direction {
            // merging two disjoint relations keeps the partition
            Direction::Ascending => merge_moves(model),
            // only clean splits; dropping a variable would lose coverage
            Direction::Descending => split_moves(model),
        };
        let mut out = finish(vars, model, direction, moves);
        out.retain(is_disjoint);
        out
    }
}

fn raw_moves(vars: &VariableList, model: &Model, direction: Direction) -> Vec<Model> {
    match direction {
        Direction::Ascending => {
            let mut moves = merge_moves(model);
            moves.extend(grow_moves(vars, model));
            moves
        }
        Direction::Descending => {
            let mut moves = shrink_moves(model);
            moves.extend(split_moves(model));
            moves
        }
    }
}

/// Replace a relation pair by its union.
fn merge_moves(model: &Model) -> Vec<Model> {
    let relations = model.relations();
    let mut out = Vec::new();
    for i in 0..relations.len() {
        for j in (i + 1)..relations.len() {
            let mut next: Vec<Relation> = Vec::with_capacity(relations.len() - 1);
            for (k, r) in relations.iter().enumerate() {
                if k != i && k != j {
                    next.push(r.clone());
                }
            }
            next.push(relations[i].union(&relations[j]));
            out.push(Model::new(next).simplified());
        }
    }
    out
}

/// Grow one relation by one absent variable.
fn grow_moves(vars: &VariableList, model: &Model) -> Vec<Model> {
    let relations = model.relations();
    let mut out = Vec::new();
    for (i, relation) in relations.iter().enumerate() {
        for v in vars.indices() {
            if relation.contains(v) {
                continue;
            }
            let mut next = relations.to_vec();
            next[i] = relation.union(&Relation::new(vec![v]));
            out.push(Model::new(next).simplified());
        }
    }
    out
}

/// Remove one variable from one relation.
fn shrink_moves(model: &Model) -> Vec<Model> {
    let relations = model.relations();
    let mut out = Vec::new();
    for (i, relation) in relations.iter().enumerate() {
        if relation.len() < 2 {
            continue;
        }
        for v in relation.vars().iter().copied() {
            let mut next = relations.to_vec();
            next[i] = relation.without(v);
            out.push(Model::new(next).simplified());
        }
    }
    out
}

/// Split one variable off a relation into its own group.
fn split_moves(model: &Model) -> Vec<Model> {
    let relations = model.relations();
    let mut out = Vec::new();
    for (i, relation) in relations.iter().enumerate() {
        if relation.len() < 2 {
            continue;
        }
        for v in relation.vars().iter().copied() {
            let mut next = relations.to_vec();
            next[i] = relation.without(v);
            next.push(Relation::new(vec![v]));
            out.push(Model::new(next).simplified());
        }
    }
    out
}

/// Dedup by print name, drop the seed itself, and enforce the monotone-DF
/// and directed-coverage invariants.
fn finish(
    vars: &VariableList,
    model: &Model,
    direction: Direction,
    moves: Vec<Model>,
) -> Vec<Model> {
    let seed_name = model.print_name(vars);
    let seed_df = model_df(model, vars);
    let directed = vars.is_directed();

    let mut unique: BTreeMap<String, Model> = BTreeMap::new();
    for candidate in moves {
        let name = candidate.print_name(vars);
        if name == seed_name || unique.contains_key(&name) {
            continue;
        }
        let df = model_df(&candidate, vars);
        let monotone = match direction {
            Direction::Ascending => df > seed_df,
            Direction::Descending => df < seed_df,
        };
        if !monotone {
            continue;
        }
        if directed && !candidate.contains_dependent(vars) {
            continue;
        }
        unique.insert(name, candidate);
    }
    unique.into_values().collect()
}

fn is_disjoint(model: &Model) -> bool {
    let relations = model.relations();
    for i in 0..relations.len() {
        for j in (i + 1)..relations.len() {
            if relations[i].overlaps(&relations[j]) {
                return false;
            }
        }
    }
    true
}
