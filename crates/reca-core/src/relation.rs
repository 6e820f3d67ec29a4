use crate::key::Key;
use crate::types::VariableIndex;
use crate::variable::VariableList;
use std::fmt::Write as _;

/// A hyperedge: a sorted set of variable indices.
///
/// Two relations over the same variables compare equal regardless of the
/// order they were built in.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Relation {
    vars: Vec<VariableIndex>,
}

impl Relation {
    pub fn new(mut vars: Vec<VariableIndex>) -> Self {
        vars.sort_unstable();
        vars.dedup();
        Relation { vars }
    }

    pub fn empty() -> Self {
        Relation { vars: Vec::new() }
    }

    pub fn vars(&self) -> &[VariableIndex] {
        &self.vars
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn contains(&self, var: VariableIndex) -> bool {
        self.vars.binary_search(&var).is_ok()
    }

    pub fn is_subset_of(&self, other: &Relation) -> bool {
        self.vars.iter().all(|v| other.contains(*v))
    }

    pub fn is_proper_subset_of(&self, other: &Relation) -> bool {
        self.len() < other.len() && self.is_subset_of(other)
    }

    pub fn overlaps(&self, other: &Relation) -> bool {
        self.vars.iter().any(|v| other.contains(*v))
    }

    pub fn union(&self, other: &Relation) -> Relation {
        let mut vars = self.vars.clone();
        vars.extend_from_slice(&other.vars);
        Relation::new(vars)
    }

    pub fn intersection(&self, other: &Relation) -> Relation {
        Relation {
            vars: self
                .vars
                .iter()
                .copied()
                .filter(|v| other.contains(*v))
                .collect(),
        }
    }

    /// Variables in `self` that are not in `other`.
    pub fn difference(&self, other: &Relation) -> Relation {
        Relation {
            vars: self
                .vars
                .iter()
                .copied()
                .filter(|v| !other.contains(*v))
                .collect(),
        }
    }

    /// Remove one variable, keeping order.
    pub fn without(&self, var: VariableIndex) -> Relation {
        Relation {
            vars: self.vars.iter().copied().filter(|v| *v != var).collect(),
        }
    }

    /// State-space size of the relation: the product of member cardinalities.
    pub fn nc(&self, vars: &VariableList) -> u64 {
        self.vars
            .iter()
            .map(|v| vars.var(*v).cardinality().get() as u64)
            .product()
    }

    /// Independence degrees of freedom, `nc - 1`.
    pub fn df(&self, vars: &VariableList) -> i64 {
        self.nc(vars) as i64 - 1
    }

    /// Projection mask: ones over member slots, zeroes elsewhere. Applying
    /// it to a key wildcards every non-member variable.
    pub fn build_mask(&self, vars: &VariableList) -> Key {
        Key::projection_mask(vars, &self.vars)
    }

    pub fn contains_dependent(&self, vars: &VariableList) -> bool {
        self.vars.iter().any(|v| vars.var(*v).is_dependent())
    }

    pub fn is_independent_only(&self, vars: &VariableList) -> bool {
        !self.contains_dependent(vars)
    }

    pub fn is_dependent_only(&self, vars: &VariableList) -> bool {
        !self.is_empty() && self.vars.iter().all(|v| vars.var(*v).is_dependent())
    }

    /// Concatenated abbreviations, e.g. `"Abd"` for variables A, B, D.
    pub fn print_name(&self, vars: &VariableList) -> String {
        let mut name = String::new();
        for v in &self.vars {
            let _ = write!(name, "{}", vars.var(*v).abbrev());
        }
        name
    }

    /// Canonical comma-joined index key, used by relation caches.
    pub fn cache_key(&self) -> String {
        let mut key = String::new();
        for (i, v) in self.vars.iter().enumerate() {
            if i > 0 {
                key.push(',');
            }
            let _ = write!(key, "{}", v.index());
        }
        key
    }
}

impl FromIterator<VariableIndex> for Relation {
    fn from_iter<T: IntoIterator<Item = VariableIndex>>(iter: T) -> Self {
        Relation::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_vars() -> VariableList {
        let mut vars = VariableList::new();
        vars.register("a", "a", 3, false).unwrap();
        vars.register("b", "b", 2, false).unwrap();
        vars.register("c", "c", 2, false).unwrap();
        vars.register("d", "d", 2, true).unwrap();
        vars
    }

    fn rel(ids: &[usize]) -> Relation {
        Relation::new(ids.iter().map(|&i| VariableIndex(i)).collect())
    }

    #[test]
    fn construction_order_does_not_matter() {
        let a = rel(&[2, 0, 1]);
        let b = rel(&[0, 1, 2]);
        assert_eq!(a, b);
        assert_eq!(a.cache_key(), "0,1,2");
    }

    #[test]
    fn set_algebra() {
        let ab = rel(&[0, 1]);
        let bc = rel(&[1, 2]);

        assert!(ab.overlaps(&bc));
        assert_eq!(ab.union(&bc), rel(&[0, 1, 2]));
        assert_eq!(ab.intersection(&bc), rel(&[1]));
        assert_eq!(ab.difference(&bc), rel(&[0]));
        assert!(rel(&[1]).is_proper_subset_of(&bc));
        assert!(!bc.is_proper_subset_of(&bc));
        assert!(bc.is_subset_of(&bc));
    }

    #[test]
    fn nc_and_df() {
        let vars = four_vars();
        assert_eq!(rel(&[0, 2]).nc(&vars), 6);
        assert_eq!(rel(&[0, 2]).df(&vars), 5);
        assert_eq!(rel(&[]).nc(&vars), 1);
        assert_eq!(rel(&[]).df(&vars), 0);
    }

    #[test]
    fn dependent_queries() {
        let vars = four_vars();
        assert!(rel(&[0, 3]).contains_dependent(&vars));
        assert!(rel(&[0, 1]).is_independent_only(&vars));
        assert!(rel(&[3]).is_dependent_only(&vars));
        assert!(!rel(&[0, 3]).is_dependent_only(&vars));
    }

    #[test]
    fn print_name_concatenates_abbrevs() {
        let vars = four_vars();
        assert_eq!(rel(&[0, 1, 3]).print_name(&vars), "ABD");
    }
}
