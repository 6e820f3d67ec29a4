use crate::key::Key;
use crate::relation::Relation;
use crate::types::VariableIndex;
use crate::variable::VariableList;

/// A sparse contingency table: `(Key, f64)` tuples kept sorted ascending by
/// key for read access.
///
/// The write path is append-then-sort: [ContingencyTable::add] is O(1) and
/// does not maintain the order; callers re-establish it with
/// [ContingencyTable::sort] and collapse duplicate keys with
/// [ContingencyTable::sum_into] before searching or projecting.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContingencyTable {
    key_size: usize,
    tuples: Vec<(Key, f64)>,
}

impl ContingencyTable {
    pub fn new(key_size: usize) -> Self {
        ContingencyTable {
            key_size,
            tuples: Vec::new(),
        }
    }

    pub fn with_capacity(key_size: usize, capacity: usize) -> Self {
        ContingencyTable {
            key_size,
            tuples: Vec::with_capacity(capacity),
        }
    }

    /// Build a table from `(assignment row, count)` pairs, sorted and
    /// collapsed. Rows hold one value per registered variable.
    pub fn from_rows<'a>(
        vars: &VariableList,
        rows: impl IntoIterator<Item = (&'a [usize], f64)>,
    ) -> Self {
        let mut table = ContingencyTable::new(vars.key_size());
        for (row, count) in rows {
            table.add(Key::from_values(vars, row), count);
        }
        table.sort();
        table.sum_into();
        table
    }

    pub fn key_size(&self) -> usize {
        self.key_size
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Key, f64)> {
        self.tuples.iter()
    }

    pub fn key_at(&self, index: usize) -> &Key {
        &self.tuples[index].0
    }

    pub fn value_at(&self, index: usize) -> f64 {
        self.tuples[index].1
    }

    /// Append a tuple. Does not maintain sort order.
    pub fn add(&mut self, key: Key, value: f64) {
        debug_assert_eq!(key.key_size(), self.key_size);
        self.tuples.push((key, value));
    }

    /// Stable sort by key.
    pub fn sort(&mut self) {
        self.tuples.sort_by(|a, b| a.0.cmp(&b.0));
    }

    /// Collapse equal adjacent keys by summation. Precondition: sorted.
    pub fn sum_into(&mut self) {
        let mut out: Vec<(Key, f64)> = Vec::with_capacity(self.tuples.len());
        for (key, value) in self.tuples.drain(..) {
            match out.last_mut() {
                Some((last, acc)) if *last == key => *acc += value,
                _ => out.push((key, value)),
            }
        }
        self.tuples = out;
    }

    pub fn sum(&self) -> f64 {
        self.tuples.iter().map(|(_, v)| v).sum()
    }

    /// Divide every value by the total. A zero total is a no-op.
    pub fn normalize(&mut self) {
        let total = self.sum();
        if total == 0.0 {
            return;
        }
        for (_, v) in &mut self.tuples {
            *v /= total;
        }
    }

    /// Scale every value in place.
    pub fn scale(&mut self, factor: f64) {
        for (_, v) in &mut self.tuples {
            *v *= factor;
        }
    }

    /// Binary search for a key. Precondition: sorted.
    pub fn find(&self, key: &Key) -> Option<usize> {
        self.tuples.binary_search_by(|(k, _)| k.cmp(key)).ok()
    }

    /// Value stored under `key`; zero for absent cells. Precondition: sorted.
    pub fn value(&self, key: &Key) -> f64 {
        self.find(key).map_or(0.0, |i| self.tuples[i].1)
    }

    /// Marginalize onto the variables of `rel`: wildcard every other slot,
    /// then sort and collapse. Preserves the table total exactly up to f64
    /// rounding.
    pub fn project(&self, vars: &VariableList, rel: &Relation) -> ContingencyTable {
        let mask = rel.build_mask(vars);
        let mut out = ContingencyTable::with_capacity(self.key_size, self.tuples.len());
        for (key, value) in &self.tuples {
            out.add(key.apply_mask(&mask), *value);
        }
        out.sort();
        out.sum_into();
        out
    }

    /// Marginal of a single variable.
    pub fn marginal(&self, vars: &VariableList, var: VariableIndex) -> ContingencyTable {
        self.project(vars, &Relation::new(vec![var]))
    }

    /// Rewrite each value in place from its key and current value.
    pub fn map_values(&mut self, mut f: impl FnMut(&Key, f64) -> f64) {
        for (key, value) in &mut self.tuples {
            *value = f(key, *value);
        }
    }

    /// Cell-wise `self - other` over the union of keys, absent cells read as
    /// zero. Precondition: both sorted.
    pub fn subtract(&self, other: &ContingencyTable) -> ContingencyTable {
        debug_assert_eq!(self.key_size, other.key_size);
        let mut out = ContingencyTable::with_capacity(
            self.key_size,
            self.tuples.len().max(other.tuples.len()),
        );
        let (mut i, mut j) = (0, 0);
        while i < self.tuples.len() || j < other.tuples.len() {
            match (self.tuples.get(i), other.tuples.get(j)) {
                (Some((ka, va)), Some((kb, vb))) => match ka.cmp(kb) {
                    std::cmp::Ordering::Less => {
                        out.add(ka.clone(), *va);
                        i += 1;
                    }
                    std::cmp::Ordering::Greater => {
                        out.add(kb.clone(), -vb);
                        j += 1;
                    }
                    std::cmp::Ordering::Equal => {
                        out.add(ka.clone(), va - vb);
                        i += 1;
                        j += 1;
                    }
                },
                (Some((ka, va)), None) => {
                    out.add(ka.clone(), *va);
                    i += 1;
                }
                (None, Some((kb, vb))) => {
                    out.add(kb.clone(), -vb);
                    j += 1;
                }
                (None, None) => unreachable!(),
            }
        }
        out
    }

    /// Largest cell-wise absolute difference over the union of keys.
    /// Precondition: both sorted.
    pub fn max_abs_difference(&self, other: &ContingencyTable) -> f64 {
        self.subtract(other)
            .iter()
            .fold(0.0f64, |acc, (_, v)| acc.max(v.abs()))
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
        vars.register("d", "d", 2, false).unwrap();
        vars
    }

    fn rel(ids: &[usize]) -> Relation {
        Relation::new(ids.iter().map(|&i| VariableIndex(i)).collect())
    }

    #[test]
    fn add_sort_sum_into_collapses_duplicates() {
        let vars = four_vars();
        let mut table = ContingencyTable::new(vars.key_size());
        table.add(Key::from_values(&vars, &[1, 0, 0, 0]), 2.0);
        table.add(Key::from_values(&vars, &[0, 1, 0, 0]), 3.0);
        table.add(Key::from_values(&vars, &[1, 0, 0, 0]), 5.0);
        table.sort();
        table.sum_into();

        assert_eq!(table.len(), 2);
        assert_eq!(table.value(&Key::from_values(&vars, &[1, 0, 0, 0])), 7.0);
        assert_eq!(table.value(&Key::from_values(&vars, &[0, 1, 0, 0])), 3.0);
        assert_eq!(table.sum(), 10.0);
    }

    #[test]
    fn normalize_divides_by_total_and_ignores_empty() {
        let vars = four_vars();
        let mut table = ContingencyTable::new(vars.key_size());
        table.add(Key::from_values(&vars, &[0, 0, 0, 0]), 1.0);
        table.add(Key::from_values(&vars, &[2, 1, 1, 1]), 3.0);
        table.sort();
        table.normalize();
        assert!((table.sum() - 1.0).abs() < 1e-12);
        assert_eq!(table.value(&Key::from_values(&vars, &[0, 0, 0, 0])), 0.25);

        let mut empty = ContingencyTable::new(vars.key_size());
        empty.normalize();
        assert!(empty.is_empty());
    }

    #[test]
    fn find_on_sorted_table() {
        let vars = four_vars();
        let table = ContingencyTable::from_rows(
            &vars,
            [
                (&[0usize, 0, 0, 0][..], 1.0),
                (&[1, 1, 0, 1][..], 2.0),
                (&[2, 0, 1, 0][..], 3.0),
            ],
        );
        assert!(table.find(&Key::from_values(&vars, &[1, 1, 0, 1])).is_some());
        assert!(table.find(&Key::from_values(&vars, &[1, 0, 0, 1])).is_none());
        assert_eq!(table.value(&Key::from_values(&vars, &[2, 0, 1, 0])), 3.0);
    }

    #[test]
    fn projection_preserves_sum() {
        let vars = four_vars();
        let mut table = ContingencyTable::new(vars.key_size());
        // deterministic scatter over a third of the state space
        let mut value = 1.0;
        for a in 0..3 {
            for b in 0..2 {
                for c in 0..2 {
                    if (a + b + c) % 3 == 0 {
                        table.add(Key::from_values(&vars, &[a, b, c, (a + b) % 2]), value);
                        value += 0.5;
                    }
                }
            }
        }
        table.sort();
        table.sum_into();
        let total = table.sum();

        for r in [rel(&[0]), rel(&[0, 2]), rel(&[1, 3]), rel(&[0, 1, 2, 3])] {
            let projected = table.project(&vars, &r);
            assert!((projected.sum() - total).abs() < 1e-12);
            assert!(projected.len() as u64 <= r.nc(&vars));
        }
    }

    #[test]
    fn projection_groups_by_member_values() {
        let vars = four_vars();
        let table = ContingencyTable::from_rows(
            &vars,
            [
                (&[0usize, 0, 0, 0][..], 1.0),
                (&[0, 1, 0, 1][..], 2.0),
                (&[0, 0, 1, 0][..], 4.0),
                (&[1, 0, 0, 0][..], 8.0),
            ],
        );
        let onto_a = table.project(&vars, &rel(&[0]));
        let mut a0 = Key::new(vars.key_size());
        a0.set_value(&vars, VariableIndex(0), 0);
        let mut a1 = Key::new(vars.key_size());
        a1.set_value(&vars, VariableIndex(0), 1);

        assert_eq!(onto_a.value(&a0), 7.0);
        assert_eq!(onto_a.value(&a1), 8.0);
    }

    #[test]
    fn projection_onto_empty_relation_collapses_to_one_cell() {
        let vars = four_vars();
        let table = ContingencyTable::from_rows(
            &vars,
            [(&[0usize, 0, 0, 0][..], 1.5), (&[2, 1, 1, 1][..], 2.5)],
        );
        let collapsed = table.project(&vars, &Relation::empty());
        assert_eq!(collapsed.len(), 1);
        assert_eq!(collapsed.value_at(0), 4.0);
    }
}
