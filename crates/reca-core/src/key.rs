use crate::types::{KeySegment, VariableIndex};
use crate::variable::VariableList;
use smallvec::{SmallVec, smallvec};
use std::fmt::{self, Debug, Formatter};

/// A packed joint assignment: one slot per variable across `key_size`
/// segments. A slot holding its all-ones codeword is `DontCare` — the slot
/// is a wildcard, distinct from every valid value.
///
/// Ordering is lexicographic on segments (first segment most significant),
/// which makes sorted tables binary-searchable by key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Key {
    segments: SmallVec<[KeySegment; 4]>,
}

impl Key {
    /// A key with every slot set to `DontCare` (all ones).
    pub fn new(key_size: usize) -> Self {
        Key {
            segments: smallvec![KeySegment::MAX; key_size],
        }
    }

    /// Build a fully-defined key from one value per registered variable.
    pub fn from_values(vars: &VariableList, values: &[usize]) -> Self {
        debug_assert_eq!(values.len(), vars.len());
        let mut key = Key::new(vars.key_size());
        for (i, &value) in values.iter().enumerate() {
            key.set_value(vars, VariableIndex(i), value);
        }
        key
    }

    pub fn key_size(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.segments
    }

    /// Write `value` into the slot of `var`. Values `0..c` are valid states;
    /// writing the slot's `DontCare` codeword explicitly is also allowed.
    pub fn set_value(&mut self, vars: &VariableList, var: VariableIndex, value: usize) {
        let v = vars.var(var);
        debug_assert!(
            value <= v.dont_care(),
            "value {} does not fit the {}-bit slot of '{}'",
            value,
            v.bit_size(),
            v.abbrev()
        );
        let seg = &mut self.segments[v.segment().index()];
        *seg = (*seg & !v.mask()) | ((value as KeySegment) << v.shift().get());
    }

    /// Read the integer in the slot of `var`; the `DontCare` codeword when
    /// the slot is unset.
    pub fn get_value(&self, vars: &VariableList, var: VariableIndex) -> usize {
        let v = vars.var(var);
        ((self.segments[v.segment().index()] & v.mask()) >> v.shift().get()) as usize
    }

    /// True when the slot of `var` holds the wildcard codeword.
    pub fn is_dont_care(&self, vars: &VariableList, var: VariableIndex) -> bool {
        self.get_value(vars, var) == vars.var(var).dont_care()
    }

    /// Projection mask for a set of member variables: ones over their
    /// slots, zeroes elsewhere. Applying it keeps the members and
    /// wildcards every other position.
    pub fn projection_mask(vars: &VariableList, members: &[VariableIndex]) -> Key {
        let mut segments: SmallVec<[KeySegment; 4]> = smallvec![0; vars.key_size()];
        for v in members {
            let var = vars.var(*v);
            segments[var.segment().index()] |= var.mask();
        }
        Key { segments }
    }

    /// Project onto a mask: positions outside the mask become `DontCare`.
    pub fn apply_mask(&self, mask: &Key) -> Key {
        debug_assert_eq!(self.key_size(), mask.key_size());
        let segments = self
            .segments
            .iter()
            .zip(mask.segments.iter())
            .map(|(seg, m)| (seg & m) | !m)
            .collect();
        Key { segments }
    }

    /// Bitwise match: segment-by-segment, every differing bit must sit where
    /// both keys carry a one. Keys of different widths never match. Agrees
    /// with [Key::matches_with] on fully-defined keys and on keys projected
    /// through the same mask.
    pub fn matches(&self, other: &Key) -> bool {
        if self.key_size() != other.key_size() {
            return false;
        }
        self.segments
            .iter()
            .zip(other.segments.iter())
            .all(|(a, b)| (a ^ b) & !(a & b) == 0)
    }

    /// Slot-by-slot match: each variable's values are equal, or at least one
    /// side is `DontCare`.
    pub fn matches_with(&self, other: &Key, vars: &VariableList) -> bool {
        if self.key_size() != other.key_size() {
            return false;
        }
        vars.indices().all(|i| {
            let (a, b) = (self.get_value(vars, i), other.get_value(vars, i));
            let dc = vars.var(i).dont_care();
            a == b || a == dc || b == dc
        })
    }
}

/// Iterator over every fully-defined key of a variable list's state space,
/// in ascending key order (earlier variables vary slowest).
pub struct StateIter<'a> {
    vars: &'a VariableList,
    counters: Vec<usize>,
    done: bool,
}

impl<'a> StateIter<'a> {
    pub fn new(vars: &'a VariableList) -> Self {
        StateIter {
            vars,
            counters: vec![0; vars.len()],
            done: vars.iter().any(|v| v.cardinality().get() == 0),
        }
    }
}

impl Iterator for StateIter<'_> {
    type Item = Key;

    fn next(&mut self) -> Option<Key> {
        if self.done {
            return None;
        }
        let key = Key::from_values(self.vars, &self.counters);
        // odometer: last variable fastest
        let mut carry = true;
        for i in (0..self.counters.len()).rev() {
            if !carry {
                break;
            }
            self.counters[i] += 1;
            if self.counters[i] == self.vars.var(VariableIndex(i)).cardinality().get() {
                self.counters[i] = 0;
            } else {
                carry = false;
            }
        }
        if carry {
            self.done = true;
        }
        Some(key)
    }
}

impl Debug for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Key[")?;
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:08x}", seg)?;
        }
        write!(f, "]")
    }
}
