use crate::types::{BitShift, Cardinality, KeySegment, SEGMENT_BITS, SegmentIndex, VariableIndex};
use reca_error::{RecaResult, reca_bail};
use std::fmt::{self, Display, Formatter};

/// A categorical variable and its packed bit-slot within a key.
///
/// Immutable after registration: the packing fields (`segment`, `shift`,
/// `mask`) are derived once by [VariableList::register] and never move.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variable {
    name: String,
    abbrev: String,
    cardinality: Cardinality,
    is_dependent: bool,
    bit_size: u32,
    segment: SegmentIndex,
    shift: BitShift,
    mask: KeySegment,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abbrev(&self) -> &str {
        &self.abbrev
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn is_dependent(&self) -> bool {
        self.is_dependent
    }

    pub fn bit_size(&self) -> u32 {
        self.bit_size
    }

    pub fn segment(&self) -> SegmentIndex {
        self.segment
    }

    pub fn shift(&self) -> BitShift {
        self.shift
    }

    /// Ones over this variable's slot, zeroes elsewhere.
    pub fn mask(&self) -> KeySegment {
        self.mask
    }

    /// The all-ones wildcard codeword for this variable's slot.
    pub fn dont_care(&self) -> usize {
        crate::types::dont_care(self.bit_size)
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, c={})", self.name, self.abbrev, self.cardinality)
    }
}

fn title_case(abbrev: &str) -> String {
    let mut chars = abbrev.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Ordered sequence of variables plus the bit-packing cursor that assigns
/// each one a slot inside a fixed-width key.
///
/// Registration packs slots left-to-right (most significant first) within
/// 32-bit segments, opening a new segment whenever the next variable does
/// not fit in the remaining bits. Slots never overlap and never straddle a
/// segment boundary, so every variable can be read with one shift-and-mask.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableList {
    variables: Vec<Variable>,
    key_size: usize,
    cursor_shift: u32,
}

impl VariableList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variable and allocate its slot.
    ///
    /// The abbreviation is case-folded to Title-case and must be unique
    /// (case-insensitively) among the registered variables.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        abbrev: impl Into<String>,
        cardinality: usize,
        is_dependent: bool,
    ) -> RecaResult<VariableIndex> {
        let name = name.into();
        let abbrev = title_case(&abbrev.into());
        if cardinality == 0 {
            reca_bail!(Variable: "variable '{}' has zero cardinality", name);
        }
        if abbrev.is_empty() {
            reca_bail!(Variable: "variable '{}' has an empty abbreviation", name);
        }
        if self.variables.iter().any(|v| v.abbrev == abbrev) {
            reca_bail!(Variable: "abbreviation '{}' already registered", abbrev);
        }

        let cardinality = Cardinality(cardinality);
        let bit_size = cardinality.bit_size();
        if bit_size > SEGMENT_BITS {
            reca_bail!(Variable: "variable '{}' needs {} bits, segment holds {}", name, bit_size, SEGMENT_BITS);
        }

        let (segment, shift) = if self.key_size == 0 || bit_size > self.cursor_shift {
            let segment = SegmentIndex(self.key_size);
            self.key_size += 1;
            (segment, SEGMENT_BITS - bit_size)
        } else {
            (SegmentIndex(self.key_size - 1), self.cursor_shift - bit_size)
        };
        self.cursor_shift = shift;

        let mask = (((1u64 << bit_size) - 1) as KeySegment) << shift;
        let index = VariableIndex(self.variables.len());
        self.variables.push(Variable {
            name,
            abbrev,
            cardinality,
            is_dependent,
            bit_size,
            segment,
            shift: BitShift(shift),
            mask,
        });
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Number of key segments allocated so far.
    pub fn key_size(&self) -> usize {
        self.key_size
    }

    pub fn var(&self, index: VariableIndex) -> &Variable {
        &self.variables[index.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn indices(&self) -> impl Iterator<Item = VariableIndex> {
        (0..self.variables.len()).map(VariableIndex)
    }

    /// Case-insensitive abbreviation lookup.
    pub fn by_abbrev(&self, abbrev: &str) -> Option<VariableIndex> {
        let wanted = title_case(abbrev);
        self.variables
            .iter()
            .position(|v| v.abbrev == wanted)
            .map(VariableIndex)
    }

    /// True when at least one variable is flagged dependent.
    pub fn is_directed(&self) -> bool {
        self.variables.iter().any(|v| v.is_dependent)
    }

    pub fn dependent_indices(&self) -> Vec<VariableIndex> {
        self.indices()
            .filter(|&i| self.var(i).is_dependent())
            .collect()
    }

    pub fn independent_indices(&self) -> Vec<VariableIndex> {
        self.indices()
            .filter(|&i| !self.var(i).is_dependent())
            .collect()
    }

    /// Cross-product of every variable's value set.
    pub fn state_space(&self) -> u128 {
        self.variables
            .iter()
            .map(|v| v.cardinality().get() as u128)
            .product()
    }
}
