//! Array formula generalization
//!
//! A named range whose cells all hold formulas is usually one calculation
//! filled across the block: `=B2*C2`, `=B3*C3`, ... . [`generalize`] tries to
//! replace the per-cell list with one comprehension over the parallel
//! ranges the formulas index into.
//!
//! Two checks must pass:
//!
//! 1. Every formula contains the literal fragments the first two formulas
//!    have in common (a sequence alignment of their text).
//! 2. The formulas parse to the same tree except at single-cell references,
//!    and each such reference keeps the same row/column offset from its own
//!    cell across the whole block. That offset picks out the parallel range.
//!
//! Anything else is a [`GeneralizationFailure`]. The caller then emits the
//! cells one by one; nothing is lost, only compaction.

use crate::ast::{Formula, Term};
use crate::parser::parse_single;
use crate::resolver::AliasTable;
use crate::translate::Translator;
use sheet2py_core::{CellAddress, CellRange, Reference};
use thiserror::Error;

/// A rectangular block of formula cells
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaBlock {
    /// Sheet the block lives on
    pub sheet: String,
    /// Top-left cell
    pub origin: CellAddress,
    /// Formula text of each cell, row by row
    pub rows: Vec<Vec<String>>,
}

impl FormulaBlock {
    /// Create a block
    pub fn new(sheet: impl Into<String>, origin: CellAddress, rows: Vec<Vec<String>>) -> Self {
        Self {
            sheet: sheet.into(),
            origin,
            rows,
        }
    }

    /// Number of cells
    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Whether every cell holds the same formula text
    pub fn is_uniform(&self) -> bool {
        let mut texts = self.rows.iter().flatten();
        match texts.next() {
            Some(first) => texts.all(|t| t == first),
            None => true,
        }
    }

    /// The cells covered by the block
    pub fn range(&self) -> CellRange {
        let rows = self.rows.len().max(1) as u32;
        let cols = self.rows.first().map_or(1, Vec::len).max(1) as u16;
        CellRange::from_indices(
            self.origin.row,
            self.origin.col,
            self.origin.row + rows - 1,
            self.origin.col + cols - 1,
        )
    }

    fn cells(&self) -> impl Iterator<Item = (CellAddress, &str)> + '_ {
        let origin = self.origin;
        self.rows.iter().enumerate().flat_map(move |(r, row)| {
            row.iter().enumerate().map(move |(c, text)| {
                (
                    CellAddress::new(origin.row + r as u32, origin.col + c as u16),
                    text.as_str(),
                )
            })
        })
    }

    fn label(&self, address: CellAddress) -> String {
        Reference::cell(self.sheet.clone(), address).to_string()
    }
}

/// Why a block could not be generalized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneralizationFailure {
    #[error("block has fewer than two cells")]
    TooSmall,

    #[error("{cell} does not contain the common fragment {fragment:?}")]
    StructureMismatch { cell: String, fragment: String },

    #[error("cannot parse {cell}: {message}")]
    Unparseable { cell: String, message: String },

    #[error("{cell} differs from the first cell in more than its references")]
    ShapeMismatch { cell: String },

    #[error("no fixed offset relates {cell} to the references it uses")]
    NoIndexRelation { cell: String },
}

/// A run of equal characters in two strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingBlock {
    /// Start in the first string (in chars)
    pub a: usize,
    /// Start in the second string (in chars)
    pub b: usize,
    /// Length in chars
    pub size: usize,
}

/// Maximal matching blocks between two strings, in order
///
/// Finds the longest common substring, then recurses on the text to its
/// left and to its right. Adjacent blocks are merged.
pub fn matching_blocks(a: &str, b: &str) -> Vec<MatchingBlock> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut found = Vec::new();
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let block = longest_match(&a, &b, alo, ahi, blo, bhi);
        if block.size == 0 {
            continue;
        }
        if alo < block.a && blo < block.b {
            queue.push((alo, block.a, blo, block.b));
        }
        if block.a + block.size < ahi && block.b + block.size < bhi {
            queue.push((block.a + block.size, ahi, block.b + block.size, bhi));
        }
        found.push(block);
    }
    found.sort_by_key(|m| (m.a, m.b));

    let mut merged: Vec<MatchingBlock> = Vec::with_capacity(found.len());
    for block in found {
        match merged.last_mut() {
            Some(last) if last.a + last.size == block.a && last.b + last.size == block.b => {
                last.size += block.size;
            }
            _ => merged.push(block),
        }
    }
    merged
}

fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> MatchingBlock {
    let mut best = MatchingBlock { a: alo, b: blo, size: 0 };
    // current[j - blo + 1] is the length of the common run ending at a[i], b[j]
    let mut previous = vec![0usize; bhi - blo + 1];
    for i in alo..ahi {
        let mut current = vec![0usize; bhi - blo + 1];
        for j in blo..bhi {
            if a[i] == b[j] {
                let k = previous[j - blo] + 1;
                current[j - blo + 1] = k;
                if k > best.size {
                    best = MatchingBlock {
                        a: i + 1 - k,
                        b: j + 1 - k,
                        size: k,
                    };
                }
            }
        }
        previous = current;
    }
    best
}

/// The literal fragments two strings have in common
pub fn common_fragments(a: &str, b: &str) -> Vec<String> {
    let chars: Vec<char> = a.chars().collect();
    matching_blocks(a, b)
        .into_iter()
        .map(|m| chars[m.a..m.a + m.size].iter().collect())
        .collect()
}

/// Collapse a block of related formulas into one Python comprehension
///
/// The parallel ranges the formulas index into are resolved through
/// `aliases` like any other reference, so they are discovered and emitted
/// in their own right.
pub fn generalize(
    block: &FormulaBlock,
    translator: &Translator,
    aliases: &mut AliasTable,
) -> Result<String, GeneralizationFailure> {
    let cells: Vec<(CellAddress, &str)> = block.cells().collect();
    if cells.len() < 2 {
        return Err(GeneralizationFailure::TooSmall);
    }

    check_structure(block, &cells)?;

    let parsed = cells
        .iter()
        .map(|&(address, text)| {
            parse_single(text)
                .map(|formula| (address, formula))
                .map_err(|e| GeneralizationFailure::Unparseable {
                    cell: block.label(address),
                    message: e.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Reduce each formula to its shape plus its single-cell references
    let (first_address, first_formula) = &parsed[0];
    let (shape, _) = skeleton(first_formula, &block.sheet);
    let mut leaves_by_cell = Vec::with_capacity(parsed.len());
    for (address, formula) in &parsed {
        let (cell_shape, leaves) = skeleton(formula, &block.sheet);
        if cell_shape != shape {
            return Err(GeneralizationFailure::ShapeMismatch {
                cell: block.label(*address),
            });
        }
        leaves_by_cell.push((*address, leaves));
    }

    // Classify each leaf position as fixed or moving with its cell
    let leaf_count = leaves_by_cell[0].1.len();
    let mut offsets: Vec<Option<Offset>> = Vec::with_capacity(leaf_count);
    for leaf in 0..leaf_count {
        let first = &leaves_by_cell[0].1[leaf];
        if leaves_by_cell.iter().all(|(_, leaves)| &leaves[leaf] == first) {
            offsets.push(None);
            continue;
        }

        let offset = Offset::between(leaves_by_cell[0].0, first);
        for (address, leaves) in &leaves_by_cell {
            if Offset::between(*address, &leaves[leaf]) != offset {
                return Err(GeneralizationFailure::NoIndexRelation {
                    cell: block.label(*address),
                });
            }
        }
        offsets.push(Some(offset));
    }

    // One loop variable per distinct offset
    let mut groups: Vec<Offset> = Vec::new();
    let mut group_of_leaf: Vec<Option<usize>> = Vec::with_capacity(leaf_count);
    for offset in &offsets {
        let Some(offset) = offset else {
            group_of_leaf.push(None);
            continue;
        };
        let existing = groups.iter().position(|g| g == offset);
        let group = match existing {
            Some(group) => group,
            None => {
                groups.push(offset.clone());
                groups.len() - 1
            }
        };
        group_of_leaf.push(Some(group));
    }
    if groups.is_empty() {
        return Err(GeneralizationFailure::NoIndexRelation {
            cell: block.label(*first_address),
        });
    }

    let mut iterables = Vec::with_capacity(groups.len());
    for offset in &groups {
        let shifted = block
            .range()
            .offset(offset.rows, offset.cols)
            .ok_or_else(|| GeneralizationFailure::NoIndexRelation {
                cell: block.label(*first_address),
            })?;
        let parallel = Reference::new(Some(offset.sheet.clone()), shifted);
        let identifier = aliases.resolve(&parallel, None);
        iterables.push(translator.qualify(&identifier));
    }

    let locals: Vec<String> = (0..groups.len()).map(|g| format!("_v{}", g)).collect();
    let mut body = first_formula.clone();
    let mut leaf = 0;
    body.for_each_term_mut(&mut |term| {
        if let Term::Range(reference) = term {
            if reference.is_multi_cell() {
                return;
            }
            if let Some(Some(group)) = group_of_leaf.get(leaf) {
                *term = Term::Name(locals[*group].clone());
            }
            leaf += 1;
        }
    });
    let expression = translator.translate_with_locals(&body, Some(&block.sheet), aliases, &locals);

    let rows: Vec<String> = (0..groups.len()).map(|g| format!("_r{}", g)).collect();
    Ok(if groups.len() == 1 {
        format!(
            "tuple(tuple({} for {} in {}) for {} in {})",
            expression, locals[0], rows[0], rows[0], iterables[0]
        )
    } else {
        format!(
            "tuple(tuple({} for {} in zip({})) for {} in zip({}))",
            expression,
            locals.join(", "),
            rows.join(", "),
            rows.join(", "),
            iterables.join(", ")
        )
    })
}

/// Position of a reference relative to the cell that uses it
#[derive(Debug, Clone, PartialEq, Eq)]
struct Offset {
    sheet: String,
    rows: i64,
    cols: i64,
}

impl Offset {
    fn between(cell: CellAddress, leaf: &Reference) -> Self {
        Self {
            sheet: leaf.sheet.clone().unwrap_or_default(),
            rows: leaf.range.start.row as i64 - cell.row as i64,
            cols: leaf.range.start.col as i64 - cell.col as i64,
        }
    }
}

fn check_structure(
    block: &FormulaBlock,
    cells: &[(CellAddress, &str)],
) -> Result<(), GeneralizationFailure> {
    let common = common_fragments(cells[0].1, cells[1].1);
    for &(address, text) in cells {
        if let Some(fragment) = common.iter().find(|f| !text.contains(f.as_str())) {
            return Err(GeneralizationFailure::StructureMismatch {
                cell: block.label(address),
                fragment: fragment.clone(),
            });
        }
    }
    Ok(())
}

/// The formula with single-cell references blanked out, and those
/// references (sheet attached, `$` markers dropped) in written order
fn skeleton(formula: &Formula, sheet: &str) -> (Formula, Vec<Reference>) {
    let placeholder = Reference::new(None, CellRange::single(CellAddress::new(0, 0)));
    let mut shape = formula.clone();
    let mut leaves = Vec::new();
    shape.for_each_term_mut(&mut |term| {
        if let Term::Range(reference) = term {
            let plain = Reference::new(
                Some(reference.sheet.clone().unwrap_or_else(|| sheet.to_string())),
                CellRange::from_indices(
                    reference.range.start.row,
                    reference.range.start.col,
                    reference.range.end.row,
                    reference.range.end.col,
                ),
            );
            if plain.is_multi_cell() {
                *reference = plain;
            } else {
                leaves.push(plain);
                *reference = placeholder.clone();
            }
        }
    });
    (shape, leaves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn block(sheet: &str, origin: &str, rows: &[&[&str]]) -> FormulaBlock {
        FormulaBlock::new(
            sheet,
            CellAddress::parse(origin).unwrap(),
            rows.iter()
                .map(|row| row.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_matching_blocks() {
        let blocks = matching_blocks("=B2*C2", "=B3*C3");
        assert_eq!(
            blocks,
            vec![
                MatchingBlock { a: 0, b: 0, size: 2 },
                MatchingBlock { a: 3, b: 3, size: 2 },
            ]
        );
        assert_eq!(common_fragments("=B2*C2", "=B3*C3"), vec!["=B", "*C"]);
        assert_eq!(common_fragments("abc", "xyz"), Vec::<String>::new());
    }

    #[test]
    fn test_matching_blocks_prefers_longest() {
        assert_eq!(
            common_fragments("=SUM(Data!A1:A9)+1", "=SUM(Data!A1:A9)+2"),
            vec!["=SUM(Data!A1:A9)+"]
        );
    }

    #[test]
    fn test_block_helpers() {
        let b = block("Calc", "D4", &[&["=B4*C4", "=B4*2"], &["=B5*C5", "=B5*2"]]);
        assert_eq!(b.cell_count(), 4);
        assert!(!b.is_uniform());
        assert_eq!(b.range(), CellRange::parse("D4:E5").unwrap());
        assert!(block("Calc", "A1", &[&["=1"], &["=1"]]).is_uniform());
    }

    #[test]
    fn test_generalize_single_parallel_range() {
        let b = block("Calc", "C2", &[&["=B2*2"], &["=B3*2"], &["=B4*2"]]);
        let mut aliases = AliasTable::new();
        let python = generalize(&b, &Translator::default(), &mut aliases).unwrap();
        assert_eq!(python, "tuple(tuple(_v0*2 for _v0 in _r0) for _r0 in self.CalcB2B4)");
        assert_eq!(aliases.pop_pending().as_deref(), Some("Calc!$B$2:$B$4"));
        assert!(!aliases.has_pending());
    }

    #[test]
    fn test_generalize_two_ranges_and_a_fixed_cell() {
        let b = block(
            "Calc",
            "D2",
            &[&["=B2*C2+$A$1"], &["=B3*C3+$A$1"]],
        );
        let mut aliases = AliasTable::new();
        aliases.insert_defined_name(&Reference::parse("Calc!$B$2:$B$3").unwrap(), "Prices");
        aliases.insert_defined_name(&Reference::parse("Calc!$A$1").unwrap(), "Rate");
        let python = generalize(&b, &Translator::default(), &mut aliases).unwrap();
        assert_eq!(
            python,
            "tuple(tuple(_v0*_v1+self.Rate for _v0, _v1 in zip(_r0, _r1)) \
             for _r0, _r1 in zip(self.Prices, self.CalcC2C3))"
        );
    }

    #[test]
    fn test_generalize_other_sheet() {
        let b = block("Out", "A1", &[&["=Data!B5", "=Data!C5"]]);
        let mut aliases = AliasTable::new();
        let python = generalize(&b, &Translator::default(), &mut aliases).unwrap();
        assert_eq!(python, "tuple(tuple(_v0 for _v0 in _r0) for _r0 in self.DataB5C5)");
    }

    #[test]
    fn test_generalize_failures() {
        let translator = Translator::default();
        let mut aliases = AliasTable::new();

        let single = block("Calc", "A1", &[&["=B1"]]);
        assert_eq!(
            generalize(&single, &translator, &mut aliases),
            Err(GeneralizationFailure::TooSmall)
        );

        let unrelated = block(
            "Calc",
            "A1",
            &[&["=SUM(B1:B3)"], &["=SUM(C1:C3)"], &["=D1&\"x\""]],
        );
        assert!(matches!(
            generalize(&unrelated, &translator, &mut aliases),
            Err(GeneralizationFailure::StructureMismatch { .. })
        ));

        let reshaped = block("Calc", "A1", &[&["=B1+1"], &["=B2+2"]]);
        assert!(matches!(
            generalize(&reshaped, &translator, &mut aliases),
            Err(GeneralizationFailure::ShapeMismatch { .. })
        ));

        // Second cell jumps two rows instead of one
        let skewed = block("Calc", "A1", &[&["=B1*2"], &["=B3*2"]]);
        assert!(matches!(
            generalize(&skewed, &translator, &mut aliases),
            Err(GeneralizationFailure::NoIndexRelation { .. })
        ));

        let broken = block("Calc", "A1", &[&["=B1*2"], &["=B2*2)"]]);
        assert!(matches!(
            generalize(&broken, &translator, &mut aliases),
            Err(GeneralizationFailure::Unparseable { .. })
        ));

        assert!(!aliases.has_pending());
    }
}
