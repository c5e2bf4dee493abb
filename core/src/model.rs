// gridcalc-core/src/model.rs
// Core data structures for the spreadsheet engine

use hashbrown::{HashMap, HashSet};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::io::{self, Write};

use crate::error::{CellError, EngineError};
use crate::formula::CompiledFormula;

/// Sheet bounds. Positions at or past these limits are invalid.
pub const MAX_ROWS: i32 = 16_384;
pub const MAX_COLS: i32 = 16_384;

/// A cell coordinate: 0-based (row, col).
///
/// Out-of-range values are representable: a formula may reference a
/// position beyond the sheet bounds, which evaluates to `#REF!`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const NONE: Position = Position { row: -1, col: -1 };

    pub fn new(row: i32, col: i32) -> Self {
        Position { row, col }
    }

    pub fn valid(&self) -> bool {
        self.row >= 0 && self.row < MAX_ROWS && self.col >= 0 && self.col < MAX_COLS
    }

    /// Parses an A1-style reference (uppercase letters, then digits).
    ///
    /// Returns `None` for anything that is not letters-then-digits.
    /// Coordinates past the sheet bounds are accepted and come back as
    /// invalid positions; row numbers are 1-based, so `A0` is invalid too.
    pub fn from_a1(reference: &str) -> Option<Self> {
        let letters_end = reference
            .find(|c: char| !c.is_ascii_uppercase())
            .unwrap_or(reference.len());
        let (letters, digits) = reference.split_at(letters_end);
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let mut col: i64 = 0;
        for b in letters.bytes() {
            col = col.saturating_mul(26).saturating_add(i64::from(b - b'A') + 1);
        }
        let row: i64 = digits.parse().unwrap_or(i64::MAX);

        Some(Position {
            row: to_index(row),
            col: to_index(col),
        })
    }

    /// The A1-style form; empty for negative components.
    pub fn to_a1(&self) -> String {
        if self.row < 0 || self.col < 0 {
            return String::new();
        }
        let mut letters = String::new();
        let mut col = i64::from(self.col) + 1;
        while col > 0 {
            let rem = ((col - 1) % 26) as u8;
            letters.insert(0, (b'A' + rem) as char);
            col = (col - 1) / 26;
        }
        format!("{}{}", letters, i64::from(self.row) + 1)
    }
}

// Converts a 1-based A1 component to a 0-based index, saturating instead of
// overflowing so oversized references stay representable (and invalid).
fn to_index(value: i64) -> i32 {
    i32::try_from(value - 1).unwrap_or(i32::MAX)
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

/// The printable bounding box of a sheet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub rows: i32,
    pub cols: i32,
}

/// What reading a cell produces: text, a finite number, or an evaluation
/// error that propagates through dependent formulas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Error(CellError),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Error(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Debug)]
enum CellKind {
    Empty,
    Text(String),
    Formula {
        compiled: CompiledFormula,
        // Memo of the last evaluation, error outcomes included.
        cache: RefCell<Option<CellValue>>,
    },
}

/// A single cell, owned by exactly one [`Sheet`].
///
/// Besides its content the cell carries the positions of the formulas that
/// currently read it (for cache invalidation) and whether it counts toward
/// the printable bounds (cells materialized only as dependency endpoints
/// do not).
#[derive(Debug)]
pub struct Cell {
    kind: CellKind,
    raw: String,
    reverse_deps: HashSet<Position>,
    visible: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            kind: CellKind::Empty,
            raw: String::new(),
            reverse_deps: HashSet::new(),
            visible: false,
        }
    }
}

impl Cell {
    /// The computed value. `sheet` must be the sheet that owns this cell.
    ///
    /// Text yields itself with one leading apostrophe stripped (the escape
    /// for text that would otherwise look numeric or formula-like). A
    /// formula consults its memo first and caches whatever evaluation
    /// returns, numbers and errors alike.
    pub fn value(&self, sheet: &Sheet) -> CellValue {
        match &self.kind {
            CellKind::Empty => CellValue::Text(String::new()),
            CellKind::Text(text) => {
                CellValue::Text(text.strip_prefix('\'').unwrap_or(text).to_string())
            }
            CellKind::Formula { compiled, cache } => {
                if let Some(value) = cache.borrow().as_ref() {
                    return value.clone();
                }
                let value = match compiled.evaluate(|pos| sheet.resolve_number(pos)) {
                    Ok(n) => CellValue::Number(n),
                    Err(e) => CellValue::Error(e),
                };
                *cache.borrow_mut() = Some(value.clone());
                value
            }
        }
    }

    /// The stored text: raw input for text cells (apostrophe retained),
    /// `=` plus the canonical expression for formulas.
    pub fn text(&self) -> String {
        match &self.kind {
            CellKind::Empty => String::new(),
            CellKind::Text(text) => text.clone(),
            CellKind::Formula { compiled, .. } => format!("={}", compiled.expression_text()),
        }
    }

    /// The positions this cell's formula reads, sorted and deduplicated.
    /// Empty for non-formula cells.
    pub fn referenced_cells(&self) -> &[Position] {
        match &self.kind {
            CellKind::Formula { compiled, .. } => compiled.referenced_positions(),
            _ => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, CellKind::Empty)
    }

    fn drop_cache(&mut self) {
        if let CellKind::Formula { cache, .. } = &mut self.kind {
            cache.get_mut().take();
        }
    }
}

/// A sparse two-dimensional table of cells.
///
/// The sheet is the sole mutator of its cells. `set` and `clear` keep the
/// dependency graph consistent in both directions and reject cycles before
/// any mutation becomes observable; memoized values are invalidated
/// pessimistically on every write.
#[derive(Debug, Default)]
pub struct Sheet {
    cells: HashMap<Position, Cell>,
    // Count of visible cells per row/col index; the last key of each map is
    // the printable bound. Cells materialized only by reference are not in
    // here, and cleared cells leave again.
    row_count: BTreeMap<i32, usize>,
    col_count: BTreeMap<i32, usize>,
}

impl Sheet {
    pub fn new() -> Self {
        Sheet::default()
    }

    /// Installs `text` at `pos`.
    ///
    /// Empty text makes the cell empty; text starting with `=` (and at
    /// least one more character) is parsed as a formula; anything else is
    /// stored as text. Re-setting identical text is a no-op that keeps the
    /// memoized value.
    ///
    /// Parse and cycle errors abort with the previous content intact,
    /// though a first `set` on a fresh position has already materialized a
    /// visible empty cell by then.
    pub fn set(&mut self, pos: Position, text: &str) -> Result<(), EngineError> {
        if !pos.valid() {
            return Err(EngineError::InvalidPosition(pos));
        }

        let cell = self.cells.entry(pos).or_default();
        if !cell.visible {
            cell.visible = true;
            *self.row_count.entry(pos.row).or_insert(0) += 1;
            *self.col_count.entry(pos.col).or_insert(0) += 1;
        }
        if !cell.is_empty() && cell.raw == text {
            return Ok(());
        }

        let new_kind = if text.is_empty() {
            CellKind::Empty
        } else if text.starts_with('=') && text.len() > 1 {
            let compiled = CompiledFormula::parse(&text[1..])?;
            if self.creates_cycle(pos, compiled.referenced_positions()) {
                debug!("rejected {}: circular reference", pos);
                return Err(EngineError::CircularReference(pos));
            }
            CellKind::Formula {
                compiled,
                cache: RefCell::new(None),
            }
        } else {
            CellKind::Text(text.to_string())
        };

        // Commit order matters: dependents are found through the old edges,
        // so invalidation runs before the edges are replaced.
        self.invalidate(pos);
        self.detach(pos);

        let new_refs: Vec<Position> = match &new_kind {
            CellKind::Formula { compiled, .. } => compiled.referenced_positions().to_vec(),
            _ => Vec::new(),
        };
        if let Some(cell) = self.cells.get_mut(&pos) {
            cell.kind = new_kind;
            cell.raw = text.to_string();
        }
        self.attach(pos, &new_refs);

        debug!("set {} to {:?}", pos, text);
        Ok(())
    }

    /// Empties the cell at `pos`.
    ///
    /// Nothing happens for absent or already-empty cells. The cell stays in
    /// the table as a dependency endpoint (formulas reading it see a zero
    /// input) but stops counting toward the printable bounds.
    pub fn clear(&mut self, pos: Position) -> Result<(), EngineError> {
        if !pos.valid() {
            return Err(EngineError::InvalidPosition(pos));
        }
        match self.cells.get(&pos) {
            Some(cell) if !cell.is_empty() => {}
            _ => return Ok(()),
        }

        self.invalidate(pos);
        self.detach(pos);
        if let Some(cell) = self.cells.get_mut(&pos) {
            cell.kind = CellKind::Empty;
            cell.raw.clear();
            cell.visible = false;
        }
        self.decrement_counts(pos);

        debug!("clear {}", pos);
        Ok(())
    }

    /// The cell at `pos`, or `None` when it is absent or empty. Empty
    /// cells are invisible to readers; they exist only as dependency
    /// endpoints.
    pub fn get(&self, pos: Position) -> Result<Option<&Cell>, EngineError> {
        if !pos.valid() {
            return Err(EngineError::InvalidPosition(pos));
        }
        Ok(self.cells.get(&pos).filter(|cell| !cell.is_empty()))
    }

    pub fn get_mut(&mut self, pos: Position) -> Result<Option<&mut Cell>, EngineError> {
        if !pos.valid() {
            return Err(EngineError::InvalidPosition(pos));
        }
        Ok(self.cells.get_mut(&pos).filter(|cell| !cell.is_empty()))
    }

    // The cell regardless of emptiness; used by cycle detection, formula
    // resolution, and tests.
    pub(crate) fn get_concrete(&self, pos: Position) -> Option<&Cell> {
        self.cells.get(&pos)
    }

    /// The bounding box of visible cells: (0, 0) when none, otherwise
    /// (max_row + 1, max_col + 1).
    pub fn printable_size(&self) -> Size {
        match (
            self.row_count.keys().next_back(),
            self.col_count.keys().next_back(),
        ) {
            (Some(&row), Some(&col)) => Size {
                rows: row + 1,
                cols: col + 1,
            },
            _ => Size::default(),
        }
    }

    /// Writes computed values, tab-separated within rows, one row per line.
    pub fn print_values<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_cells(out, |cell| cell.value(self).to_string())
    }

    /// Writes stored texts in the same layout as [`Sheet::print_values`].
    pub fn print_texts<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_cells(out, |cell| cell.text())
    }

    fn print_cells<W: Write>(
        &self,
        out: &mut W,
        render: impl Fn(&Cell) -> String,
    ) -> io::Result<()> {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col != 0 {
                    write!(out, "\t")?;
                }
                if let Some(cell) = self.cells.get(&Position { row, col }) {
                    write!(out, "{}", render(cell))?;
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }

    // The resolver handed to formulas: invalid positions are reference
    // errors, absent and empty cells read as zero, text must parse as a
    // number in full, and stored errors keep their category.
    pub(crate) fn resolve_number(&self, pos: Position) -> Result<f64, CellError> {
        if !pos.valid() {
            return Err(CellError::Ref);
        }
        let Some(cell) = self.get_concrete(pos) else {
            return Ok(0.0);
        };
        match cell.value(self) {
            CellValue::Number(n) => Ok(n),
            CellValue::Text(s) => {
                if s.is_empty() {
                    Ok(0.0)
                } else {
                    s.parse::<f64>().map_err(|_| CellError::Value)
                }
            }
            CellValue::Error(e) => Err(e),
        }
    }

    // Would a formula at `target` reading `references` close a loop in the
    // current graph? Depth-first from each proposed reference; reaching the
    // target is a cycle, and so is re-encountering any position within one
    // root's search (the graph is expected to be a DAG, so a revisit means
    // something is already wrong).
    fn creates_cycle(&self, target: Position, references: &[Position]) -> bool {
        for &root in references {
            let mut visited = HashSet::new();
            if self.search_cycle(root, target, &mut visited) {
                return true;
            }
        }
        false
    }

    fn search_cycle(
        &self,
        node: Position,
        target: Position,
        visited: &mut HashSet<Position>,
    ) -> bool {
        if !node.valid() {
            return false;
        }
        if node == target {
            return true;
        }
        let Some(cell) = self.get_concrete(node) else {
            return false;
        };
        visited.insert(node);
        for &next in cell.referenced_cells() {
            if visited.contains(&next) {
                return true;
            }
            if self.search_cycle(next, target, visited) {
                return true;
            }
        }
        false
    }

    // Drops the memoized value of `start` and of everything that
    // transitively reads it. The reverse-dependency graph is a DAG, so the
    // walk terminates; the seen-set just cuts revisits.
    fn invalidate(&mut self, start: Position) {
        trace!("invalidate from {}", start);
        let mut queue = VecDeque::new();
        let mut seen = HashSet::new();
        queue.push_back(start);
        seen.insert(start);
        while let Some(pos) = queue.pop_front() {
            if let Some(cell) = self.cells.get_mut(&pos) {
                cell.drop_cache();
                for &dep in &cell.reverse_deps {
                    if seen.insert(dep) {
                        queue.push_back(dep);
                    }
                }
            }
        }
    }

    // Removes `pos` from the reverse-dependency sets of the cells its
    // current formula references.
    fn detach(&mut self, pos: Position) {
        let old_refs: Vec<Position> = match self.cells.get(&pos) {
            Some(cell) => cell.referenced_cells().to_vec(),
            None => return,
        };
        for reference in old_refs {
            if !reference.valid() {
                continue;
            }
            if let Some(target) = self.cells.get_mut(&reference) {
                target.reverse_deps.remove(&pos);
            }
        }
    }

    // Registers `pos` as a dependent of each referenced cell, creating
    // absent referents as invisible empty cells.
    fn attach(&mut self, pos: Position, references: &[Position]) {
        for &reference in references {
            if !reference.valid() {
                continue;
            }
            self.cells
                .entry(reference)
                .or_default()
                .reverse_deps
                .insert(pos);
        }
    }

    fn decrement_counts(&mut self, pos: Position) {
        if let Some(count) = self.row_count.get_mut(&pos.row) {
            *count -= 1;
            if *count == 0 {
                self.row_count.remove(&pos.row);
            }
        }
        if let Some(count) = self.col_count.get_mut(&pos.col) {
            *count -= 1;
            if *count == 0 {
                self.col_count.remove(&pos.col);
            }
        }
    }
}
