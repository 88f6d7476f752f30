use crate::error::FolioError;
use crate::model::{normalize_ws, Row};
use serde::{Deserialize, Serialize};

/// Post-extraction row rewrites, applied in declared order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TableTransform {
    /// Remove columns by 0-based index.
    DropColumns { columns: Vec<usize> },
    /// Drop the first `count` rows.
    SkipRows { count: usize },
    /// Delete every occurrence of these characters from every cell.
    StripChars { chars: String },
    /// Append rows whose first cell is empty to the previous row.
    MergeContinuationRows,
    /// Pad short rows with empty cells up to `width`.
    PadColumns { width: usize },
    /// Join columns `from..=to` into one cell.
    JoinColumns {
        from: usize,
        to: usize,
        #[serde(default = "default_separator")]
        separator: String,
    },
}

fn default_separator() -> String {
    " ".to_string()
}

impl TableTransform {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            TableTransform::JoinColumns { from, to, .. } if from > to => {
                Err(format!("join_columns: from {from} is after to {to}"))
            }
            TableTransform::PadColumns { width: 0 } => {
                Err("pad_columns: width must be positive".into())
            }
            _ => Ok(()),
        }
    }

    pub fn apply(&self, rows: Vec<Row>) -> Vec<Row> {
        match self {
            TableTransform::DropColumns { columns } => rows
                .into_iter()
                .map(|mut row| {
                    row.cells = row
                        .cells
                        .into_iter()
                        .enumerate()
                        .filter(|(i, _)| !columns.contains(i))
                        .map(|(_, c)| c)
                        .collect();
                    row
                })
                .collect(),
            TableTransform::SkipRows { count } => rows.into_iter().skip(*count).collect(),
            TableTransform::StripChars { chars } => rows
                .into_iter()
                .map(|mut row| {
                    for cell in &mut row.cells {
                        let stripped: String =
                            cell.chars().filter(|c| !chars.contains(*c)).collect();
                        *cell = normalize_ws(&stripped);
                    }
                    row
                })
                .collect(),
            TableTransform::MergeContinuationRows => merge_continuation_rows(rows),
            TableTransform::PadColumns { width } => rows
                .into_iter()
                .map(|mut row| {
                    if row.cells.len() < *width {
                        row.cells.resize(*width, String::new());
                    }
                    row
                })
                .collect(),
            TableTransform::JoinColumns {
                from,
                to,
                separator,
            } => rows
                .into_iter()
                .map(|row| join_columns(row, *from, *to, separator))
                .collect(),
        }
    }
}

pub fn apply_transforms(transforms: &[TableTransform], rows: Vec<Row>) -> Result<Vec<Row>, FolioError> {
    let mut rows = rows;
    for t in transforms {
        t.validate().map_err(FolioError::Config)?;
        rows = t.apply(rows);
    }
    Ok(rows)
}

/// A row with an empty first cell continues the row above it: each of its
/// non-empty cells is appended to the matching cell.
pub fn merge_continuation_rows(rows: Vec<Row>) -> Vec<Row> {
    let mut out: Vec<Row> = Vec::with_capacity(rows.len());
    for row in rows {
        let continues = row.first_cell().trim().is_empty() && !row.is_blank();
        match out.last_mut() {
            Some(prev) if continues => {
                if prev.cells.len() < row.cells.len() {
                    prev.cells.resize(row.cells.len(), String::new());
                }
                for (i, cell) in row.cells.iter().enumerate() {
                    let cell = cell.trim();
                    if cell.is_empty() {
                        continue;
                    }
                    let target = &mut prev.cells[i];
                    if !target.is_empty() {
                        target.push(' ');
                    }
                    target.push_str(cell);
                }
            }
            _ => out.push(row),
        }
    }
    out
}

fn join_columns(mut row: Row, from: usize, to: usize, separator: &str) -> Row {
    if from >= row.cells.len() {
        return row;
    }
    let end = to.min(row.cells.len() - 1);
    let joined = row.cells[from..=end]
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(separator);
    row.cells.splice(from..=end, std::iter::once(joined));
    row
}
