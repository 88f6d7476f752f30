use crate::model::{CategoryGroup, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Cell values that count as empty ("—", "-").
    pub placeholders: Vec<String>,
    /// Close the active category at a data row that is not indented past
    /// the category row. Needs row geometry.
    pub close_on_unindented: bool,
    pub indent_tolerance: f32,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        CategoryConfig {
            placeholders: vec!["—".into(), "–".into(), "-".into()],
            close_on_unindented: false,
            indent_tolerance: 2.0,
        }
    }
}

impl CategoryConfig {
    fn is_placeholder(&self, cell: &str) -> bool {
        let cell = cell.trim();
        cell.is_empty() || self.placeholders.iter().any(|p| p == cell)
    }

    /// First column populated, every other column empty or a placeholder.
    pub fn is_category_row(&self, row: &Row, width: usize) -> bool {
        width >= 2
            && !self.is_placeholder(row.first_cell())
            && row.cells.iter().skip(1).all(|c| self.is_placeholder(c))
    }
}

/// Find grouping rows and attach the data rows under them by index.
pub fn classify_categories(rows: &[Row], cfg: &CategoryConfig) -> Vec<CategoryGroup> {
    let width = rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
    let mut groups: Vec<CategoryGroup> = Vec::new();
    // Index into `groups` of the open category and its row's left edge.
    let mut active: Option<(usize, Option<f32>)> = None;

    for (index, row) in rows.iter().enumerate() {
        if row.is_blank() {
            continue;
        }
        if cfg.is_category_row(row, width) {
            groups.push(CategoryGroup {
                name: row.first_cell().trim().to_string(),
                row_index: index,
                members: Vec::new(),
            });
            active = Some((groups.len() - 1, row.x_offset));
            continue;
        }

        let Some((group, header_x)) = active else {
            continue;
        };
        if cfg.close_on_unindented && is_unindented(row, header_x, cfg.indent_tolerance) {
            active = None;
            continue;
        }
        groups[group].members.push(index);
    }
    groups
}

fn is_unindented(row: &Row, header_x: Option<f32>, tolerance: f32) -> bool {
    match (row.x_offset, header_x) {
        (Some(x), Some(hx)) => x <= hx + tolerance,
        _ => false,
    }
}
