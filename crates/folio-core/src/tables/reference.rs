use super::{ReferenceSpec, WorkbookSource};
use crate::error::FolioError;
use crate::model::Row;
use calamine::{open_workbook_auto, Data, Reader};

/// Pre-captured rows: inline rows first, then workbook rows.
pub fn rows(spec: &ReferenceSpec) -> Result<Vec<Row>, FolioError> {
    let mut rows: Vec<Row> = spec.rows.iter().cloned().map(Row::new).collect();
    if let Some(source) = &spec.workbook {
        rows.extend(workbook_rows(source)?);
    }
    Ok(rows)
}

/// Read a sheet from `start_row` until the first empty row.
pub fn workbook_rows(source: &WorkbookSource) -> Result<Vec<Row>, FolioError> {
    let mut workbook = open_workbook_auto(&source.path).map_err(|e| {
        FolioError::Workbook(format!("failed to open {}: {e}", source.path.display()))
    })?;

    let range = workbook
        .worksheet_range(&source.sheet)
        .map_err(|e| FolioError::Workbook(format!("sheet '{}' not found: {e}", source.sheet)))?;

    let rows = range
        .rows()
        .skip(source.start_row)
        .map(|cells| cells.iter().map(cell_as_string).collect::<Vec<_>>())
        .take_while(|cells| cells.iter().any(|c| !c.is_empty()))
        .map(Row::new)
        .collect();
    Ok(rows)
}

fn cell_as_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Empty => String::new(),
        other => format!("{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_rows() {
        let spec = ReferenceSpec {
            rows: vec![
                vec!["Tiny".into(), "2½ ft.".into()],
                vec!["Small".into(), "5 ft.".into()],
            ],
            workbook: None,
            note: Some("page art obscures the printed table".into()),
        };
        let rows = rows(&spec).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].cells, vec!["Small", "5 ft."]);
        assert!(rows[0].x_offset.is_none());
    }

    #[test]
    fn test_missing_workbook_is_workbook_error() {
        let dir = tempfile::tempdir().unwrap();
        let spec = ReferenceSpec {
            rows: Vec::new(),
            workbook: Some(WorkbookSource {
                path: dir.path().join("missing.xlsx"),
                sheet: "Sheet1".into(),
                start_row: 1,
            }),
            note: None,
        };
        assert!(matches!(rows(&spec), Err(FolioError::Workbook(_))));
    }

    #[test]
    fn test_cell_as_string() {
        assert_eq!(cell_as_string(&Data::Float(15.0)), "15");
        assert_eq!(cell_as_string(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_as_string(&Data::String("  Medium ".into())), "Medium");
        assert_eq!(cell_as_string(&Data::Empty), "");
    }
}
