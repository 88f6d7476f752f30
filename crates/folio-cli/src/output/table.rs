use folio_core::batch::BatchOutcome;
use folio_core::model::{LogicalLine, RawTable};
use folio_core::records::{RecordRun, SegmentedRecord};

pub fn print_lines(lines: &[LogicalLine]) {
    let max_font = lines.iter().map(|l| l.font.len()).max().unwrap_or(4).max(4);

    println!(
        "  {:>4} {:>3} {:>7}  {:<width$}  {:<11}  Text",
        "Page",
        "Col",
        "Top",
        "Font",
        "Style",
        width = max_font
    );
    println!("  {}", "-".repeat(4 + 1 + 3 + 1 + 7 + 2 + max_font + 2 + 11 + 2 + 4));
    for line in lines {
        println!(
            "  {:>4} {:>3} {:>7.1}  {:<width$}  {:<11}  {}",
            line.page,
            line.column,
            line.bbox.y_min,
            line.font,
            format!("{} {:.1}", line.style, line.size),
            line.text,
            width = max_font
        );
    }
}

pub fn print_raw_records(run: &RecordRun) {
    println!(
        "{} record(s) with profile '{}' ({} preamble line(s) discarded)\n",
        run.records.len(),
        run.profile,
        run.preamble_lines
    );
    for rec in &run.records {
        println!(
            "=== {} === pages {}",
            rec.name.as_deref().unwrap_or("(unnamed)"),
            page_list(&rec.pages)
        );
        if rec.merged_fragments > 0 {
            println!("  ({} continuation fragment(s) merged)", rec.merged_fragments);
        }
        for line in &rec.lines {
            match &line.section {
                Some(section) => println!("  [{section}] {}", line.line.text),
                None => println!("  {}", line.line.text),
            }
        }
        println!();
    }
}

pub fn print_records(records: &[SegmentedRecord]) {
    for rec in records {
        println!(
            "=== {} === pages {}",
            rec.name.as_deref().unwrap_or("(unnamed)"),
            page_list(&rec.pages)
        );
        if let Some(ref subtitle) = rec.subtitle {
            println!("  {subtitle}");
        }
        println!();

        let max_label = rec.fields.iter().map(|f| f.label.len()).max().unwrap_or(0);
        for field in &rec.fields {
            println!("  {:<width$}  {}", field.label, field.value(), width = max_label);
        }
        if !rec.fields.is_empty() {
            println!();
        }

        let mut section: Option<&str> = None;
        for entry in &rec.sub_entries {
            if entry.section.as_deref() != section {
                section = entry.section.as_deref();
                if let Some(name) = section {
                    println!("  {name}");
                }
            }
            println!("    {}. {}", entry.name, entry.description);
        }

        if !rec.body.is_empty() {
            if !rec.sub_entries.is_empty() {
                println!();
            }
            for paragraph in &rec.body_paragraphs {
                println!("  {paragraph}");
            }
        }
        if rec.unknown_labels > 0 {
            println!("  ({} unrecognized label(s))", rec.unknown_labels);
        }
        println!();
    }
}

pub fn print_tables(outcome: &BatchOutcome) {
    for table in &outcome.tables {
        let title = if table.name.is_empty() {
            table.id.clone()
        } else {
            format!("{} ({})", table.name, table.id)
        };
        println!("=== {title} ===\n");
        print_table(&table.table);
        println!();
    }

    let report = &outcome.report;
    println!(
        "{} table(s) extracted, {} warning(s), {} failure(s)",
        report.successes, report.warnings, report.failures
    );
}

fn print_table(table: &RawTable) {
    let columns = table
        .rows
        .iter()
        .map(|r| r.cells.len())
        .chain(std::iter::once(table.headers.len()))
        .max()
        .unwrap_or(0);

    let mut widths = vec![0usize; columns];
    for (i, h) in table.headers.iter().enumerate() {
        widths[i] = widths[i].max(h.chars().count());
    }
    for row in &table.rows {
        for (i, cell) in row.cells.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    if !table.headers.is_empty() {
        println!("  {}", format_row(&table.headers, &widths));
        let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        println!("  {}", "-".repeat(total));
    }

    for (index, row) in table.rows.iter().enumerate() {
        let is_category = table.categories.iter().any(|c| c.row_index == index);
        let indent = if !is_category && table.categories.iter().any(|c| c.members.contains(&index)) {
            "  "
        } else {
            ""
        };
        println!("  {indent}{}", format_row(&row.cells, &widths));
    }
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{:<w$}", cell))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn page_list(pages: &[usize]) -> String {
    pages
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
