//! Terminal rendering helpers.

#![allow(clippy::print_stdout)]

/// Print rows as a left-aligned table under a header line.
pub fn table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header: Vec<String> = headers.iter().map(|h| (*h).to_owned()).collect();
    println!("{}", render_row(&header, &widths));
    let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    println!("{}", "-".repeat(total));
    for row in rows {
        println!("{}", render_row(row, &widths));
    }
    if rows.is_empty() {
        println!("(aucun résultat)");
    }
}

fn render_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_owned()
}

/// Print a `label: value` line, skipping empty values.
pub fn field(label: &str, value: &str) {
    if !value.is_empty() {
        println!("{label:<22} {value}");
    }
}

/// Print a section title.
pub fn title(text: &str) {
    println!();
    println!("{text}");
    println!("{}", "=".repeat(text.chars().count()));
}

/// Print a plain line.
pub fn message(text: &str) {
    println!("{text}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_row_pads_to_width() {
        let row = vec!["F-1".to_owned(), "Biopharm".to_owned()];
        assert_eq!(render_row(&row, &[5, 10]), "F-1    Biopharm");
    }
}
