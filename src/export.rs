//! CSV export of a month's sales.
//!
//! One row per sale across all three sources, sorted by date. Assembled
//! by hand; fields are quoted only when they contain a comma, quote or
//! newline.

use std::collections::HashMap;

use crate::aggregate::SaleRecord;
use crate::dates;

const HEADER: &str = "date,source,employee,amount,note";

/// Render the month's sales union as CSV. `employee_names` maps hex
/// employee ids to display names for the employee column.
pub fn sales_csv(records: &[SaleRecord], employee_names: &HashMap<String, String>) -> String {
    let mut sorted: Vec<&SaleRecord> = records.iter().collect();
    sorted.sort_by_key(|record| record.date);

    let mut lines = Vec::with_capacity(sorted.len() + 1);
    lines.push(HEADER.to_string());
    for record in sorted {
        let employee = record
            .employee_id
            .as_ref()
            .and_then(|id| employee_names.get(id))
            .map(String::as_str)
            .unwrap_or("");
        lines.push(
            [
                dates::day_key(&record.date),
                record.source.as_str().to_string(),
                escape(employee),
                format!("{:.2}", record.amount),
                escape(record.note.as_deref().unwrap_or("")),
            ]
            .join(","),
        );
    }
    let mut csv = lines.join("\n");
    csv.push('\n');
    csv
}

fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SaleSource;
    use crate::dates::normalize_date;

    fn record(date: &str, amount: f64, note: Option<&str>) -> SaleRecord {
        SaleRecord {
            date: normalize_date(date).expect("test date should parse"),
            amount,
            note: note.map(str::to_string),
            source: SaleSource::StoreDirect,
            employee_id: None,
        }
    }

    #[test]
    fn rows_are_sorted_by_date_with_header() {
        let records = vec![
            record("2024-03-20", 10.0, None),
            record("2024-03-05", 20.0, None),
        ];
        let csv = sales_csv(&records, &HashMap::new());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].starts_with("2024-03-05"));
        assert!(lines[2].starts_with("2024-03-20"));
    }

    #[test]
    fn notes_with_commas_and_quotes_are_escaped() {
        let records = vec![record("2024-03-01", 5.0, Some("big sale, \"promo\" day"))];
        let csv = sales_csv(&records, &HashMap::new());
        assert!(csv.contains("\"big sale, \"\"promo\"\" day\""));
    }

    #[test]
    fn employee_names_are_resolved_from_the_map() {
        let mut record = record("2024-03-01", 5.0, None);
        record.source = SaleSource::Employee;
        record.employee_id = Some("abc123".to_string());
        let mut names = HashMap::new();
        names.insert("abc123".to_string(), "Maria Silva".to_string());
        let csv = sales_csv(std::slice::from_ref(&record), &names);
        assert!(csv.contains("employee,Maria Silva,5.00"));
    }

    #[test]
    fn amounts_render_with_two_decimals() {
        let records = vec![record("2024-03-01", 1234.5, None)];
        let csv = sales_csv(&records, &HashMap::new());
        assert!(csv.contains(",1234.50,"));
    }
}
