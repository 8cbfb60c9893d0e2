use crate::model::{Row, Table};

/// Rendering of an empty cell, matching what earlier caches were produced with.
pub const EMPTY_CELL: &str = "nan";

/// Columns of `table` mentioned anywhere in `prompt`, in header order.
pub fn referenced_columns(table: &Table, prompt: &str) -> Vec<String> {
    table
        .columns
        .iter()
        .filter(|c| !c.is_empty() && prompt.contains(c.as_str()))
        .cloned()
        .collect()
}

/// `name: value` pairs joined with `"; "`, in the row's field order.
pub fn linearize(row: &Row) -> String {
    row.fields
        .iter()
        .map(|(name, value)| {
            let value = if value.is_empty() { EMPTY_CELL } else { value };
            format!("{}: {}", name, value)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// One linearization per row, restricted to the columns the prompt refers to.
pub fn linearize_table(table: &Table, prompt: &str) -> Vec<String> {
    let columns = referenced_columns(table, prompt);
    table
        .rows
        .iter()
        .map(|row| linearize(&row.restrict(&columns)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parse_table;

    #[test]
    fn linearizes_two_phase_rows() {
        let t = parse_table("t", "phase,drug\nI,X\nII,Y\n".as_bytes()).unwrap();
        let lin = linearize_table(&t, "fields: phase, drug\n$linearization");
        assert_eq!(lin, vec!["phase: I; drug: X", "phase: II; drug: Y"]);
    }

    #[test]
    fn drops_unreferenced_columns_and_renders_empty_cells() {
        let t = parse_table(
            "t",
            "nct_id,diseases,criteria\nNCT1,flu,\n".as_bytes(),
        )
        .unwrap();
        let lin = linearize_table(&t, "diseases: list of disease names.\ncriteria: text");
        assert_eq!(lin, vec!["diseases: flu; criteria: nan"]);
    }

    #[test]
    fn index_column_is_not_linearized() {
        let t = parse_table("t", ",phase,drug\n0,I,X\n1,II,Y\n".as_bytes()).unwrap();
        let lin = linearize_table(&t, "phase and drug\n$linearization");
        assert_eq!(lin, vec!["phase: I; drug: X", "phase: II; drug: Y"]);
    }

    #[test]
    fn linearize_is_deterministic() {
        let row = Row::new(vec![("a".into(), "1".into()), ("b".into(), "2".into())]);
        let first = linearize(&row);
        for _ in 0..3 {
            assert_eq!(linearize(&row), first);
        }
    }
}
