use crate::model::{Row, Table};
use anyhow::Context;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Location of the `<name>.csv` file backing a unit of work.
pub fn table_path(data_path: &Path, name: &str) -> PathBuf {
    data_path.join(format!("{}.csv", name))
}

/// Reads a delimited table with a header row. Rows are read fully, in file order.
pub fn read_table(data_path: &Path, name: &str) -> anyhow::Result<Table> {
    let path = table_path(data_path, name);
    let file = std::fs::File::open(&path)
        .with_context(|| format!("failed to open table {}", path.display()))?;
    parse_table(name, file).with_context(|| format!("failed to parse table {}", path.display()))
}

pub fn parse_table<R: Read>(name: &str, reader: R) -> anyhow::Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let columns: Vec<String> = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| column_name(i, h))
        .collect();

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("row {}", i + 1))?;
        let fields = columns
            .iter()
            .zip(record.iter())
            .map(|(c, v)| (c.clone(), v.to_string()))
            .collect();
        rows.push(Row::new(fields));
    }

    Ok(Table {
        name: name.to_string(),
        columns,
        rows,
    })
}

/// Blank header cells (e.g. a written-out index column) get the `Unnamed: <i>` name
/// dataframe writers use, so they never match a prompt by accident.
fn column_name(position: usize, header: &str) -> String {
    if header.trim().is_empty() {
        format!("Unnamed: {}", position)
    } else {
        header.to_string()
    }
}
