use std::{fmt::Display, io::Read, path::Path};

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("missing column {0:?}")]
    MissingColumn(String),
    #[error("row {row}, column {column:?}: invalid value {value:?} ({reason})")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
        reason: String,
    },
}

/// A CSV file held in memory, addressed by header name.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl Table {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
        Self::collect(&mut reader)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_path(path)?;
        Self::collect(&mut reader)
    }

    fn collect<R: Read>(reader: &mut csv::Reader<R>) -> Result<Self, TableError> {
        let headers = reader.headers()?.iter().map(|h| h.to_owned()).collect();
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers, records })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| TableError::MissingColumn(name.to_owned()))
    }

    /// Fails on the first of `columns` the table does not have.
    pub fn require<S: AsRef<str>>(&self, columns: &[S]) -> Result<(), TableError> {
        for column in columns {
            self.column_index(column.as_ref())?;
        }
        Ok(())
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.records.iter().enumerate().map(|(index, record)| Row {
            table: self,
            index,
            record,
        })
    }

    pub fn column(&self, name: &str) -> Result<Vec<&str>, TableError> {
        let idx = self.column_index(name)?;
        Ok(self
            .records
            .iter()
            .map(|record| record.get(idx).unwrap_or_default())
            .collect())
    }

    pub fn numeric(&self, name: &str) -> Result<Vec<f64>, TableError> {
        self.rows().map(|row| row.number(name)).collect()
    }

    pub fn parse_column<T, E, F>(&self, name: &str, parse: F) -> Result<Vec<T>, TableError>
    where
        E: Display,
        F: Fn(&str) -> Result<T, E>,
    {
        self.rows().map(|row| row.parse_with(name, &parse)).collect()
    }
}

/// One measurement row of a [`Table`].
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    index: usize,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    /// Position of the row in the file, header excluded.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, column: &str) -> Result<&'a str, TableError> {
        let idx = self.table.column_index(column)?;
        Ok(self.record.get(idx).unwrap_or_default())
    }

    pub fn number(&self, column: &str) -> Result<f64, TableError> {
        self.parse_with(column, |value| value.parse::<f64>())
    }

    pub fn parse_with<T, E, F>(&self, column: &str, parse: F) -> Result<T, TableError>
    where
        E: Display,
        F: Fn(&str) -> Result<T, E>,
    {
        let value = self.get(column)?;
        parse(value).map_err(|err| TableError::InvalidValue {
            row: self.index + 1,
            column: column.to_owned(),
            value: value.to_owned(),
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::util::parse_latency;

    const WRK: &str = "threads,connections,Requests/sec,\"latency, avg\"\n\
                       1, 10, 1500.5, 650us\n\
                       1, 100, 9000, 1.2ms\n";

    #[test]
    fn loads_named_columns() {
        let table = Table::from_reader(WRK.as_bytes()).unwrap();
        assert_eq!(
            table.headers(),
            ["threads", "connections", "Requests/sec", "latency, avg"]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.numeric("connections").unwrap(), vec![10.0, 100.0]);
        assert_eq!(table.column("latency, avg").unwrap(), vec!["650us", "1.2ms"]);
        assert_eq!(
            table.parse_column("latency, avg", parse_latency).unwrap(),
            vec![0.65, 1.2]
        );
    }

    #[test]
    fn missing_column_is_an_error() {
        let table = Table::from_reader(WRK.as_bytes()).unwrap();
        assert!(matches!(
            table.numeric("transfer"),
            Err(TableError::MissingColumn(column)) if column == "transfer"
        ));
        assert!(table.require(&["threads", "elapsed"]).is_err());
        assert!(table.require(&["threads", "connections"]).is_ok());
    }

    #[test]
    fn invalid_values_name_their_row() {
        let table = Table::from_reader("launch,time\n1,2.5\n2,oops\n".as_bytes()).unwrap();
        match table.numeric("time") {
            Err(TableError::InvalidValue { row, column, value, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "time");
                assert_eq!(value, "oops");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn ragged_rows_fail_to_load() {
        assert!(Table::from_reader("a,b\n1,2\n3\n".as_bytes()).is_err());
    }

    #[test]
    fn loads_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(WRK.as_bytes()).unwrap();
        let table = Table::from_path(file.path()).unwrap();
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[1].index(), 1);
        assert_eq!(rows[1].get("Requests/sec").unwrap(), "9000");
        assert_eq!(rows[0].number("threads").unwrap(), 1.0);
    }
}
