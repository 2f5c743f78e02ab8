// src/process/reshape.rs
use super::{parse_csv, utils::clean_str, Table};
use crate::error::EtlError;
use tracing::{debug, info, instrument};

pub const SEKTOR: &str = "SEKTOR";
pub const MESEC: &str = "MESEC";
pub const LETO: &str = "LETO";
pub const GROSS_NET: &str = "Bruto/Neto";
pub const PAY: &str = "Plača za mesec (EUR)";

/// Separator between year and month in the API's period codes (`2023M05`).
const PERIOD_SEPARATOR: char = 'M';

/// Which of the two wage measures a long-form row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Bruto,
    Neto,
}

impl Measure {
    pub fn as_str(self) -> &'static str {
        match self {
            Measure::Bruto => "Bruto",
            Measure::Neto => "Neto",
        }
    }
}

/// Split a `yyyyMmm` period into `(year, month)`.
pub fn split_period(period: &str) -> Result<(String, String), EtlError> {
    let parts: Vec<&str> = period.split(PERIOD_SEPARATOR).collect();
    match parts.as_slice() {
        [year, month] => Ok((year.to_string(), month.to_string())),
        _ => Err(EtlError::malformed(format!(
            "period {:?} does not split into year and month on {:?}",
            period, PERIOD_SEPARATOR
        ))),
    }
}

/// Strip quoting from `SEKTOR` and `MESEC`, then split `MESEC` into a new
/// `LETO` column (inserted right before it) and the month.
pub fn normalize(mut table: Table) -> Result<Table, EtlError> {
    table.map_column(SEKTOR, clean_str)?;
    table.map_column(MESEC, clean_str)?;

    let mesec_idx = table.column_index(MESEC)?;
    for (idx, row) in table.rows.iter_mut().enumerate() {
        let (year, month) = split_period(&row[mesec_idx])
            .map_err(|e| EtlError::malformed(format!("data row {}: {}", idx + 1, e)))?;
        row[mesec_idx] = month;
        row.insert(mesec_idx, year);
    }
    table.headers.insert(mesec_idx, LETO.to_string());
    Ok(table)
}

/// Turn the two trailing value columns into `Bruto/Neto` + `Plača za mesec (EUR)`.
///
/// All Bruto rows come first, then all Neto rows, each in input order.
pub fn pivot_gross_net(table: &Table) -> Result<Table, EtlError> {
    let keys = [
        table.column_index(SEKTOR)?,
        table.column_index(LETO)?,
        table.column_index(MESEC)?,
    ];
    let values: Vec<usize> = (0..table.headers.len())
        .filter(|i| !keys.contains(i))
        .collect();
    let &[bruto, neto] = values.as_slice() else {
        return Err(EtlError::malformed(format!(
            "expected two value columns besides {}/{}/{}, found {:?}",
            SEKTOR,
            LETO,
            MESEC,
            values.iter().map(|&i| &table.headers[i]).collect::<Vec<_>>()
        )));
    };
    debug!(
        bruto = %table.headers[bruto],
        neto = %table.headers[neto],
        "pivoting value columns"
    );

    let headers = vec![
        SEKTOR.to_string(),
        LETO.to_string(),
        MESEC.to_string(),
        GROSS_NET.to_string(),
        PAY.to_string(),
    ];
    let mut rows = Vec::with_capacity(table.len() * 2);
    for (measure, col) in [(Measure::Bruto, bruto), (Measure::Neto, neto)] {
        rows.extend(table.rows.iter().map(|row| {
            let mut out: Vec<String> = keys.iter().map(|&k| row[k].clone()).collect();
            out.push(measure.as_str().to_string());
            out.push(row[col].clone());
            out
        }));
    }
    Table::new(headers, rows)
}

/// Parse, normalize and (optionally) pivot a CSV response body.
#[instrument(level = "info", skip(text), fields(bytes = text.len()))]
pub fn reshape(text: &str, pivot: bool) -> Result<Table, EtlError> {
    let table = normalize(parse_csv(text)?)?;
    let table = if pivot { pivot_gross_net(&table)? } else { table };
    info!(rows = table.len(), columns = table.headers.len(), pivot, "reshaped");
    Ok(table)
}
