//! Flat tabular outputs: the bronze aggregate, the silver analysis table,
//! the correlation matrix, and the yearly totals series.
//!
//! Undefined values (None / NaN) render as empty fields; a known zero
//! renders as `0`. BTree-ordered rows and columns keep re-runs
//! byte-for-byte identical.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::aggregate::AnnualMatrix;
use crate::analysis::CorrelationMatrix;
use crate::merge::AnalysisRecord;

/// Output files carry a UTF-8 BOM so spreadsheet tools pick the right
/// encoding for the accented indicator names.
pub fn create_with_bom(path: &Path) -> io::Result<File> {
    let mut file = File::create(path)?;
    file.write_all("\u{feff}".as_bytes())?;
    Ok(file)
}

fn field(v: f64) -> String {
    if v.is_finite() { v.to_string() } else { String::new() }
}

fn opt_field(v: Option<f64>) -> String {
    v.map(field).unwrap_or_default()
}

/// Bronze tier: CD_MUN, NM_MUN, one column per observed year, total_km2.
pub fn write_annual_matrix<W: Write>(w: W, matrix: &AnnualMatrix) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(w);

    let mut header = vec!["CD_MUN".to_string(), "NM_MUN".to_string()];
    header.extend(matrix.years.iter().map(|y| y.to_string()));
    header.push("total_km2".to_string());
    out.write_record(&header)?;

    for row in &matrix.rows {
        let mut record = vec![row.code.as_str().to_string(), row.name.clone()];
        record.extend(
            matrix
                .years
                .iter()
                .map(|y| field(row.by_year.get(y).copied().unwrap_or(0.0))),
        );
        record.push(field(row.total_km2));
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

/// Silver tier: the annual matrix joined with indicators plus desmat_prop.
pub fn write_analysis_table<W: Write>(
    w: W,
    records: &[AnalysisRecord],
) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(w);

    let years: BTreeSet<i32> = records
        .iter()
        .flat_map(|r| r.by_year.keys().copied())
        .collect();

    let mut header = vec!["CD_MUN".to_string(), "NM_MUN".to_string()];
    header.extend(years.iter().map(|y| y.to_string()));
    header.extend(
        [
            "total_km2",
            "area_municipio_km2",
            "pib_per_capita",
            "ips",
            "necessidades_basicas",
            "fundamentos_bem_estar",
            "oportunidades",
            "desmat_prop",
        ]
        .map(String::from),
    );
    out.write_record(&header)?;

    for r in records {
        let mut record = vec![r.code.as_str().to_string(), r.name.clone()];
        record.extend(years.iter().map(|y| field(r.by_year.get(y).copied().unwrap_or(0.0))));
        record.push(field(r.total_km2));
        record.push(opt_field(r.municipality_area_km2));
        record.push(opt_field(r.pib_per_capita));
        record.push(opt_field(r.ips));
        record.push(opt_field(r.necessidades_basicas));
        record.push(opt_field(r.fundamentos_bem_estar));
        record.push(opt_field(r.oportunidades));
        record.push(opt_field(r.desmat_prop));
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

/// Square matrix with variable names down the first column, matching the
/// row/column labels in the header.
pub fn write_correlation<W: Write>(w: W, corr: &CorrelationMatrix) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(w);

    let mut header = vec![String::new()];
    header.extend(corr.variables.iter().cloned());
    out.write_record(&header)?;

    for (i, name) in corr.variables.iter().enumerate() {
        let mut record = vec![name.clone()];
        record.extend((0..corr.variables.len()).map(|j| field(corr.get(i, j))));
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

/// Yearly totals across all municipalities.
pub fn write_year_totals<W: Write>(w: W, matrix: &AnnualMatrix) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(w);
    out.write_record(["year", "area_km2"])?;
    for (year, total) in matrix.year_totals() {
        out.write_record([year.to_string(), field(total)])?;
    }
    out.flush()?;
    Ok(())
}
