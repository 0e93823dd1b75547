use std::io::{Read, Write};

use crate::models::{COLUMNS, CleanedJob};

/// Header plus one row per cleaned job.
pub fn write_silver<W: Write>(w: W, jobs: &[CleanedJob]) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(w);
    writer.write_record(COLUMNS)?;
    for job in jobs {
        writer.write_record(job.to_row())?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads the header and every data row. Row lengths are not enforced here;
/// the loader reports ragged rows with their line number.
pub fn read_silver<R: Read>(input: R) -> csv::Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let header = reader.headers()?.iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|record| record.map(|r| r.iter().map(String::from).collect()))
        .collect::<csv::Result<Vec<Vec<String>>>>()?;

    Ok((header, rows))
}
