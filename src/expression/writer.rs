//! Writes the outcome of an evaluation as a JSON document.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use serde::Serialize;

use crate::error::Result;

#[derive(Serialize)]
struct ResultDoc<'a> {
    result: &'a [Vec<f64>],
}

#[derive(Serialize)]
struct ErrorDoc<'a> {
    error: &'a str,
}

/// Writes `{"result": matrix}` to `path`, replacing any previous content.
pub fn write_result<P: AsRef<Path>>(path: P, matrix: &[Vec<f64>]) -> Result<()> {
    write_doc(path, &ResultDoc { result: matrix })
}

/// Writes `{"error": message}` to `path`, replacing any previous content.
pub fn write_error<P: AsRef<Path>>(path: P, message: &str) -> Result<()> {
    write_doc(path, &ErrorDoc { error: message })
}

fn write_doc<P: AsRef<Path>, T: Serialize>(path: P, doc: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, doc)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
