use std::{fs, io::Read, path::Path, str::FromStr};

use serde::Deserialize;

use crate::{
    Cell, Error, Result,
    io::options::{InputFormat, OptimizerOptions},
};

const CSV_MIN_FIELDS: usize = 4;
const CSV_MAX_FIELDS: usize = 9;

/// A JSON document is either a bare cell array or `{ "cells": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CellsDocument {
    List(Vec<Cell>),
    Wrapped { cells: Vec<Cell> },
}

/// Read cells from `--input` (or stdin) in the configured format.
pub fn read_cells(options: &OptimizerOptions) -> Result<Vec<Cell>> {
    let (text, source) = match options.input_path() {
        Some(path) => (read_file(path)?, path.display().to_string()),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            (text, "stdin".to_string())
        }
    };

    let cells = parse_cells(&text, options.input_format)?;
    log::info!(
        "input: source={source} format={} cells={}",
        options.input_format,
        cells.len()
    );
    Ok(cells)
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        Error::invalid_input(format!("failed to read input file {}: {e}", path.display()))
    })
}

pub fn parse_cells(text: &str, format: InputFormat) -> Result<Vec<Cell>> {
    let cells = match format {
        InputFormat::Json => parse_cells_json(text)?,
        InputFormat::Csv => parse_cells_csv(text)?,
    };
    if cells.is_empty() {
        return Err(Error::invalid_input("No cells provided."));
    }
    Ok(cells)
}

fn parse_cells_json(text: &str) -> Result<Vec<Cell>> {
    let document: CellsDocument = serde_json::from_str(text)?;
    Ok(match document {
        CellsDocument::List(cells) | CellsDocument::Wrapped { cells } => cells,
    })
}

/// `id,pci,lat,lng[,frequency_mhz[,rs_power[,enodeb,sector[,azimuth]]]]`,
/// one cell per line. Blank lines, `#` comments and an `id,pci,...` header
/// are skipped; empty optional fields stay unset.
pub fn parse_cells_csv(text: &str) -> Result<Vec<Cell>> {
    let mut cells = Vec::new();
    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if cells.is_empty() && fields.get(1).is_some_and(|f| f.eq_ignore_ascii_case("pci")) {
            continue;
        }
        if !(CSV_MIN_FIELDS..=CSV_MAX_FIELDS).contains(&fields.len()) {
            return Err(Error::invalid_input(format!(
                "Line {line_no}: expected {CSV_MIN_FIELDS}-{CSV_MAX_FIELDS} comma fields but got {}: {line}",
                fields.len()
            )));
        }

        let id = fields[0];
        if id.is_empty() {
            return Err(Error::invalid_input(format!("Line {line_no}: missing cell id")));
        }
        let mut cell = Cell::new(
            id,
            required(&fields, 1, "pci", line_no)?,
            required(&fields, 2, "latitude", line_no)?,
            required(&fields, 3, "longitude", line_no)?,
        );
        cell.frequency_mhz = optional(&fields, 4, "frequency", line_no)?;
        cell.rs_power = optional(&fields, 5, "rs power", line_no)?;
        cell.enodeb = optional(&fields, 6, "enodeb", line_no)?;
        cell.sector = optional(&fields, 7, "sector", line_no)?;
        cell.azimuth = optional(&fields, 8, "azimuth", line_no)?;
        cells.push(cell);
    }
    Ok(cells)
}

fn required<T: FromStr>(fields: &[&str], idx: usize, what: &str, line_no: usize) -> Result<T> {
    optional(fields, idx, what, line_no)?
        .ok_or_else(|| Error::invalid_input(format!("Line {line_no}: missing {what}")))
}

fn optional<T: FromStr>(
    fields: &[&str],
    idx: usize,
    what: &str,
    line_no: usize,
) -> Result<Option<T>> {
    match fields.get(idx).copied() {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            Error::invalid_input(format!("Line {line_no}: invalid {what}: {raw}"))
        }),
    }
}
