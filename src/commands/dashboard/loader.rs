use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook_auto, DataType, Range, Reader, Sheets};
use log::{debug, info};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::config::Config;
use super::models::{CityRow, Coordinate, RawSheet};

pub const CITY_COLUMN: &str = "City";
pub const LATITUDE_COLUMN: &str = "Latitude";
pub const LONGITUDE_COLUMN: &str = "Longitude";

#[derive(Clone, Debug, Default)]
pub struct Workbook {
    pub cities: Vec<CityRow>,
    pub secondary: RawSheet,
}

/// Reads the city sheet and the secondary sheet. Any failure here is fatal to the run.
pub fn load_workbook(path: &Path, cfg: &Config) -> Result<Workbook> {
    if !path.exists() {
        bail!("XLSX file not found: {}", path.display());
    }
    let mut wb = open_workbook_auto(path)
        .with_context(|| format!("Open workbook {}", path.display()))?;

    let cities_range = read_sheet(&mut wb, &cfg.cities_sheet)?;
    let secondary_range = read_sheet(&mut wb, &cfg.secondary_sheet)?;

    let cities = parse_cities(&cities_range, &cfg.cities_sheet)?;
    let secondary = parse_raw(&secondary_range);
    info!(
        "Loaded {} cities from '{}' ({} rows in '{}')",
        cities.len(),
        cfg.cities_sheet,
        secondary.rows.len(),
        cfg.secondary_sheet
    );
    Ok(Workbook { cities, secondary })
}

fn read_sheet(wb: &mut Sheets<BufReader<File>>, name: &str) -> Result<Range<DataType>> {
    match wb.worksheet_range(name) {
        Some(r) => r.with_context(|| format!("Read worksheet '{}'", name)),
        None => bail!("Worksheet '{}' not found", name),
    }
}

pub fn parse_cities(range: &Range<DataType>, sheet: &str) -> Result<Vec<CityRow>> {
    let mut rows_iter = range.rows();
    let headers: Vec<Option<String>> = match rows_iter.next() {
        Some(r) => r.iter().map(normalize_header).collect(),
        None => bail!("Worksheet '{}' is empty", sheet),
    };
    let city_idx = column_index(&headers, CITY_COLUMN, sheet)?;
    let lat_idx = column_index(&headers, LATITUDE_COLUMN, sheet)?;
    let lon_idx = column_index(&headers, LONGITUDE_COLUMN, sheet)?;

    // header row sits at the first used row; report spreadsheet row numbers
    let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);

    let mut out = Vec::new();
    for (i, data_row) in rows_iter.enumerate() {
        if data_row.iter().all(|c| matches!(c, DataType::Empty)) {
            continue;
        }
        let row_no = first_row + i + 2;
        let cell = |idx: usize| data_row.get(idx).unwrap_or(&DataType::Empty);
        let name = cell_to_string(cell(city_idx));
        let lat = cell_to_f64(cell(lat_idx)).ok_or_else(|| {
            anyhow!("{} row {}: invalid {} value {:?}", sheet, row_no, LATITUDE_COLUMN, cell(lat_idx))
        })?;
        let lon = cell_to_f64(cell(lon_idx)).ok_or_else(|| {
            anyhow!("{} row {}: invalid {} value {:?}", sheet, row_no, LONGITUDE_COLUMN, cell(lon_idx))
        })?;
        out.push(CityRow { name, position: Coordinate::new(lat, lon) });
    }
    debug!("Parsed {} city rows from '{}'", out.len(), sheet);
    Ok(out)
}

pub fn parse_raw(range: &Range<DataType>) -> RawSheet {
    let mut rows_iter = range.rows();
    let headers = match rows_iter.next() {
        Some(r) => r.iter().map(|h| normalize_header(h).unwrap_or_default()).collect(),
        None => return RawSheet::default(),
    };
    let rows = rows_iter
        .filter(|r| !r.iter().all(|c| matches!(c, DataType::Empty)))
        .map(|r| r.iter().map(cell_to_string).collect())
        .collect();
    RawSheet { headers, rows }
}

fn column_index(headers: &[Option<String>], name: &str, sheet: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.as_deref() == Some(name))
        .ok_or_else(|| anyhow!("Worksheet '{}' has no '{}' column", sheet, name))
}

fn normalize_header(h: &DataType) -> Option<String> {
    match h {
        DataType::Empty => None,
        other => {
            let s = other.to_string();
            let s = s.trim();
            if s.is_empty() { None } else { Some(s.to_string()) }
        }
    }
}

/// Degrees must be finite; "NaN" and "inf" parse as f64 but are not coordinates.
fn cell_to_f64(raw: &DataType) -> Option<f64> {
    let v = match raw {
        DataType::Float(f) => Some(*f),
        DataType::Int(i) => Some(*i as f64),
        DataType::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    v.filter(|v| v.is_finite())
}

fn cell_to_string(raw: &DataType) -> String {
    match raw {
        DataType::Empty => String::new(),
        DataType::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}
