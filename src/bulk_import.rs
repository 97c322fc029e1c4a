//! Lectura del archivo de importacion masiva (un campo por linea).
use std::{fs, path::Path, str::FromStr};

use log::info;

use crate::{
    beverage::Beverage,
    bottle::Bottle,
    constants::{BEV_COUNT, MOTOR_COUNT},
    errors::{ImportError, MachineError},
};

const NO_INSTRUCTIONS: &str = "null";

struct Lines<'a> {
    lines: std::str::Lines<'a>,
    line: usize,
}

impl<'a> Lines<'a> {
    fn next_field(&mut self) -> Result<&'a str, ImportError> {
        self.line += 1;
        self.lines
            .next()
            .map(str::trim)
            .ok_or(ImportError::UnexpectedEof { line: self.line })
    }

    fn parse<T: FromStr>(&mut self, field: &'static str) -> Result<T, ImportError> {
        let raw = self.next_field()?;
        raw.parse().map_err(|_| self.invalid(field, raw))
    }

    fn flag(&mut self, field: &'static str) -> Result<bool, ImportError> {
        match self.next_field()? {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(self.invalid(field, other)),
        }
    }

    fn invalid(&self, field: &'static str, value: &str) -> ImportError {
        ImportError::InvalidField {
            line: self.line,
            field,
            value: value.to_string(),
        }
    }
}

fn read_bottle(lines: &mut Lines) -> Result<Bottle, ImportError> {
    Ok(Bottle {
        name: lines.next_field()?.to_string(),
        id: lines.parse("bottle id")?,
        active: lines.flag("bottle active")?,
        is_shot: lines.flag("bottle isShot")?,
        cost_per_oz: lines.parse("bottle costPerOz")?,
        estimated_capacity: lines.parse("bottle estimatedCapacity")?,
        total_capacity: lines.parse("bottle totalCapacity")?,
    })
}

fn read_beverage(lines: &mut Lines) -> Result<Beverage, ImportError> {
    let name = lines.next_field()?.to_string();
    let id = lines.parse("beverage id")?;
    let is_active = lines.flag("beverage active")?;

    let raw_oz = lines.next_field()?;
    let parsed: Result<Vec<f64>, _> = raw_oz.split_whitespace().map(str::parse).collect();
    let oz_arr: [f64; MOTOR_COUNT] = match parsed {
        Ok(values) if values.iter().all(|oz| *oz >= 0.0) => values
            .try_into()
            .map_err(|_| lines.invalid("beverage ozArr", raw_oz))?,
        _ => return Err(lines.invalid("beverage ozArr", raw_oz)),
    };

    let additional_instructions = match lines.next_field()? {
        NO_INSTRUCTIONS => String::new(),
        text => text.to_string(),
    };

    Ok(Beverage {
        id,
        name,
        is_active,
        oz_arr,
        additional_instructions,
    })
}

pub fn parse_import(content: &str) -> Result<(Vec<Bottle>, Vec<Beverage>), ImportError> {
    let mut lines = Lines {
        lines: content.lines(),
        line: 0,
    };
    let bottles = (0..MOTOR_COUNT)
        .map(|_| read_bottle(&mut lines))
        .collect::<Result<Vec<_>, _>>()?;
    let beverages = (0..BEV_COUNT)
        .map(|_| read_beverage(&mut lines))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((bottles, beverages))
}

pub fn read_import_file<P: AsRef<Path>>(path: P) -> Result<(Vec<Bottle>, Vec<Beverage>), MachineError> {
    let content = fs::read_to_string(&path).map_err(crate::errors::StoreError::from)?;
    let parsed = parse_import(&content)?;
    info!("[INVENTORY] Imported {}", path.as_ref().display());
    Ok(parsed)
}
