//! Parser del protocolo de texto de la pantalla.
//!
//! Forma corta: `!<cmd>@<vv>`, con un valor de exactamente dos caracteres.
//! Forma larga: `%<cmd>@<k1>=<v1>&<k2>=<v2>...`.
//! La forma corta `edCap` con una edicion abierta lleva `&est=..&tot=..&cpo=..`.
use log::{debug, warn};

use crate::bottle::CapacityEdit;

const SHORT_FORM_PREFIX: char = '!';
const LONG_FORM_PREFIX: char = '%';
const SEPARATOR: char = '@';
const SHORT_VALUE_WIDTH: usize = 2;

pub const EDIT_CAPACITY_COMMAND: &str = "edCap";
const ESTIMATED_CAPACITY_KEY: &str = "est";
const TOTAL_CAPACITY_KEY: &str = "tot";
const COST_PER_OZ_KEY: &str = "cpo";
const UNCHANGED: f64 = -1.0;

/// Un comando con su valor, tal como llego por el canal de entrada
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputData {
    pub cmd: String,
    pub value: String,
}

impl InputData {
    pub fn new(cmd: &str, value: &str) -> InputData {
        InputData {
            cmd: cmd.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// Forma corta. Nunca esta vacio. Si el primer comando no tiene `cmd`, no hubo entrada.
    Commands(Vec<InputData>),
    /// Forma larga: el comando principal seguido de sus pares, en orden
    LongForm(Vec<InputData>),
    /// `edCap` con una edicion abierta: no pasa por el dispatcher
    CapacityEdit { bottle_id: usize, edit: CapacityEdit },
}

impl ParsedLine {
    fn empty() -> ParsedLine {
        ParsedLine::Commands(vec![InputData::default()])
    }

    pub fn first_command(&self) -> Option<&InputData> {
        match self {
            ParsedLine::Commands(commands) | ParsedLine::LongForm(commands) => commands.first(),
            ParsedLine::CapacityEdit { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_command()
            .map(|input| input.cmd.is_empty())
            .unwrap_or(false)
    }
}

/// Parsea una linea cruda. `edit_session` es la botella que se esta editando, si hay una.
pub fn parse_line(raw: &str, edit_session: Option<usize>) -> ParsedLine {
    let line: String = raw
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect();

    let mut chars = line.chars();
    let parsed = match chars.next() {
        Some(SHORT_FORM_PREFIX) => parse_short_form(chars.as_str(), edit_session),
        Some(LONG_FORM_PREFIX) => parse_long_form(chars.as_str()),
        _ => None,
    };

    match parsed {
        Some(parsed) => parsed,
        None => {
            if !line.is_empty() {
                debug!("[PARSER] Ignoring unrecognized input {:?}", line);
            }
            ParsedLine::empty()
        }
    }
}

fn parse_short_form(body: &str, edit_session: Option<usize>) -> Option<ParsedLine> {
    let (cmd, rest) = body.split_once(SEPARATOR)?;
    let cmd = cmd.trim();

    if cmd == EDIT_CAPACITY_COMMAND {
        if let Some(bottle_id) = edit_session {
            return Some(ParsedLine::CapacityEdit {
                bottle_id,
                edit: parse_capacity_edit(rest),
            });
        }
    }

    let value: String = rest.chars().take(SHORT_VALUE_WIDTH).collect();
    Some(ParsedLine::Commands(vec![InputData::new(cmd, &value)]))
}

fn parse_long_form(body: &str) -> Option<ParsedLine> {
    let (main_cmd, rest) = body.split_once(SEPARATOR)?;
    let mut commands = vec![InputData::new(main_cmd.trim(), "")];
    commands.extend(key_values(rest).map(|(key, value)| InputData::new(key, value)));
    Some(ParsedLine::LongForm(commands))
}

fn key_values<'a>(rest: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    rest.split('&')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => (pair.trim(), ""),
        })
}

fn parse_capacity_edit(rest: &str) -> CapacityEdit {
    let mut edit = CapacityEdit::default();
    for (key, value) in key_values(rest) {
        let field = match key {
            ESTIMATED_CAPACITY_KEY => &mut edit.estimated_capacity,
            TOTAL_CAPACITY_KEY => &mut edit.total_capacity,
            COST_PER_OZ_KEY => &mut edit.cost_per_oz,
            _ => {
                warn!("[PARSER] Unknown capacity edit key {:?}", key);
                continue;
            }
        };
        match value.parse::<f64>() {
            Ok(number) if number == UNCHANGED => {}
            Ok(number) if number.is_finite() && number >= 0.0 => *field = Some(number),
            _ => warn!("[PARSER] Invalid value {:?} for {}, leaving it unchanged", value, key),
        }
    }
    edit
}
