//! Traduce los comandos parseados a la accion que tiene que ejecutar la maquina.
use log::{debug, info, warn};

use crate::{
    command_parser::InputData,
    constants::{BEV_COUNT, KNOWN_PAGES, MOTOR_COUNT},
    errors::MachineError,
    input_queue::CANCEL_COMMAND,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// No hubo entrada en este ciclo
    Nothing,
    GoPage(u8),
    Pour(usize),
    ToggleBottle(usize),
    BeginCapacityEdit(usize),
    Finish(u8),
    PublishStatus,
    Calibrate,
    /// Comando que no se reconoce o que no tiene efecto
    Ignored,
}

pub fn dispatch(commands: &[InputData]) -> Result<Action, MachineError> {
    let input = match commands {
        [] => return Ok(Action::Nothing),
        [input] => input,
        [main, pairs @ ..] => {
            // Las actualizaciones masivas llegan por el topico de botellas, no por aca
            info!(
                "[DISPATCHER] Received bulk command {} with {} fields, not acted upon",
                main.cmd,
                pairs.len()
            );
            return Ok(Action::Ignored);
        }
    };

    let action = match input.cmd.as_str() {
        "" => Action::Nothing,
        "gopage" => {
            let page = parse_number(input)?;
            if page < 0 || page > u8::MAX as i64 || !KNOWN_PAGES.contains(&(page as u8)) {
                warn!("[DISPATCHER] Unknown page {}", input.value);
                Action::Ignored
            } else {
                Action::GoPage(page as u8)
            }
        }
        "bev" => Action::Pour(parse_id(input, "beverage", BEV_COUNT)?),
        "ebs" => Action::ToggleBottle(parse_id(input, "bottle", MOTOR_COUNT)?),
        "ebc" => Action::BeginCapacityEdit(parse_id(input, "bottle", MOTOR_COUNT)?),
        "finish" => {
            let page = parse_number(input)?;
            Action::Finish(u8::try_from(page).map_err(|_| invalid_value(input))?)
        }
        "ss" => Action::PublishStatus,
        "cba" => Action::Calibrate,
        CANCEL_COMMAND => {
            debug!("[DISPATCHER] Nothing to cancel");
            Action::Ignored
        }
        other => {
            warn!("[DISPATCHER] Invalid command {:?}", other);
            Action::Ignored
        }
    };
    Ok(action)
}

fn parse_number(input: &InputData) -> Result<i64, MachineError> {
    input.value.trim().parse().map_err(|_| invalid_value(input))
}

fn parse_id(input: &InputData, kind: &'static str, max: usize) -> Result<usize, MachineError> {
    let id = parse_number(input)?;
    if id < 0 || id >= max as i64 {
        return Err(MachineError::IdOutOfRange { kind, id, max });
    }
    Ok(id as usize)
}

fn invalid_value(input: &InputData) -> MachineError {
    MachineError::InvalidValue {
        cmd: input.cmd.clone(),
        value: input.value.clone(),
    }
}
