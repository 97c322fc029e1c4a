//! Representacion de la cola de entradas (pantalla tactil y consola)
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use log::{debug, error};

use crate::{command_parser::parse_line, errors::MachineError};

pub const CANCEL_COMMAND: &str = "cancel";

/// Cola de lineas crudas pendientes de procesar. Se le agrega el campo `finished` para indicar que no van a llegar más lineas.
pub struct InputQueue {
    lines: VecDeque<String>,
    pub finished: bool,
}

impl InputQueue {
    pub fn new() -> InputQueue {
        InputQueue {
            lines: VecDeque::new(),
            finished: false,
        }
    }

    pub fn push(&mut self, line: String) {
        self.lines.push_back(line);
    }

    pub fn pop(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Extremo del loop de control de la cola de entradas. Nunca bloquea esperando una linea.
#[derive(Clone)]
pub struct InputChannel {
    queue: Arc<Mutex<InputQueue>>,
}

impl InputChannel {
    pub fn new(queue: Arc<Mutex<InputQueue>>) -> InputChannel {
        InputChannel { queue }
    }

    pub fn poll_line(&self) -> Result<Option<String>, MachineError> {
        Ok(self.queue.lock()?.pop())
    }

    /// No hay ni habra mas entradas
    pub fn is_exhausted(&self) -> Result<bool, MachineError> {
        let queue = self.queue.lock()?;
        Ok(queue.finished && queue.is_empty())
    }

    /// Consume las lineas pendientes y devuelve si alguna era un `cancel`.
    /// Si la cola quedo envenenada se asume cancelacion para no dejar un motor encendido.
    pub fn poll_cancel(&self) -> bool {
        let mut queue = match self.queue.lock() {
            Ok(queue) => queue,
            Err(_) => {
                error!("[READER] Input queue lock poisoned, treating as cancel");
                return true;
            }
        };
        let mut cancelled = false;
        while let Some(line) = queue.pop() {
            if is_cancel(&line) {
                cancelled = true;
            } else {
                debug!("[READER] Dropping input {:?} while busy", line);
            }
        }
        cancelled
    }
}

pub fn is_cancel(line: &str) -> bool {
    parse_line(line, None)
        .first_command()
        .map(|input| input.cmd == CANCEL_COMMAND)
        .unwrap_or(false)
}
