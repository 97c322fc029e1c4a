use std::{
    io::BufRead,
    sync::{Arc, Mutex},
};

use log::{debug, error, info};

use crate::{errors::MachineError, input_queue::InputQueue};

/// Lee lineas del lector y las agrega a la cola. Al terminar marca la cola como finalizada.
pub fn read_and_add_lines<R: BufRead>(
    reader: R,
    input_queue: Arc<Mutex<InputQueue>>,
) -> Result<(), MachineError> {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                error!("[READER] Error reading input: {}", err);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        debug!("[READER] Received {:?}", line);
        input_queue.lock()?.push(line);
    }
    input_queue.lock()?.finished = true;
    info!("[READER] No more input left");
    Ok(())
}
