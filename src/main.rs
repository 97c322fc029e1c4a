pub mod beverage;
pub mod bottle;
pub mod bulk_import;
pub mod command_parser;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod dispenser;
pub mod errors;
pub mod faults;
pub mod hardware;
pub mod input_queue;
pub mod input_reader;
pub mod inventory;
pub mod inventory_store;
pub mod machine;
pub mod nextion;
pub mod simulated_hardware;
pub mod status;
#[cfg(test)]
mod testing;

use std::{
    env, io, process,
    sync::{Arc, Mutex},
    thread,
};

use log::error;
use simple_logger::SimpleLogger;

use config::MachineConfig;
use hardware::{Hardware, SystemClock};
use input_queue::{InputChannel, InputQueue};
use input_reader::read_and_add_lines;
use inventory_store::JsonFileStore;
use machine::Machine;
use nextion::NextionDisplay;
use simulated_hardware::{ConsoleStatusChannel, LogProgress, SimulatedRig};

const SIMULATED_CUP_WEIGHT: f64 = 40.0;
const SIMULATED_FLOW_PER_READ: f64 = 2.0;

fn main() {
    let config = match env::args().nth(1) {
        Some(path) => match MachineConfig::from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Could not read config {}: {}", path, err);
                process::exit(1);
            }
        },
        None => MachineConfig::default(),
    };

    if let Err(err) = SimpleLogger::new().with_level(config.level_filter()).init() {
        eprintln!("Could not start the logger: {}", err);
    }

    let store = match JsonFileStore::open(&config.store_path) {
        Ok(store) => store,
        Err(err) => {
            error!("[MACHINE] {}", err);
            process::exit(1);
        }
    };

    let input_queue = Arc::new(Mutex::new(InputQueue::new()));
    let reader_queue = input_queue.clone();
    thread::spawn(move || {
        if let Err(err) = read_and_add_lines(io::stdin().lock(), reader_queue) {
            error!("[READER] {}", err);
        }
    });

    let rig = SimulatedRig::new(SIMULATED_CUP_WEIGHT, SIMULATED_FLOW_PER_READ);
    let hardware = Hardware {
        weight: Box::new(rig.scale()),
        motors: Box::new(rig.motors()),
        progress: Box::new(LogProgress),
        display: Box::new(NextionDisplay::new(io::stdout())),
        clock: Box::new(SystemClock::new()),
    };

    let mut machine = match Machine::boot(
        config,
        hardware,
        Box::new(ConsoleStatusChannel),
        InputChannel::new(input_queue),
        Box::new(store),
    ) {
        Ok(machine) => machine,
        Err(_) => process::exit(1),
    };

    if let Err(err) = machine.run() {
        error!("[MACHINE] {}", err);
        process::exit(1);
    }
}
