//! Hardware simulado para correr la maquina sin la placa.
//! La balanza sube mientras haya algun motor encendido; siempre hay un vaso apoyado.
use std::{cell::RefCell, rc::Rc};

use log::{debug, info};
use rand::Rng;

use crate::{
    constants::MOTOR_COUNT,
    errors::TransportError,
    hardware::{ActuatorBank, InboundMessage, ProgressSink, StatusChannel, WeightSource},
};

struct RigState {
    weight: f64,
    tare_offset: f64,
    cup_weight: f64,
    flow_per_read: f64,
    motors: [bool; MOTOR_COUNT],
}

#[derive(Clone)]
pub struct SimulatedRig {
    state: Rc<RefCell<RigState>>,
}

impl SimulatedRig {
    pub fn new(cup_weight: f64, flow_per_read: f64) -> SimulatedRig {
        SimulatedRig {
            state: Rc::new(RefCell::new(RigState {
                weight: 0.0,
                tare_offset: 0.0,
                cup_weight,
                flow_per_read,
                motors: [false; MOTOR_COUNT],
            })),
        }
    }

    pub fn scale(&self) -> SimulatedScale {
        SimulatedScale { rig: self.clone() }
    }

    pub fn motors(&self) -> SimulatedMotors {
        SimulatedMotors { rig: self.clone() }
    }
}

pub struct SimulatedScale {
    rig: SimulatedRig,
}

impl WeightSource for SimulatedScale {
    fn current_weight(&mut self) -> f64 {
        let mut state = self.rig.state.borrow_mut();
        if state.motors.iter().any(|on| *on) {
            let jitter = state.flow_per_read * 0.1;
            let mut gained = state.flow_per_read;
            if jitter > 0.0 {
                gained += rand::thread_rng().gen_range(-jitter, jitter);
            }
            state.weight += gained;
        }
        state.weight - state.tare_offset + state.cup_weight
    }

    fn tare(&mut self) {
        let mut state = self.rig.state.borrow_mut();
        state.tare_offset = state.weight;
        debug!("[SIMULATOR] Tared at {:.2}", state.weight);
    }
}

pub struct SimulatedMotors {
    rig: SimulatedRig,
}

impl ActuatorBank for SimulatedMotors {
    fn set_motor(&mut self, motor_id: usize, on: bool) {
        let mut state = self.rig.state.borrow_mut();
        if let Some(motor) = state.motors.get_mut(motor_id) {
            *motor = on;
        }
    }
}

/// Progreso por log en lugar del anillo de leds
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn set_percentage(&mut self, percentage: f64) {
        debug!("[PROGRESS] {:.0}%", percentage);
    }

    fn clear(&mut self) {
        debug!("[PROGRESS] Cleared");
    }

    fn signal_success(&mut self) {
        info!("[PROGRESS] Success");
    }

    fn signal_fault(&mut self) {
        info!("[PROGRESS] Fault");
    }
}

/// Canal de estado que imprime lo publicado por consola y nunca recibe mensajes
pub struct ConsoleStatusChannel;

impl StatusChannel for ConsoleStatusChannel {
    fn connect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), TransportError> {
        println!("[{}] {}", topic, payload);
        Ok(())
    }

    fn service(&mut self) {}

    fn poll_inbound(&mut self) -> Vec<InboundMessage> {
        Vec::new()
    }
}
