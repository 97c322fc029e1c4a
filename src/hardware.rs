//! Interfaces con el hardware y los servicios externos de la maquina.
use std::{
    thread,
    time::{Duration, Instant},
};

use crate::errors::TransportError;

/// Balanza ya calibrada. Las lecturas estan en unidades crudas.
pub trait WeightSource {
    fn current_weight(&mut self) -> f64;
    fn tare(&mut self);
}

/// Banco de motores. El indice del motor es el id de la botella.
pub trait ActuatorBank {
    fn set_motor(&mut self, motor_id: usize, on: bool);
}

/// Indicador de progreso (anillo de leds)
pub trait ProgressSink {
    fn set_percentage(&mut self, percentage: f64);
    fn clear(&mut self);
    fn signal_success(&mut self);
    fn signal_fault(&mut self);
}

/// Pantalla tactil
pub trait Display {
    fn show_page(&mut self, page: u8);
    fn set_text(&mut self, item: &str, text: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: String,
}

/// Canal de estado hacia la nube. Puede no haber conectividad.
pub trait StatusChannel {
    fn connect(&mut self) -> Result<(), TransportError>;
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), TransportError>;
    /// Mantiene viva la conexion sin entregar mensajes
    fn service(&mut self);
    fn poll_inbound(&mut self) -> Vec<InboundMessage>;
}

pub trait Clock {
    fn now_ms(&self) -> u64;
    fn sleep_ms(&mut self, ms: u64);
}

pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> SystemClock {
        SystemClock {
            started: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn sleep_ms(&mut self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}

/// Todo lo que la maquina controla, agrupado para poder prestarlo por partes
pub struct Hardware {
    pub weight: Box<dyn WeightSource>,
    pub motors: Box<dyn ActuatorBank>,
    pub progress: Box<dyn ProgressSink>,
    pub display: Box<dyn Display>,
    pub clock: Box<dyn Clock>,
}
