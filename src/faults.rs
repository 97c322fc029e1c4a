//! Fallas de servido. Todas son recuperables: se muestran al usuario y se vuelve al menu.
use thiserror::Error;

/// Resultado de un servido de bebida que no termino bien.
/// Las fallas ocurridas en medio del servido llevan lo servido hasta el momento
/// para que se pueda cobrar y descontar correctamente.
///
/// `CupRemoved` y `BeverageCancelled` informan el total de la bebida y su precio.
/// `MotorTimeout` identifica un motor, asi que `measured_oz` es solo lo medido en esa botella.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispenseFault {
    #[error("Beverage {beverage_id} is disabled.")]
    BeverageDisabled { beverage_id: usize },
    #[error("Bottle {bottle_id} is disabled.")]
    BottleDisabled { bottle_id: usize },
    #[error("Bottle {bottle_id} does not have enough left ({remaining_oz:.2} oz for {requested_oz:.2} oz).")]
    InsufficientCapacity {
        bottle_id: usize,
        remaining_oz: f64,
        requested_oz: f64,
    },
    #[error("No cup detected. Place a cup and try again.")]
    CupNotFound,
    #[error("Cup removed after {dispensed_oz:.2} oz (${price_dispensed:.2}).")]
    CupRemoved {
        dispensed_oz: f64,
        price_dispensed: f64,
    },
    #[error("Motor {motor_id} timed out after {elapsed_ms} ms ({measured_oz:.2} oz measured).")]
    MotorTimeout {
        motor_id: usize,
        elapsed_ms: u64,
        measured_oz: f64,
    },
    #[error("Beverage cancelled after {dispensed_oz:.2} oz (${price_dispensed:.2}).")]
    BeverageCancelled {
        dispensed_oz: f64,
        price_dispensed: f64,
    },
    #[error("Machine is not calibrated.")]
    MachineNotCalibrated,
}

impl DispenseFault {
    /// Indica si la falla ocurrio antes de encender cualquier motor
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DispenseFault::BeverageDisabled { .. }
                | DispenseFault::BottleDisabled { .. }
                | DispenseFault::InsufficientCapacity { .. }
                | DispenseFault::CupNotFound
                | DispenseFault::MachineNotCalibrated
        )
    }
}

/// Motivo por el cual se corto el servido de una botella antes de llegar al objetivo
#[derive(Debug, Clone, PartialEq)]
pub enum PourInterrupted {
    Cancelled { dispensed_oz: f64 },
    CupRemoved { dispensed_oz: f64 },
    Timeout {
        motor_id: usize,
        elapsed_ms: u64,
        measured_oz: f64,
    },
}

impl PourInterrupted {
    pub fn dispensed_oz(&self) -> f64 {
        match self {
            PourInterrupted::Cancelled { dispensed_oz } => *dispensed_oz,
            PourInterrupted::CupRemoved { dispensed_oz } => *dispensed_oz,
            PourInterrupted::Timeout { measured_oz, .. } => *measured_oz,
        }
    }

    pub fn into_fault(self, dispensed_oz: f64, price_dispensed: f64) -> DispenseFault {
        match self {
            PourInterrupted::Cancelled { .. } => DispenseFault::BeverageCancelled {
                dispensed_oz,
                price_dispensed,
            },
            PourInterrupted::CupRemoved { .. } => DispenseFault::CupRemoved {
                dispensed_oz,
                price_dispensed,
            },
            PourInterrupted::Timeout {
                motor_id,
                elapsed_ms,
                measured_oz,
            } => DispenseFault::MotorTimeout {
                motor_id,
                elapsed_ms,
                measured_oz,
            },
        }
    }
}
