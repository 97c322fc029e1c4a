//! Dispenser de la maquina. Valida y sirve una bebida botella por botella.
use log::{debug, info, warn};

use crate::{
    beverage::Beverage,
    config::MachineConfig,
    faults::{DispenseFault, PourInterrupted},
    hardware::{ActuatorBank, Hardware},
    input_queue::InputChannel,
    inventory::Inventory,
    status::StatusSync,
};

/// Parametros del servido, tomados de la configuracion
#[derive(Debug, Clone)]
pub struct DispenseSettings {
    pub scale_oz_factor: f64,
    pub safety_margin_oz: f64,
    pub min_cup_weight: f64,
    pub cup_removal_threshold: f64,
    pub motor_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl From<&MachineConfig> for DispenseSettings {
    fn from(config: &MachineConfig) -> Self {
        DispenseSettings {
            scale_oz_factor: config.scale_oz_factor,
            safety_margin_oz: config.safety_margin_oz,
            min_cup_weight: config.min_cup_weight,
            cup_removal_threshold: config.cup_removal_threshold,
            motor_timeout_ms: config.motor_timeout_ms,
            poll_interval_ms: config.poll_interval_ms.max(1),
        }
    }
}

impl DispenseSettings {
    fn to_oz(&self, raw: f64) -> f64 {
        raw / self.scale_oz_factor
    }
}

/// Resumen de una bebida servida completa
#[derive(Debug, Clone, PartialEq)]
pub struct DispenseReceipt {
    pub beverage_id: usize,
    pub dispensed_oz: f64,
    pub total_cost: f64,
}

/// Enciende un motor y lo apaga al salir de scope, por cualquier camino
struct MotorGuard<'a, M: ActuatorBank + ?Sized> {
    motors: &'a mut M,
    motor_id: usize,
}

impl<'a, M: ActuatorBank + ?Sized> MotorGuard<'a, M> {
    fn engage(motors: &'a mut M, motor_id: usize) -> Self {
        debug!("[DISPENSER] Motor {} on", motor_id);
        motors.set_motor(motor_id, true);
        MotorGuard { motors, motor_id }
    }
}

impl<M: ActuatorBank + ?Sized> Drop for MotorGuard<'_, M> {
    fn drop(&mut self) {
        self.motors.set_motor(self.motor_id, false);
        debug!("[DISPENSER] Motor {} off", self.motor_id);
    }
}

pub struct Dispenser<'a> {
    hardware: &'a mut Hardware,
    status: &'a mut StatusSync,
    input: &'a InputChannel,
    settings: &'a DispenseSettings,
}

impl<'a> Dispenser<'a> {
    pub fn new(
        hardware: &'a mut Hardware,
        status: &'a mut StatusSync,
        input: &'a InputChannel,
        settings: &'a DispenseSettings,
    ) -> Dispenser<'a> {
        Dispenser {
            hardware,
            status,
            input,
            settings,
        }
    }

    /// Sirve la bebida completa. Descuenta la capacidad de cada botella apenas termina su
    /// servido, aun si se corto, y en ese caso devuelve la falla con lo cobrado hasta ahi.
    pub fn create_beverage(
        &mut self,
        inventory: &mut Inventory,
        beverage: &Beverage,
        calibrated: bool,
    ) -> Result<DispenseReceipt, DispenseFault> {
        self.check_preconditions(inventory, beverage, calibrated)?;

        let total_requested_oz = beverage.total_oz();
        let mut poured_oz = 0.0;
        let mut total_cost = 0.0;
        info!(
            "[DISPENSER] Pouring {} ({:.2} oz)",
            beverage.name, total_requested_oz
        );

        for (bottle_id, requested_oz) in beverage.ingredients() {
            let result = self.pour(bottle_id, requested_oz, poured_oz, total_requested_oz);
            let dispensed_oz = match &result {
                Ok(dispensed_oz) => *dispensed_oz,
                Err(interrupted) => interrupted.dispensed_oz(),
            };

            let cost_per_oz = inventory
                .bottle(bottle_id)
                .map(|bottle| bottle.cost_per_oz)
                .unwrap_or(0.0);
            total_cost += dispensed_oz * cost_per_oz;
            poured_oz += dispensed_oz;
            if let Err(err) = inventory.consume(bottle_id, dispensed_oz) {
                warn!("[DISPENSER] Could not update bottle {}: {}", bottle_id, err);
            }

            if let Err(interrupted) = result {
                warn!(
                    "[DISPENSER] {} interrupted at bottle {}: {:?}",
                    beverage.name, bottle_id, interrupted
                );
                return Err(interrupted.into_fault(poured_oz, total_cost));
            }
        }

        info!(
            "[DISPENSER] Finished {}: {:.2} oz, cost {:.2}",
            beverage.name, poured_oz, total_cost
        );
        Ok(DispenseReceipt {
            beverage_id: beverage.id,
            dispensed_oz: poured_oz,
            total_cost,
        })
    }

    fn check_preconditions(
        &mut self,
        inventory: &Inventory,
        beverage: &Beverage,
        calibrated: bool,
    ) -> Result<(), DispenseFault> {
        if !beverage.is_active {
            return Err(DispenseFault::BeverageDisabled {
                beverage_id: beverage.id,
            });
        }
        if !calibrated {
            return Err(DispenseFault::MachineNotCalibrated);
        }
        for (bottle_id, requested_oz) in beverage.ingredients() {
            let bottle = inventory
                .bottle(bottle_id)
                .map_err(|_| DispenseFault::BottleDisabled { bottle_id })?;
            if !bottle.active {
                return Err(DispenseFault::BottleDisabled { bottle_id });
            }
            if !(bottle.pourable_oz(self.settings.safety_margin_oz) >= requested_oz) {
                return Err(DispenseFault::InsufficientCapacity {
                    bottle_id,
                    remaining_oz: bottle.estimated_capacity,
                    requested_oz,
                });
            }
        }
        if self.hardware.weight.current_weight() < self.settings.min_cup_weight {
            return Err(DispenseFault::CupNotFound);
        }
        Ok(())
    }

    /// Sirve una botella hasta llegar al peso objetivo. Devuelve las onzas servidas.
    /// El orden de los chequeos en cada vuelta es: cancelacion, tiempo, vaso retirado.
    pub fn pour(
        &mut self,
        bottle_id: usize,
        requested_oz: f64,
        poured_so_far_oz: f64,
        total_requested_oz: f64,
    ) -> Result<f64, PourInterrupted> {
        let settings = self.settings;
        let hardware = &mut *self.hardware;

        let start_weight = hardware.weight.current_weight();
        let goal_weight = start_weight + requested_oz * settings.scale_oz_factor;
        let removal_weight = start_weight - settings.cup_removal_threshold;
        let started_at = hardware.clock.now_ms();
        debug!(
            "[DISPENSER] Bottle {}: start {:.2}, goal {:.2}",
            bottle_id, start_weight, goal_weight
        );

        let _motor = MotorGuard::engage(&mut *hardware.motors, bottle_id);
        let mut current_weight = start_weight;
        let mut dispensed_oz = 0.0;

        while current_weight < goal_weight {
            self.status.service();

            if self.input.poll_cancel() || self.status.poll_cancel() {
                info!("[DISPENSER] Cancelled at bottle {}", bottle_id);
                return Err(PourInterrupted::Cancelled { dispensed_oz });
            }

            current_weight = hardware.weight.current_weight();
            let cup_removed = current_weight < removal_weight;
            if !cup_removed {
                dispensed_oz = settings.to_oz(current_weight - start_weight).max(0.0);
            }

            if total_requested_oz > 0.0 {
                let percentage = (poured_so_far_oz + dispensed_oz) / total_requested_oz * 100.0;
                hardware.progress.set_percentage(percentage.clamp(0.0, 100.0));
            }

            let elapsed_ms = hardware.clock.now_ms().saturating_sub(started_at);
            if elapsed_ms > settings.motor_timeout_ms {
                return Err(PourInterrupted::Timeout {
                    motor_id: bottle_id,
                    elapsed_ms,
                    measured_oz: dispensed_oz,
                });
            }

            if cup_removed {
                warn!(
                    "[DISPENSER] Cup removed at bottle {} ({:.2} < {:.2})",
                    bottle_id, current_weight, removal_weight
                );
                return Err(PourInterrupted::CupRemoved { dispensed_oz });
            }

            if current_weight < goal_weight {
                hardware.clock.sleep_ms(settings.poll_interval_ms);
            }
        }

        Ok(settings.to_oz(current_weight - start_weight))
    }
}
