//! Modelo en memoria de botellas y bebidas. Es el unico dueño del inventario:
//! toda mutacion pasa por aca y marca la entrada para escribirla de nuevo.
use std::collections::BTreeSet;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    beverage::Beverage,
    bottle::{Bottle, CapacityEdit},
    constants::{BEV_COUNT, MOTOR_COUNT},
    errors::MachineError,
};

/// Estado de una botella tal como se publica y se recibe por el canal de estado
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BottleStatus {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    pub oz_capacity: f64,
    pub oz_remaining: f64,
    pub status: bool,
    pub cost_per_oz: f64,
}

impl From<&Bottle> for BottleStatus {
    fn from(bottle: &Bottle) -> Self {
        BottleStatus {
            id: bottle.id as i64,
            name: bottle.name.clone(),
            oz_capacity: bottle.total_capacity,
            oz_remaining: bottle.estimated_capacity,
            status: bottle.active,
            cost_per_oz: bottle.cost_per_oz,
        }
    }
}

pub struct Inventory {
    bottles: Vec<Bottle>,
    beverages: Vec<Beverage>,
    dirty_bottles: BTreeSet<usize>,
}

impl Inventory {
    /// Verifica que el id de cada entrada coincida con su posicion
    pub fn new(bottles: Vec<Bottle>, beverages: Vec<Beverage>) -> Result<Inventory, MachineError> {
        if bottles.len() != MOTOR_COUNT {
            return Err(MachineError::InvalidInventory(format!(
                "expected {} bottles, found {}",
                MOTOR_COUNT,
                bottles.len()
            )));
        }
        if beverages.len() != BEV_COUNT {
            return Err(MachineError::InvalidInventory(format!(
                "expected {} beverages, found {}",
                BEV_COUNT,
                beverages.len()
            )));
        }
        if let Some((position, bottle)) = bottles.iter().enumerate().find(|(i, b)| b.id != *i) {
            return Err(MachineError::InvalidInventory(format!(
                "bottle at position {} has id {}",
                position, bottle.id
            )));
        }
        if let Some((position, beverage)) = beverages.iter().enumerate().find(|(i, b)| b.id != *i) {
            return Err(MachineError::InvalidInventory(format!(
                "beverage at position {} has id {}",
                position, beverage.id
            )));
        }
        Ok(Inventory {
            bottles,
            beverages,
            dirty_bottles: BTreeSet::new(),
        })
    }

    pub fn bottles(&self) -> &[Bottle] {
        &self.bottles
    }

    pub fn beverages(&self) -> &[Beverage] {
        &self.beverages
    }

    pub fn bottle(&self, id: usize) -> Result<&Bottle, MachineError> {
        self.bottles.get(id).ok_or(MachineError::IdOutOfRange {
            kind: "bottle",
            id: id as i64,
            max: MOTOR_COUNT,
        })
    }

    pub fn beverage(&self, id: usize) -> Result<&Beverage, MachineError> {
        self.beverages.get(id).ok_or(MachineError::IdOutOfRange {
            kind: "beverage",
            id: id as i64,
            max: BEV_COUNT,
        })
    }

    fn bottle_mut(&mut self, id: usize) -> Result<&mut Bottle, MachineError> {
        let bottle = self.bottles.get_mut(id).ok_or(MachineError::IdOutOfRange {
            kind: "bottle",
            id: id as i64,
            max: MOTOR_COUNT,
        })?;
        self.dirty_bottles.insert(id);
        Ok(bottle)
    }

    /// Devuelve el nuevo estado de la botella
    pub fn toggle_bottle(&mut self, id: usize) -> Result<bool, MachineError> {
        let bottle = self.bottle_mut(id)?;
        bottle.active = !bottle.active;
        info!(
            "[INVENTORY] Bottle {} ({}) is now {}",
            id,
            bottle.name,
            if bottle.active { "enabled" } else { "disabled" }
        );
        Ok(bottle.active)
    }

    pub fn edit_capacity(&mut self, id: usize, edit: &CapacityEdit) -> Result<(), MachineError> {
        check_amount("estimated capacity", edit.estimated_capacity)?;
        check_amount("total capacity", edit.total_capacity)?;
        check_amount("cost per oz", edit.cost_per_oz)?;
        let bottle = self.bottle_mut(id)?;
        edit.apply_to(bottle);
        info!(
            "[INVENTORY] Bottle {} edited: remaining={} total={} cost/oz={}",
            id, bottle.estimated_capacity, bottle.total_capacity, bottle.cost_per_oz
        );
        Ok(())
    }

    /// Descuenta lo servido de una botella
    pub fn consume(&mut self, id: usize, dispensed_oz: f64) -> Result<(), MachineError> {
        let bottle = self.bottle_mut(id)?;
        bottle.consume(dispensed_oz);
        debug!(
            "[INVENTORY] Bottle {} used {:.2} oz, {:.2} oz left",
            id, dispensed_oz, bottle.estimated_capacity
        );
        Ok(())
    }

    /// Aplica una actualizacion llegada por el canal de estado
    pub fn apply_status_update(&mut self, update: &BottleStatus) -> Result<(), MachineError> {
        if update.id < 0 || update.id >= MOTOR_COUNT as i64 {
            return Err(MachineError::IdOutOfRange {
                kind: "bottle",
                id: update.id,
                max: MOTOR_COUNT,
            });
        }
        check_amount("ozRemaining", Some(update.oz_remaining))?;
        check_amount("ozCapacity", Some(update.oz_capacity))?;
        check_amount("costPerOz", Some(update.cost_per_oz))?;
        let bottle = self.bottle_mut(update.id as usize)?;
        bottle.name = update.name.clone();
        bottle.active = update.status;
        bottle.cost_per_oz = update.cost_per_oz;
        bottle.estimated_capacity = update.oz_remaining;
        bottle.total_capacity = update.oz_capacity;
        info!("[INVENTORY] Bottle {} overwritten by remote update", update.id);
        Ok(())
    }

    pub fn status(&self) -> Vec<BottleStatus> {
        self.bottles.iter().map(BottleStatus::from).collect()
    }

    /// Ids de las botellas modificadas desde la ultima escritura, vaciando la marca
    pub fn take_dirty_bottles(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.dirty_bottles).into_iter().collect()
    }

    pub fn has_dirty_bottles(&self) -> bool {
        !self.dirty_bottles.is_empty()
    }
}

fn check_amount(field: &'static str, value: Option<f64>) -> Result<(), MachineError> {
    match value {
        Some(value) if !value.is_finite() || value < 0.0 => {
            Err(MachineError::InvalidAmount { field, value })
        }
        _ => Ok(()),
    }
}
