use serde::{Deserialize, Serialize};

use crate::constants::MOTOR_COUNT;

/// Una bebida que se puede pedir. `oz_arr[i]` son las onzas que se sirven de la botella `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beverage {
    pub id: usize,
    pub name: String,
    pub is_active: bool,
    pub oz_arr: [f64; MOTOR_COUNT],
    #[serde(default)]
    pub additional_instructions: String,
}

impl Beverage {
    pub fn new(id: usize, name: &str, oz_arr: [f64; MOTOR_COUNT]) -> Beverage {
        Beverage {
            id,
            name: name.to_string(),
            is_active: true,
            oz_arr,
            additional_instructions: String::new(),
        }
    }

    /// Botellas que usa la receta, en orden ascendente, con las onzas pedidas
    pub fn ingredients(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.oz_arr
            .iter()
            .enumerate()
            .filter(|(_, oz)| **oz > 0.0)
            .map(|(id, oz)| (id, *oz))
    }

    pub fn total_oz(&self) -> f64 {
        self.ingredients().map(|(_, oz)| oz).sum()
    }
}
