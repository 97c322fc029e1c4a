use serde::{Deserialize, Serialize};

/// Una posicion de servido. El id es tambien el indice del motor que la sirve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bottle {
    pub id: usize,
    pub name: String,
    pub active: bool,
    pub is_shot: bool,
    pub cost_per_oz: f64,
    pub estimated_capacity: f64,
    pub total_capacity: f64,
}

impl Bottle {
    pub fn new(id: usize, name: &str, estimated_capacity: f64, cost_per_oz: f64) -> Bottle {
        Bottle {
            id,
            name: name.to_string(),
            active: true,
            is_shot: false,
            cost_per_oz,
            estimated_capacity,
            total_capacity: estimated_capacity,
        }
    }

    /// Onzas que se pueden servir sin bajar del margen de seguridad
    pub fn pourable_oz(&self, safety_margin_oz: f64) -> f64 {
        self.estimated_capacity - safety_margin_oz
    }

    /// Descuenta lo servido. Nunca deja la capacidad estimada por debajo de cero.
    pub fn consume(&mut self, dispensed_oz: f64) {
        self.estimated_capacity = (self.estimated_capacity - dispensed_oz.max(0.0)).max(0.0);
    }
}

/// Entrada de una edicion de capacidad. `None` deja el campo como estaba.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapacityEdit {
    pub estimated_capacity: Option<f64>,
    pub total_capacity: Option<f64>,
    pub cost_per_oz: Option<f64>,
}

impl CapacityEdit {
    pub fn apply_to(&self, bottle: &mut Bottle) {
        if let Some(estimated) = self.estimated_capacity {
            bottle.estimated_capacity = estimated;
        }
        if let Some(total) = self.total_capacity {
            bottle.total_capacity = total;
        }
        if let Some(cost) = self.cost_per_oz {
            bottle.cost_per_oz = cost;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.estimated_capacity.is_none() && self.total_capacity.is_none() && self.cost_per_oz.is_none()
    }
}
