//! Persistencia del inventario: un mapa clave -> JSON de cada entrada.
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};

use log::{debug, info};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    beverage::Beverage,
    bottle::Bottle,
    constants::{BEV_COUNT, MOTOR_COUNT},
    errors::{MachineError, StoreError},
    inventory::Inventory,
};

const BOTTLE_KIND: &str = "bottle";
const BEVERAGE_KIND: &str = "beverage";

fn entry_key(kind: &str, id: usize) -> String {
    format!("{}_{}", kind, id)
}

pub fn bottle_key(id: usize) -> String {
    entry_key(BOTTLE_KIND, id)
}

pub fn beverage_key(id: usize) -> String {
    entry_key(BEVERAGE_KIND, id)
}

/// Mapa persistente clave/valor
pub trait InventoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

fn get_entry<T: DeserializeOwned>(
    store: &dyn InventoryStore,
    kind: &'static str,
    id: usize,
) -> Result<T, StoreError> {
    let key = entry_key(kind, id);
    let raw = store
        .get(&key)?
        .ok_or(StoreError::InventoryEntryMissing { kind, id })?;
    Ok(serde_json::from_str(&raw)?)
}

fn put_entry<T: Serialize>(store: &mut dyn InventoryStore, key: &str, entry: &T) -> Result<(), StoreError> {
    store.put(key, serde_json::to_string(entry)?)
}

pub fn put_bottle(store: &mut dyn InventoryStore, bottle: &Bottle) -> Result<(), StoreError> {
    debug!("[INVENTORY] Writing bottle {}", bottle.id);
    put_entry(store, &bottle_key(bottle.id), bottle)
}

pub fn put_beverage(store: &mut dyn InventoryStore, beverage: &Beverage) -> Result<(), StoreError> {
    debug!("[INVENTORY] Writing beverage {}", beverage.id);
    put_entry(store, &beverage_key(beverage.id), beverage)
}

/// Carga todas las botellas y bebidas. Falta una entrada => falla el arranque.
pub fn load_inventory(store: &dyn InventoryStore) -> Result<Inventory, MachineError> {
    let bottles = (0..MOTOR_COUNT)
        .map(|id| get_entry::<Bottle>(store, BOTTLE_KIND, id))
        .collect::<Result<Vec<_>, _>>()?;
    let beverages = (0..BEV_COUNT)
        .map(|id| get_entry::<Beverage>(store, BEVERAGE_KIND, id))
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        "[INVENTORY] Loaded {} bottles and {} beverages",
        bottles.len(),
        beverages.len()
    );
    Inventory::new(bottles, beverages)
}

/// Escribe todo el inventario, usado al migrar desde el archivo de importacion
pub fn write_all(store: &mut dyn InventoryStore, bottles: &[Bottle], beverages: &[Beverage]) -> Result<(), StoreError> {
    for bottle in bottles {
        put_bottle(store, bottle)?;
    }
    for beverage in beverages {
        put_beverage(store, beverage)?;
    }
    info!(
        "[INVENTORY] Wrote {} bottles and {} beverages",
        bottles.len(),
        beverages.len()
    );
    Ok(())
}

/// Escribe las botellas modificadas desde la ultima vez
pub fn flush_dirty(store: &mut dyn InventoryStore, inventory: &mut Inventory) -> Result<(), MachineError> {
    for id in inventory.take_dirty_bottles() {
        put_bottle(store, inventory.bottle(id)?)?;
    }
    Ok(())
}

/// Archivo JSON con un objeto clave -> entrada serializada. Se reescribe entero en cada `put`.
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<JsonFileStore, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            serde_json::from_reader(reader)?
        } else {
            info!("[INVENTORY] {} does not exist yet, starting empty", path.display());
            BTreeMap::new()
        };
        Ok(JsonFileStore { path, entries })
    }
}

impl InventoryStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        fs::write(&self.path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }
}
