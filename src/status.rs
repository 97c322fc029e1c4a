//! Sincronizacion del estado del inventario con la nube.
//! Si no hay conectividad la maquina sigue funcionando sin publicar.
use std::collections::VecDeque;

use log::{debug, error, info, warn};

use crate::{
    config::MachineConfig,
    errors::TransportError,
    hardware::{InboundMessage, StatusChannel},
    input_queue::is_cancel,
    inventory::{BottleStatus, Inventory},
};

/// Mensaje entrante ya clasificado segun su topico
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    BottleUpdate(BottleStatus),
    Command(String),
}

pub struct StatusSync {
    channel: Box<dyn StatusChannel>,
    online: bool,
    status_topic: String,
    bottle_update_topic: String,
    command_topic: String,
    /// Actualizaciones recibidas mientras la maquina estaba ocupada
    held_updates: VecDeque<BottleStatus>,
}

impl StatusSync {
    pub fn new(channel: Box<dyn StatusChannel>, config: &MachineConfig) -> StatusSync {
        StatusSync {
            channel,
            online: false,
            status_topic: config.status_topic.clone(),
            bottle_update_topic: config.bottle_update_topic.clone(),
            command_topic: config.command_topic.clone(),
            held_updates: VecDeque::new(),
        }
    }

    pub fn connect(&mut self) {
        match self.channel.connect() {
            Ok(()) => {
                info!("[STATUS] Connected");
                self.online = true;
            }
            Err(err) => {
                warn!("[STATUS] {}, continuing without status sync", err);
                self.online = false;
            }
        }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn service(&mut self) {
        if self.online {
            self.channel.service();
        }
    }

    pub fn publish_inventory(&mut self, inventory: &Inventory) {
        if !self.online {
            debug!("[STATUS] Offline, skipping status publish");
            return;
        }
        let payload = match serde_json::to_string(&inventory.status()) {
            Ok(payload) => payload,
            Err(err) => {
                error!("[STATUS] Could not serialize status: {}", err);
                return;
            }
        };
        if let Err(err) = self.publish(&payload) {
            error!("[STATUS] {}", err);
        }
    }

    fn publish(&mut self, payload: &str) -> Result<(), TransportError> {
        self.channel.publish(&self.status_topic, payload)?;
        debug!("[STATUS] Published {} bytes on {}", payload.len(), self.status_topic);
        Ok(())
    }

    /// Mensajes recibidos desde la ultima llamada, empezando por las actualizaciones retenidas.
    /// Los que no se entienden se descartan.
    pub fn poll_inbound(&mut self) -> Vec<Inbound> {
        let mut inbound: Vec<Inbound> = self.held_updates.drain(..).map(Inbound::BottleUpdate).collect();
        if self.online {
            let messages = self.channel.poll_inbound();
            inbound.extend(messages.into_iter().filter_map(|message| self.classify(message)));
        }
        inbound
    }

    /// Igual que la entrada de la pantalla mientras la maquina esta ocupada: devuelve si llego un
    /// `cancel` y descarta los otros comandos. Las actualizaciones de botellas se retienen
    /// hasta el proximo `poll_inbound`.
    pub fn poll_cancel(&mut self) -> bool {
        if !self.online {
            return false;
        }
        let mut cancelled = false;
        for message in self.channel.poll_inbound() {
            match self.classify(message) {
                Some(Inbound::Command(line)) if is_cancel(&line) => cancelled = true,
                Some(Inbound::Command(line)) => {
                    debug!("[STATUS] Dropping command {:?} while busy", line)
                }
                Some(Inbound::BottleUpdate(update)) => self.held_updates.push_back(update),
                None => {}
            }
        }
        cancelled
    }

    fn classify(&self, message: InboundMessage) -> Option<Inbound> {
        if message.topic == self.bottle_update_topic {
            match serde_json::from_str::<BottleStatus>(&message.payload) {
                Ok(update) => Some(Inbound::BottleUpdate(update)),
                Err(err) => {
                    warn!("[STATUS] Malformed bottle update: {}", err);
                    None
                }
            }
        } else if message.topic == self.command_topic {
            Some(Inbound::Command(message.payload))
        } else {
            warn!("[STATUS] Dropping message on unknown topic {}", message.topic);
            None
        }
    }
}
