//! Dobles de prueba del hardware y del almacenamiento
use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, VecDeque},
    rc::Rc,
    sync::{Arc, Mutex},
};

use crate::{
    beverage::Beverage,
    bottle::Bottle,
    config::MachineConfig,
    constants::{BEV_COUNT, MOTOR_COUNT},
    dispenser::{DispenseSettings, Dispenser},
    errors::{StoreError, TransportError},
    hardware::{
        ActuatorBank, Clock, Display, Hardware, InboundMessage, ProgressSink, StatusChannel,
        WeightSource,
    },
    input_queue::{InputChannel, InputQueue},
    inventory::Inventory,
    inventory_store::InventoryStore,
    status::StatusSync,
};

pub fn test_config() -> MachineConfig {
    MachineConfig {
        scale_oz_factor: 10.0,
        safety_margin_oz: 2.0,
        min_cup_weight: 5.0,
        cup_removal_threshold: 15.0,
        motor_timeout_ms: 200,
        calibration_wait_ms: 50,
        poll_interval_ms: 10,
        countdown_secs: 1,
        calibrate_on_boot: false,
        ..MachineConfig::default()
    }
}

/// Ocho botellas de 10 oz a 1.0 por onza. La bebida 0 es 2 oz de la botella 0 y 1 oz de la 2.
pub fn sample_inventory() -> Inventory {
    let bottles = (0..MOTOR_COUNT)
        .map(|id| Bottle::new(id, &format!("Bottle {}", id), 10.0, 1.0))
        .collect();
    let beverages = (0..BEV_COUNT)
        .map(|id| {
            let mut oz_arr = [0.0; MOTOR_COUNT];
            if id == 0 {
                oz_arr[0] = 2.0;
                oz_arr[2] = 1.0;
            } else {
                oz_arr[id % MOTOR_COUNT] = 1.0;
            }
            let mut beverage = Beverage::new(id, &format!("Drink {}", id), oz_arr);
            if id == 0 {
                beverage.additional_instructions = "Add a lime.".to_string();
            }
            beverage
        })
        .collect();
    match Inventory::new(bottles, beverages) {
        Ok(inventory) => inventory,
        Err(err) => panic!("sample inventory is invalid: {}", err),
    }
}

struct ScaleState {
    readings: VecDeque<f64>,
    last: f64,
    reads: usize,
    tares: usize,
    cancel_after: Option<usize>,
    queue: Arc<Mutex<InputQueue>>,
}

/// Balanza que devuelve las lecturas en orden y repite la ultima cuando se terminan
#[derive(Clone)]
pub struct ScriptedScale {
    state: Rc<RefCell<ScaleState>>,
}

impl ScriptedScale {
    pub fn new(readings: &[f64], queue: Arc<Mutex<InputQueue>>) -> ScriptedScale {
        ScriptedScale {
            state: Rc::new(RefCell::new(ScaleState {
                readings: readings.iter().copied().collect(),
                last: 0.0,
                reads: 0,
                tares: 0,
                cancel_after: None,
                queue,
            })),
        }
    }

    /// Encola un `cancel` apenas se hace la lectura numero `reads`
    pub fn cancel_after_reads(&self, reads: usize) {
        self.state.borrow_mut().cancel_after = Some(reads);
    }

    pub fn tares(&self) -> usize {
        self.state.borrow().tares
    }
}

impl WeightSource for ScriptedScale {
    fn current_weight(&mut self) -> f64 {
        let mut state = self.state.borrow_mut();
        let weight = state.readings.pop_front().unwrap_or(state.last);
        state.last = weight;
        state.reads += 1;
        if state.cancel_after == Some(state.reads) {
            state.queue.lock().unwrap().push("!cancel@00".to_string());
        }
        weight
    }

    fn tare(&mut self) {
        self.state.borrow_mut().tares += 1;
    }
}

#[derive(Clone, Default)]
pub struct RecordingMotors {
    events: Rc<RefCell<Vec<(usize, bool)>>>,
}

impl RecordingMotors {
    pub fn events(&self) -> Vec<(usize, bool)> {
        self.events.borrow().clone()
    }
}

impl ActuatorBank for RecordingMotors {
    fn set_motor(&mut self, motor_id: usize, on: bool) {
        self.events.borrow_mut().push((motor_id, on));
    }
}

#[derive(Default)]
pub struct ProgressLog {
    pub percentages: Vec<f64>,
    pub successes: usize,
    pub faults: usize,
    pub clears: usize,
}

#[derive(Clone, Default)]
pub struct RecordingProgress {
    log: Rc<RefCell<ProgressLog>>,
}

impl RecordingProgress {
    pub fn percentages(&self) -> Vec<f64> {
        self.log.borrow().percentages.clone()
    }

    pub fn successes(&self) -> usize {
        self.log.borrow().successes
    }

    pub fn faults(&self) -> usize {
        self.log.borrow().faults
    }

    pub fn clears(&self) -> usize {
        self.log.borrow().clears
    }
}

impl ProgressSink for RecordingProgress {
    fn set_percentage(&mut self, percentage: f64) {
        self.log.borrow_mut().percentages.push(percentage);
    }

    fn clear(&mut self) {
        self.log.borrow_mut().clears += 1;
    }

    fn signal_success(&mut self) {
        self.log.borrow_mut().successes += 1;
    }

    fn signal_fault(&mut self) {
        self.log.borrow_mut().faults += 1;
    }
}

#[derive(Default)]
struct Screen {
    pages: Vec<u8>,
    texts: Vec<(String, String)>,
}

#[derive(Clone, Default)]
pub struct RecordingDisplay {
    screen: Rc<RefCell<Screen>>,
}

impl RecordingDisplay {
    pub fn pages(&self) -> Vec<u8> {
        self.screen.borrow().pages.clone()
    }

    /// Textos enviados a un item, en orden
    pub fn texts_for(&self, item: &str) -> Vec<String> {
        self.screen
            .borrow()
            .texts
            .iter()
            .filter(|(target, _)| target == item)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

impl Display for RecordingDisplay {
    fn show_page(&mut self, page: u8) {
        self.screen.borrow_mut().pages.push(page);
    }

    fn set_text(&mut self, item: &str, text: &str) {
        self.screen
            .borrow_mut()
            .texts
            .push((item.to_string(), text.to_string()));
    }
}

/// Reloj que solo avanza cuando se duerme, o en cada lectura si se le indica un paso
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
    step: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn step_on_read(&self, step: u64) {
        self.step.set(step);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step.get());
        now
    }

    fn sleep_ms(&mut self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

#[derive(Default)]
struct Broker {
    published: Vec<(String, String)>,
    inbound: VecDeque<InboundMessage>,
    fail_connect: bool,
    serviced: usize,
}

#[derive(Clone, Default)]
pub struct RecordingStatus {
    broker: Rc<RefCell<Broker>>,
}

impl RecordingStatus {
    pub fn new() -> RecordingStatus {
        RecordingStatus::default()
    }

    pub fn failing() -> RecordingStatus {
        let status = RecordingStatus::default();
        status.broker.borrow_mut().fail_connect = true;
        status
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.broker.borrow().published.clone()
    }

    pub fn serviced(&self) -> usize {
        self.broker.borrow().serviced
    }

    pub fn deliver(&self, topic: &str, payload: &str) {
        self.broker.borrow_mut().inbound.push_back(InboundMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
        });
    }
}

impl StatusChannel for RecordingStatus {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.broker.borrow().fail_connect {
            return Err(TransportError::MqttInitFailed);
        }
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), TransportError> {
        self.broker
            .borrow_mut()
            .published
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }

    fn service(&mut self) {
        self.broker.borrow_mut().serviced += 1;
    }

    fn poll_inbound(&mut self) -> Vec<InboundMessage> {
        self.broker.borrow_mut().inbound.drain(..).collect()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }
}

impl InventoryStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }
}

/// Hardware de prueba con manijas para inspeccionarlo despues
pub struct Rig {
    pub settings: DispenseSettings,
    pub scale: ScriptedScale,
    pub motors: RecordingMotors,
    pub progress: RecordingProgress,
    pub display: RecordingDisplay,
    pub clock: ManualClock,
    pub status_channel: RecordingStatus,
    pub queue: Arc<Mutex<InputQueue>>,
    hardware: Hardware,
    status: StatusSync,
    input: InputChannel,
}

impl Rig {
    pub fn new(readings: &[f64]) -> Rig {
        let config = test_config();
        let queue = Arc::new(Mutex::new(InputQueue::new()));
        let scale = ScriptedScale::new(readings, queue.clone());
        let motors = RecordingMotors::default();
        let progress = RecordingProgress::default();
        let display = RecordingDisplay::default();
        let clock = ManualClock::default();
        let status_channel = RecordingStatus::new();
        let mut status = StatusSync::new(Box::new(status_channel.clone()), &config);
        status.connect();
        Rig {
            settings: DispenseSettings::from(&config),
            hardware: rig_hardware(&scale, &motors, &progress, &display, &clock),
            scale,
            motors,
            progress,
            display,
            clock,
            status_channel,
            input: InputChannel::new(queue.clone()),
            queue,
            status,
        }
    }

    pub fn dispenser(&mut self) -> Dispenser<'_> {
        Dispenser::new(&mut self.hardware, &mut self.status, &self.input, &self.settings)
    }

    pub fn push_input(&self, line: &str) {
        self.queue.lock().unwrap().push(line.to_string());
    }

    pub fn cancel_after_reads(&self, reads: usize) {
        self.scale.cancel_after_reads(reads);
    }

    /// Arma un `Hardware` nuevo que comparte estado con las manijas del rig
    pub fn hardware(&self) -> Hardware {
        rig_hardware(&self.scale, &self.motors, &self.progress, &self.display, &self.clock)
    }

    pub fn input_channel(&self) -> InputChannel {
        InputChannel::new(self.queue.clone())
    }
}

fn rig_hardware(
    scale: &ScriptedScale,
    motors: &RecordingMotors,
    progress: &RecordingProgress,
    display: &RecordingDisplay,
    clock: &ManualClock,
) -> Hardware {
    Hardware {
        weight: Box::new(scale.clone()),
        motors: Box::new(motors.clone()),
        progress: Box::new(progress.clone()),
        display: Box::new(display.clone()),
        clock: Box::new(clock.clone()),
    }
}
