//! Controlador de la maquina. Es el unico dueño del inventario y del hardware:
//! recibe las entradas, las despacha y sincroniza el inventario despues de cada cambio.
use log::{error, info, warn};

use crate::{
    bottle::CapacityEdit,
    bulk_import::read_import_file,
    command_parser::{parse_line, ParsedLine},
    config::MachineConfig,
    constants::{MESSAGE_ITEM, PAGE_BEVERAGE_MENU, PAGE_CAPACITY_EDIT, PAGE_DISPENSE, PAGE_HOME},
    dispatcher::{dispatch, Action},
    dispenser::{DispenseReceipt, DispenseSettings, Dispenser},
    errors::MachineError,
    faults::DispenseFault,
    hardware::{Hardware, StatusChannel},
    input_queue::InputChannel,
    inventory::{BottleStatus, Inventory},
    inventory_store::{bottle_key, flush_dirty, load_inventory, write_all, InventoryStore},
    status::{Inbound, StatusSync},
};

/// Item de la pantalla donde se muestra la cuenta regresiva
const COUNTDOWN_ITEM: &str = "t4";
const MS_PER_SECOND: u64 = 1000;

pub type DispenseOutcome = Result<DispenseReceipt, DispenseFault>;

pub struct Machine {
    config: MachineConfig,
    settings: DispenseSettings,
    hardware: Hardware,
    status: StatusSync,
    input: InputChannel,
    store: Box<dyn InventoryStore>,
    inventory: Inventory,
    calibrated: bool,
    edit_session: Option<usize>,
    current_page: u8,
}

impl Machine {
    /// Arranca la maquina. Si no se puede cargar el inventario se muestra el error en pantalla y no arranca.
    pub fn boot(
        config: MachineConfig,
        mut hardware: Hardware,
        status_channel: Box<dyn StatusChannel>,
        input: InputChannel,
        mut store: Box<dyn InventoryStore>,
    ) -> Result<Machine, MachineError> {
        let mut status = StatusSync::new(status_channel, &config);
        if config.status_enabled {
            status.connect();
        } else {
            info!("[MACHINE] Status sync disabled");
        }

        let inventory = match prepare_inventory(&config, store.as_mut()) {
            Ok(inventory) => inventory,
            Err(err) => {
                error!("[MACHINE] Boot failed: {}", err);
                hardware
                    .display
                    .set_text(MESSAGE_ITEM, &format!("BOOT FAILED: {}", err));
                return Err(err);
            }
        };

        info!(
            "[MACHINE] authCocktail: {} authShots: {}",
            config.auth_cocktail, config.auth_shots
        );
        for bottle in inventory.bottles() {
            info!(
                "[MACHINE] Bottle {} {:?} active={} shot={} cost/oz={} remaining={}/{}",
                bottle.id,
                bottle.name,
                bottle.active,
                bottle.is_shot,
                bottle.cost_per_oz,
                bottle.estimated_capacity,
                bottle.total_capacity
            );
        }

        let mut machine = Machine {
            settings: DispenseSettings::from(&config),
            config,
            hardware,
            status,
            input,
            store,
            inventory,
            calibrated: false,
            edit_session: None,
            current_page: 0,
        };
        machine.status.publish_inventory(&machine.inventory);
        if machine.config.calibrate_on_boot {
            machine.calibrate();
        }
        machine.go_page(PAGE_HOME);
        info!("[MACHINE] Boot successful");
        Ok(machine)
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn edit_session(&self) -> Option<usize> {
        self.edit_session
    }

    pub fn current_page(&self) -> u8 {
        self.current_page
    }

    /// Procesa entradas hasta que no haya ni vaya a haber mas
    pub fn run(&mut self) -> Result<(), MachineError> {
        loop {
            self.tick()?;
            if self.input.is_exhausted()? {
                info!("[MACHINE] Input finished, stopping");
                return Ok(());
            }
            self.hardware.clock.sleep_ms(self.settings.poll_interval_ms);
        }
    }

    /// Un ciclo del loop de control
    pub fn tick(&mut self) -> Result<(), MachineError> {
        self.status.service();
        for inbound in self.status.poll_inbound() {
            match inbound {
                Inbound::BottleUpdate(update) => {
                    if let Err(err) = self.apply_remote_update(&update) {
                        error!("[MACHINE] Rejected bottle update: {}", err);
                    }
                }
                Inbound::Command(line) => self.handle_line(&line),
            }
        }
        while let Some(line) = self.input.poll_line()? {
            self.handle_line(&line);
        }
        Ok(())
    }

    /// Las fallas de un comando se registran y la maquina sigue
    pub fn handle_line(&mut self, line: &str) {
        if let Err(err) = self.try_handle_line(line) {
            error!("[MACHINE] {}", err);
        }
    }

    fn try_handle_line(&mut self, line: &str) -> Result<(), MachineError> {
        match parse_line(line, self.edit_session) {
            ParsedLine::CapacityEdit { bottle_id, edit } => self.edit_capacity(bottle_id, &edit),
            ParsedLine::Commands(commands) => {
                let action = dispatch(&commands)?;
                self.execute(action)
            }
            ParsedLine::LongForm(commands) => {
                if let Some(main) = commands.first() {
                    info!(
                        "[MACHINE] Long form command {} with {} fields, not acted upon",
                        main.cmd,
                        commands.len() - 1
                    );
                }
                Ok(())
            }
        }
    }

    fn execute(&mut self, action: Action) -> Result<(), MachineError> {
        match action {
            Action::Nothing | Action::Ignored => {}
            Action::GoPage(page) => self.go_page(page),
            Action::Pour(beverage_id) => {
                self.pour_beverage(beverage_id)?;
            }
            Action::ToggleBottle(bottle_id) => {
                self.inventory.toggle_bottle(bottle_id)?;
                self.sync_inventory()?;
            }
            Action::BeginCapacityEdit(bottle_id) => {
                self.inventory.bottle(bottle_id)?;
                info!("[MACHINE] Editing capacity of bottle {}", bottle_id);
                self.edit_session = Some(bottle_id);
            }
            Action::Finish(page) => {
                if page == PAGE_CAPACITY_EDIT {
                    self.edit_session = None;
                }
            }
            Action::PublishStatus => self.status.publish_inventory(&self.inventory),
            Action::Calibrate => {
                self.calibrate();
            }
        }
        Ok(())
    }

    fn go_page(&mut self, page: u8) {
        self.hardware.display.show_page(page);
        self.current_page = page;
    }

    fn show_message(&mut self, text: &str) {
        self.hardware.display.set_text(MESSAGE_ITEM, text);
    }

    fn edit_capacity(&mut self, bottle_id: usize, edit: &CapacityEdit) -> Result<(), MachineError> {
        if edit.is_empty() {
            info!("[MACHINE] Capacity edit for bottle {} changes nothing", bottle_id);
            return Ok(());
        }
        self.inventory.edit_capacity(bottle_id, edit)?;
        self.sync_inventory()
    }

    fn apply_remote_update(&mut self, update: &BottleStatus) -> Result<(), MachineError> {
        self.inventory.apply_status_update(update)?;
        self.sync_inventory()
    }

    /// Escribe las botellas tocadas y publica el estado, aun si la escritura falla
    fn sync_inventory(&mut self) -> Result<(), MachineError> {
        let flushed = flush_dirty(self.store.as_mut(), &mut self.inventory);
        self.status.publish_inventory(&self.inventory);
        flushed
    }

    /// Sirve una bebida y vuelve al menu. Las fallas de servido no son errores de la maquina.
    pub fn pour_beverage(&mut self, beverage_id: usize) -> Result<DispenseOutcome, MachineError> {
        let beverage = self.inventory.beverage(beverage_id)?.clone();
        self.go_page(PAGE_DISPENSE);
        self.show_message(&format!("Pouring {}...", beverage.name));

        let outcome = Dispenser::new(
            &mut self.hardware,
            &mut self.status,
            &self.input,
            &self.settings,
        )
        .create_beverage(&mut self.inventory, &beverage, self.calibrated);

        match &outcome {
            Ok(receipt) => {
                let mut message = format!("{} is ready! (${:.2})", beverage.name, receipt.total_cost);
                if !beverage.additional_instructions.is_empty() {
                    message.push(' ');
                    message.push_str(&beverage.additional_instructions);
                }
                self.show_message(&message);
                self.hardware.progress.signal_success();
            }
            Err(fault) => {
                if fault.is_validation() {
                    info!("[MACHINE] {} rejected: {}", beverage.name, fault);
                } else {
                    warn!("[MACHINE] {} interrupted: {}", beverage.name, fault);
                }
                self.show_message(&fault.to_string());
                self.hardware.progress.signal_fault();
            }
        }

        let synced = if self.inventory.has_dirty_bottles() {
            self.sync_inventory()
        } else {
            Ok(())
        };
        self.countdown(self.config.countdown_secs);
        self.hardware.progress.clear();
        self.go_page(PAGE_BEVERAGE_MENU);
        synced.map(|_| outcome)
    }

    /// Tara la balanza despues de darle tiempo al usuario de soltar todo. Se puede cancelar.
    pub fn calibrate(&mut self) -> bool {
        info!("[CALIBRATION] Starting");
        self.show_message("Calibrating, do not touch the machine.");
        if self.wait_cancellable(self.config.calibration_wait_ms) {
            info!("[CALIBRATION] Cancelled");
            self.show_message("Calibration cancelled.");
            return false;
        }
        self.hardware.weight.tare();
        self.calibrated = true;
        info!("[CALIBRATION] Scale tared");
        self.show_message("Calibration complete.");
        true
    }

    fn countdown(&mut self, secs: u64) {
        for remaining in (1..=secs).rev() {
            self.hardware
                .display
                .set_text(COUNTDOWN_ITEM, &format!("Returning to menu in {}", remaining));
            if self.wait_cancellable(MS_PER_SECOND) {
                info!("[MACHINE] Countdown skipped");
                break;
            }
        }
        self.hardware.display.set_text(COUNTDOWN_ITEM, "");
    }

    /// Espera manteniendo viva la conexion. Devuelve `true` si llego un `cancel`.
    fn wait_cancellable(&mut self, ms: u64) -> bool {
        let until = self.hardware.clock.now_ms() + ms;
        while self.hardware.clock.now_ms() < until {
            self.status.service();
            if self.input.poll_cancel() || self.status.poll_cancel() {
                return true;
            }
            self.hardware.clock.sleep_ms(self.settings.poll_interval_ms);
        }
        false
    }
}

/// La importacion masiva solo carga un almacenamiento vacio, para no pisar lo consumido
fn prepare_inventory(config: &MachineConfig, store: &mut dyn InventoryStore) -> Result<Inventory, MachineError> {
    if let Some(path) = &config.import_path {
        if store.get(&bottle_key(0))?.is_some() {
            info!("[MACHINE] Inventory already stored, skipping import of {}", path);
        } else {
            let (bottles, beverages) = read_import_file(path)?;
            write_all(store, &bottles, &beverages)?;
        }
    }
    load_inventory(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bottle::Bottle,
        constants::{MESSAGE_ITEM, PAGE_HOME},
        errors::StoreError,
        testing::{sample_inventory, test_config, MemoryStore, Rig},
    };

    const CUBA_LIBRE_FEED: [f64; 6] = [50.0, 50.0, 60.0, 70.0, 70.0, 80.0];

    fn seeded_store() -> MemoryStore {
        let inventory = sample_inventory();
        let mut store = MemoryStore::new();
        write_all(&mut store, inventory.bottles(), inventory.beverages()).unwrap();
        store
    }

    fn boot_with(rig: &Rig, config: MachineConfig, store: &MemoryStore) -> Result<Machine, MachineError> {
        Machine::boot(
            config,
            rig.hardware(),
            Box::new(rig.status_channel.clone()),
            rig.input_channel(),
            Box::new(store.clone()),
        )
    }

    fn calibrated_config() -> MachineConfig {
        MachineConfig {
            calibrate_on_boot: true,
            ..test_config()
        }
    }

    fn stored_bottle(store: &MemoryStore, id: usize) -> Bottle {
        let raw = store.get(&bottle_key(id)).unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn should_refuse_to_boot_when_an_entry_is_missing() {
        let rig = Rig::new(&[]);
        let result = boot_with(&rig, test_config(), &MemoryStore::new());

        assert!(matches!(
            result,
            Err(MachineError::Store(StoreError::InventoryEntryMissing {
                kind: "bottle",
                id: 0
            }))
        ));
        let messages = rig.display.texts_for(MESSAGE_ITEM);
        assert!(messages[0].starts_with("BOOT FAILED"));
    }

    #[test]
    fn should_boot_publish_and_go_home() {
        let rig = Rig::new(&[]);
        let machine = boot_with(&rig, test_config(), &seeded_store()).unwrap();

        assert_eq!(1, rig.status_channel.published().len());
        assert_eq!(vec![PAGE_HOME], rig.display.pages());
        assert_eq!(PAGE_HOME, machine.current_page());
        assert_eq!(false, machine.is_calibrated());
    }

    #[test]
    fn should_calibrate_on_boot_when_configured() {
        let rig = Rig::new(&[]);
        let machine = boot_with(&rig, calibrated_config(), &seeded_store()).unwrap();
        assert_eq!(true, machine.is_calibrated());
        assert_eq!(1, rig.scale.tares());
    }

    #[test]
    fn should_abort_calibration_on_cancel() {
        let rig = Rig::new(&[]);
        let mut machine = boot_with(&rig, test_config(), &seeded_store()).unwrap();

        rig.push_input("!cancel@00");
        machine.handle_line("!cba@00");

        assert_eq!(false, machine.is_calibrated());
        assert_eq!(0, rig.scale.tares());
    }

    #[test]
    fn should_pour_persist_and_publish_a_full_beverage() {
        let rig = Rig::new(&CUBA_LIBRE_FEED);
        let store = seeded_store();
        let mut machine = boot_with(&rig, calibrated_config(), &store).unwrap();

        rig.push_input("!bev@00");
        machine.tick().unwrap();

        assert_eq!(8.0, machine.inventory().bottle(0).unwrap().estimated_capacity);
        assert_eq!(9.0, machine.inventory().bottle(2).unwrap().estimated_capacity);
        assert_eq!(8.0, stored_bottle(&store, 0).estimated_capacity);
        assert_eq!(9.0, stored_bottle(&store, 2).estimated_capacity);
        assert_eq!(2, rig.status_channel.published().len());
        assert_eq!(1, rig.progress.successes());
        assert_eq!(1, rig.progress.clears());
        assert_eq!(Some(&PAGE_BEVERAGE_MENU), rig.display.pages().last());
        assert!(rig
            .display
            .texts_for(MESSAGE_ITEM)
            .contains(&"Drink 0 is ready! ($3.00) Add a lime.".to_string()));
    }

    #[test]
    fn should_persist_a_partial_pour_when_the_cup_is_removed() {
        let rig = Rig::new(&[50.0, 50.0, 60.0, 0.0]);
        let store = seeded_store();
        let mut machine = boot_with(&rig, calibrated_config(), &store).unwrap();

        let outcome = machine.pour_beverage(0).unwrap();

        assert_eq!(
            Err(DispenseFault::CupRemoved {
                dispensed_oz: 1.0,
                price_dispensed: 1.0
            }),
            outcome
        );
        assert_eq!(9.0, stored_bottle(&store, 0).estimated_capacity);
        assert_eq!(10.0, stored_bottle(&store, 2).estimated_capacity);
        assert_eq!(1, rig.progress.faults());
        assert_eq!(Some(&PAGE_BEVERAGE_MENU), rig.display.pages().last());
    }

    #[test]
    fn should_not_pour_before_calibration() {
        let rig = Rig::new(&CUBA_LIBRE_FEED);
        let mut machine = boot_with(&rig, test_config(), &seeded_store()).unwrap();

        let outcome = machine.pour_beverage(0).unwrap();

        assert_eq!(Err(DispenseFault::MachineNotCalibrated), outcome);
        assert_eq!(true, rig.motors.events().is_empty());
        assert_eq!(1, rig.status_channel.published().len());
    }

    #[test]
    fn should_toggle_a_bottle_persist_and_publish() {
        let rig = Rig::new(&[]);
        let store = seeded_store();
        let mut machine = boot_with(&rig, test_config(), &store).unwrap();

        machine.handle_line("!ebs@03");

        assert_eq!(false, machine.inventory().bottle(3).unwrap().active);
        assert_eq!(false, stored_bottle(&store, 3).active);
        assert_eq!(2, rig.status_channel.published().len());
    }

    #[test]
    fn should_ignore_out_of_range_ids() {
        let rig = Rig::new(&[]);
        let mut machine = boot_with(&rig, test_config(), &seeded_store()).unwrap();

        machine.handle_line("!ebs@09");
        machine.handle_line("!bev@99");

        assert!(machine.inventory().bottles().iter().all(|bottle| bottle.active));
        assert_eq!(1, rig.status_channel.published().len());
    }

    #[test]
    fn should_edit_capacity_only_inside_an_edit_session() {
        let rig = Rig::new(&[]);
        let store = seeded_store();
        let mut machine = boot_with(&rig, test_config(), &store).unwrap();

        machine.handle_line("!edCap@&est=5&tot=-1&cpo=-1");
        assert_eq!(10.0, machine.inventory().bottle(1).unwrap().estimated_capacity);

        machine.handle_line("!ebc@01");
        assert_eq!(Some(1), machine.edit_session());
        machine.handle_line("!edCap@&est=5&tot=30&cpo=-1");

        let bottle = stored_bottle(&store, 1);
        assert_eq!(5.0, bottle.estimated_capacity);
        assert_eq!(30.0, bottle.total_capacity);
        assert_eq!(1.0, bottle.cost_per_oz);

        machine.handle_line("!finish@07");
        assert_eq!(Some(1), machine.edit_session());
        machine.handle_line("!finish@09");
        assert_eq!(None, machine.edit_session());
    }

    #[test]
    fn should_apply_cloud_updates_and_mirrored_commands() {
        let rig = Rig::new(&[]);
        let store = seeded_store();
        let config = test_config();
        rig.status_channel.deliver(
            &config.bottle_update_topic,
            r#"{"_id":2,"name":"Tequila","status":true,"costPerOz":2.5,"ozRemaining":20.0,"ozCapacity":25.0}"#,
        );
        rig.status_channel.deliver(&config.command_topic, "!ebs@04");
        let mut machine = boot_with(&rig, config, &store).unwrap();

        machine.tick().unwrap();

        assert_eq!("Tequila", stored_bottle(&store, 2).name);
        assert_eq!(2.5, machine.inventory().bottle(2).unwrap().cost_per_oz);
        assert_eq!(false, stored_bottle(&store, 4).active);
        assert_eq!(3, rig.status_channel.published().len());
    }

    #[test]
    fn should_cancel_a_pour_from_the_command_topic() {
        let rig = Rig::new(&CUBA_LIBRE_FEED);
        let store = seeded_store();
        let config = calibrated_config();
        let command_topic = config.command_topic.clone();
        let update_topic = config.bottle_update_topic.clone();
        let mut machine = boot_with(&rig, config, &store).unwrap();
        rig.status_channel.deliver(
            &update_topic,
            r#"{"_id":5,"name":"Vodka","status":true,"costPerOz":2.0,"ozRemaining":6.0,"ozCapacity":25.0}"#,
        );
        rig.status_channel.deliver(&command_topic, "!cancel@00");

        let outcome = machine.pour_beverage(0).unwrap();

        assert_eq!(
            Err(DispenseFault::BeverageCancelled {
                dispensed_oz: 0.0,
                price_dispensed: 0.0
            }),
            outcome
        );
        assert_eq!(vec![(0, true), (0, false)], rig.motors.events());
        assert_eq!(10.0, machine.inventory().bottle(5).unwrap().estimated_capacity);

        machine.tick().unwrap();
        assert_eq!("Vodka", stored_bottle(&store, 5).name);
        assert_eq!(6.0, machine.inventory().bottle(5).unwrap().estimated_capacity);
    }

    #[test]
    fn should_skip_the_countdown_on_cancel() {
        let rig = Rig::new(&CUBA_LIBRE_FEED);
        let config = MachineConfig {
            countdown_secs: 3,
            ..calibrated_config()
        };
        let mut machine = boot_with(&rig, config, &seeded_store()).unwrap();
        rig.cancel_after_reads(CUBA_LIBRE_FEED.len());

        let outcome = machine.pour_beverage(0).unwrap();

        assert!(outcome.is_ok());
        assert_eq!(
            vec!["Returning to menu in 3".to_string(), String::new()],
            rig.display.texts_for(COUNTDOWN_ITEM)
        );
        assert_eq!(Some(&PAGE_BEVERAGE_MENU), rig.display.pages().last());
    }

    #[test]
    fn should_leave_the_bottle_unchanged_on_an_invalid_capacity_edit() {
        let rig = Rig::new(&[]);
        let store = seeded_store();
        let mut machine = boot_with(&rig, test_config(), &store).unwrap();

        machine.handle_line("!ebc@01");
        machine.handle_line("!edCap@&est=NaN&tot=-1&cpo=-2.5");

        let bottle = stored_bottle(&store, 1);
        assert_eq!(10.0, bottle.estimated_capacity);
        assert_eq!(1.0, bottle.cost_per_oz);
        assert_eq!(1, rig.status_channel.published().len());
    }

    #[test]
    fn should_ignore_long_form_commands_even_without_fields() {
        let rig = Rig::new(&[]);
        let mut machine = boot_with(&rig, test_config(), &seeded_store()).unwrap();

        machine.handle_line("%cba@");
        machine.handle_line("%ebs@id=03");

        assert_eq!(false, machine.is_calibrated());
        assert_eq!(0, rig.scale.tares());
        assert!(machine.inventory().bottles().iter().all(|bottle| bottle.active));
    }

    #[test]
    fn should_import_only_into_an_empty_store() {
        let config = MachineConfig {
            import_path: Some("/nonexistent/bevmaker-import.txt".to_string()),
            ..test_config()
        };

        let rig = Rig::new(&[]);
        let store = seeded_store();
        let mut bottle = stored_bottle(&store, 0);
        bottle.estimated_capacity = 4.0;
        store.clone().put(&bottle_key(0), serde_json::to_string(&bottle).unwrap()).unwrap();
        let machine = boot_with(&rig, config.clone(), &store).unwrap();
        assert_eq!(4.0, machine.inventory().bottle(0).unwrap().estimated_capacity);

        let rig = Rig::new(&[]);
        let result = boot_with(&rig, config, &MemoryStore::new());
        assert!(matches!(result, Err(MachineError::Store(StoreError::Io(_)))));
    }

    #[test]
    fn should_run_until_the_input_is_exhausted() {
        let rig = Rig::new(&[]);
        let mut machine = boot_with(&rig, test_config(), &seeded_store()).unwrap();
        rig.push_input("!gopage@07");
        rig.queue.lock().unwrap().finished = true;

        machine.run().unwrap();

        assert_eq!(PAGE_BEVERAGE_MENU, machine.current_page());
        assert!(rig.status_channel.serviced() > 0);
    }
}
