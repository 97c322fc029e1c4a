//! Parametros fijos de la maquina y valores por defecto de la configuracion

/// Cantidad de botellas (y motores) que tiene la maquina. El id de una botella es tambien su motor.
pub const MOTOR_COUNT: usize = 8;

/// Cantidad de bebidas (recetas) que se cargan al iniciar
pub const BEV_COUNT: usize = 12;

/// Onzas que siempre deben quedar en una botella despues de servir
pub const SAFETY_MARGIN_OZ: f64 = 2.0;

/// Peso minimo (unidades crudas de la balanza) para considerar que hay un vaso
pub const MIN_CUP_WEIGHT: f64 = 5.0;

/// Unidades crudas de la balanza por onza
pub const SCALE_OZ_FACTOR: f64 = 28.35;

/// Caida de peso (unidades crudas) respecto del inicio a partir de la cual se considera que se retiro el vaso
pub const CUP_REMOVAL_THRESHOLD: f64 = 15.0;

/// Tiempo maximo que puede estar encendido un motor en un mismo servido
pub const MOTOR_TIMEOUT_MS: u64 = 30_000;

/// Tiempo que se le da al usuario para leer el mensaje antes de tarar la balanza
pub const CALIBRATION_WAIT_MS: u64 = 3_000;

/// Intervalo entre lecturas en los loops de espera
pub const POLL_INTERVAL_MS: u64 = 20;

/// Segundos de la cuenta regresiva antes de volver al menu
pub const COUNTDOWN_SECS: u64 = 5;

pub const DEFAULT_STORE_PATH: &str = "inventory.json";

pub const STATUS_TOPIC: &str = "bevmaker/status";
pub const BOTTLE_UPDATE_TOPIC: &str = "bevmaker/bottle/update";
pub const COMMAND_TOPIC: &str = "bevmaker/command";

/// Item de texto de la pantalla donde se muestran mensajes
pub const MESSAGE_ITEM: &str = "t3";

/// Paginas de la pantalla tactil
pub const PAGE_START: u8 = 0;
pub const PAGE_HOME: u8 = 1;
pub const PAGE_AUTH: u8 = 3;
pub const PAGE_ADMIN: u8 = 4;
pub const PAGE_DATALOG: u8 = 5;
pub const PAGE_KEYBOARD: u8 = 6;
pub const PAGE_BEVERAGE_MENU: u8 = 7;
pub const PAGE_DISPENSE: u8 = 8;
pub const PAGE_CAPACITY_EDIT: u8 = 9;

pub const KNOWN_PAGES: [u8; 9] = [
    PAGE_START,
    PAGE_HOME,
    PAGE_AUTH,
    PAGE_ADMIN,
    PAGE_DATALOG,
    PAGE_KEYBOARD,
    PAGE_BEVERAGE_MENU,
    PAGE_DISPENSE,
    PAGE_CAPACITY_EDIT,
];
