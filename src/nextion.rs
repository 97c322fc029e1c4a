//! Salida hacia la pantalla tactil con el formato de comandos de Nextion
use std::io::{self, Write};

use log::{debug, error};

use crate::hardware::Display;

const TERMINATOR: [u8; 3] = [0xff, 0xff, 0xff];

pub struct NextionDisplay<W: Write> {
    writer: W,
    current_page: u8,
}

impl<W: Write> NextionDisplay<W> {
    pub fn new(writer: W) -> NextionDisplay<W> {
        NextionDisplay {
            writer,
            current_page: 0,
        }
    }

    pub fn current_page(&self) -> u8 {
        self.current_page
    }

    fn send(&mut self, command: &str) {
        debug!("[DISPLAY] Sent {}", command);
        if let Err(err) = write_command(&mut self.writer, command) {
            error!("[DISPLAY] Error writing to the display: {}", err);
        }
    }
}

fn write_command<W: Write>(writer: &mut W, command: &str) -> io::Result<()> {
    writer.write_all(command.as_bytes())?;
    writer.write_all(&TERMINATOR)?;
    writer.flush()
}

impl<W: Write> Display for NextionDisplay<W> {
    fn show_page(&mut self, page: u8) {
        self.send(&format!("page {}", page));
        self.current_page = page;
    }

    fn set_text(&mut self, item: &str, text: &str) {
        let escaped = text.replace('"', "'");
        self.send(&format!("{}.txt=\"{}\"", item, escaped));
    }
}
