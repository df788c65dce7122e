#![allow(dead_code)]

use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use runlog::config::{self, Settings};

/// In-memory console shared between the logger and the test.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn settings(debug: &str, output_dir: &Path) -> Settings {
    config::load_from(Some(debug), Some(output_dir.to_str().unwrap()), None).unwrap()
}

pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}
