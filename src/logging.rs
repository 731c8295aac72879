use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, Once};

/// Appends records to a file; the terminal belongs to the UI.
struct FileLogger {
    file: Mutex<Option<File>>,
}

impl log::Log for FileLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = writeln!(file, "[{}] {}: {}", record.level(), record.target(), record.args());
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

static LOGGER: FileLogger = FileLogger {
    file: Mutex::new(None),
};
static INIT: Once = Once::new();

/// Route `log` output to `path`. Logging stays disabled if the file cannot be created.
pub fn init_logger(path: &Path, level: log::LevelFilter) {
    INIT.call_once(|| {
        let Ok(file) = File::create(path) else {
            return;
        };
        if let Ok(mut guard) = LOGGER.file.lock() {
            *guard = Some(file);
        }
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(level);
    });
}
