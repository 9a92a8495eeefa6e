use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use messages_core::domain::MessageRecord;
use messages_core::ports::MessageWriter;
use messages_core::{Error, Result};
use tracing::debug;

/// JSON writer adapter implementation
///
/// Writes a pretty-printed array to a sibling temporary file, then renames it
/// over the target, so the target is either absent, the previous version, or
/// complete.
pub struct JsonFileWriter {
    output_file: PathBuf,
}

impl JsonFileWriter {
    pub fn new(output_file: impl Into<PathBuf>) -> Self {
        Self {
            output_file: output_file.into(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(".");
        name.push(
            self.output_file
                .file_name()
                .unwrap_or_else(|| "messages.json".as_ref()),
        );
        name.push(format!(".{}.tmp", std::process::id()));
        self.output_file.with_file_name(name)
    }

    fn write_temp(&self, temp: &Path, records: &[MessageRecord]) -> io::Result<()> {
        let mut bytes = serde_json::to_vec_pretty(records)?;
        bytes.push(b'\n');

        let mut file = File::create(temp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        Ok(())
    }
}

impl MessageWriter for JsonFileWriter {
    fn write(&self, records: &[MessageRecord]) -> Result<PathBuf> {
        let temp = self.temp_path();
        debug!(temp = %temp.display(), count = records.len(), "writing messages");

        let result = self
            .write_temp(&temp, records)
            .and_then(|()| fs::rename(&temp, &self.output_file));

        if let Err(source) = result {
            let _ = fs::remove_file(&temp);
            return Err(Error::Write {
                path: self.output_file.clone(),
                source,
            });
        }

        Ok(self.output_file.clone())
    }
}
