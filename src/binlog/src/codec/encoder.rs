
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use byteorder::{LittleEndian, WriteBytesExt};

use super::checksum::sum_bytes;
use super::FILE_HEADER;
use crate::format::*;

/// Records timestamped packages into an append-only binary log file.
///
/// Usage follows the file layout: [`create_log_file`] writes the Part-1
/// header, [`register_package`] accumulates the schema, and
/// [`prepare_for_recording`] serializes it as Part 2. Every `record_*` call
/// afterwards appends one framed, checksummed Part-3 record; nothing is
/// buffered across calls, so a file truncated at any point still decodes up
/// to its last complete record.
///
/// [`create_log_file`]: BinlogEncoder::create_log_file
/// [`register_package`]: BinlogEncoder::register_package
/// [`prepare_for_recording`]: BinlogEncoder::prepare_for_recording
pub struct BinlogEncoder {
    file: Option<File>,
    schema: SchemaRegistry,
    /// Set once Part 2 is written; the format cannot append schema entries.
    schema_written: bool,
    start_time: Instant,
    current_recorded_timestamp_s: f32,
}

impl BinlogEncoder {
    pub fn new() -> BinlogEncoder {
        BinlogEncoder {
            file: None,
            schema: SchemaRegistry::new(),
            schema_written: false,
            start_time: Instant::now(),
            current_recorded_timestamp_s: 0.0,
        }
    }

    /// Drops the schema, closes the output file and restarts the clock.
    pub fn clean_up(&mut self) {
        self.file = None;
        self.schema.clear();
        self.schema_written = false;
        self.start_time = Instant::now();
        self.current_recorded_timestamp_s = 0.0;
    }

    /// Creates `path` (truncating any existing file), closes a previously
    /// open log and writes the Part-1 header.
    pub fn create_log_file(&mut self, path: &Path) -> Result<()> {
        self.file = None;

        let mut file = File::create(path).map_err(|source| BinlogError::IoOpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        file.write_all(FILE_HEADER)?;

        self.file = Some(file);
        self.schema_written = false;
        Ok(())
    }

    /// Validates and stores a package schema entry.
    ///
    /// Rejected once [`prepare_for_recording`] has written the schema block.
    ///
    /// [`prepare_for_recording`]: BinlogEncoder::prepare_for_recording
    pub fn register_package(&mut self, package: PackageInfo) -> Result<()> {
        if self.schema_written {
            return Err(BinlogError::SchemaInvalid(
                "the schema block is already written".to_string(),
            ));
        }
        self.schema.register(package)
    }

    /// Serializes the schema block (Part 2) from the registered packages.
    ///
    /// The block starts with its own total size and holds one self-contained,
    /// checksummed entry per package:
    ///
    /// | Size | Field |
    /// | ---- | ----- |
    /// | 4 | Offset to the next entry, this field through the checksum byte |
    /// | 2 | Package id |
    /// | 1 + n | Package name, length-prefixed |
    /// | (1 + 1 + m) × items | Item type code and length-prefixed item name |
    /// | 1 | Additive checksum over the entry |
    ///
    /// Packages are emitted in ascending id order.
    pub fn prepare_for_recording(&mut self) -> Result<()> {
        if self.schema.is_empty() {
            return Err(BinlogError::SchemaInvalid(
                "no package is registered".to_string(),
            ));
        }
        let file = self.file.as_mut().ok_or(BinlogError::NotOpen)?;

        let mut block = Vec::new();
        for package in self.schema.packages().values() {
            let item_bytes: usize = package
                .items
                .iter()
                .map(|item| 1 + 1 + item.name.len())
                .sum();
            let entry_size = 4 + 2 + 1 + package.name.len() + item_bytes + 1;

            let mut entry = Vec::with_capacity(entry_size);
            entry.write_u32::<LittleEndian>(entry_size as u32)?;
            entry.write_u16::<LittleEndian>(package.id)?;
            entry.write_u8(package.name.len() as u8)?;
            entry.extend_from_slice(package.name.as_bytes());
            for item in &package.items {
                entry.write_u8(item.item_type.code())?;
                entry.write_u8(item.name.len() as u8)?;
                entry.extend_from_slice(item.name.as_bytes());
            }
            let sum_check_byte = sum_bytes(&entry, 0);
            entry.push(sum_check_byte);

            block.extend_from_slice(&entry);
        }

        file.write_u32::<LittleEndian>(4 + block.len() as u32)?;
        file.write_all(&block)?;

        self.schema_written = true;
        Ok(())
    }

    /// Appends one record for a static (fixed-size) package.
    ///
    /// `data` must be exactly the package's payload size, laid out at the
    /// item offsets of the registered schema. With `timestamp_s` omitted the
    /// encoder stamps seconds elapsed since its construction.
    pub fn record_package(
        &mut self,
        package_id: u16,
        data: &[u8],
        timestamp_s: Option<f32>,
    ) -> Result<()> {
        let package = self
            .schema
            .get(package_id)
            .ok_or(BinlogError::NotRegistered(package_id))?;
        if package.size == 0 {
            return Err(BinlogError::SchemaInvalid(format!(
                "package '{}' is dynamic and needs its typed record call",
                package.name
            )));
        }
        if data.len() != package.size as usize {
            return Err(BinlogError::SchemaInvalid(format!(
                "payload is {} bytes but package '{}' holds {}",
                data.len(),
                package.name,
                package.size
            )));
        }

        self.write_record(package_id, data.len() as u32, timestamp_s, |record| {
            record.extend_from_slice(data);
            Ok(())
        })
    }

    /// Last timestamp written to the file, in seconds.
    pub fn current_recorded_timestamp_s(&self) -> f32 {
        self.current_recorded_timestamp_s
    }

    pub fn packages(&self) -> &SchemaRegistry {
        &self.schema
    }

    /// Logs every registered package with its items.
    pub fn report_all_registered_packages(&self) {
        self.schema.report_all_registered_packages();
    }

    /// Frames, checksums and writes one Part-3 record:
    ///
    /// | Size | Field |
    /// | ---- | ----- |
    /// | 4 | Offset to the next record, this field through the checksum byte |
    /// | 2 | Package id |
    /// | 4 | Timestamp, f32 seconds since encoder start |
    /// | n | Payload |
    /// | 1 | Additive checksum over everything above |
    pub(super) fn write_record(
        &mut self,
        package_id: u16,
        payload_size: u32,
        timestamp_s: Option<f32>,
        write_payload: impl FnOnce(&mut Vec<u8>) -> std::io::Result<()>,
    ) -> Result<()> {
        if !self.schema_written {
            return Err(BinlogError::SchemaInvalid(
                "prepare_for_recording has not been called".to_string(),
            ));
        }
        let timestamp_s =
            timestamp_s.unwrap_or_else(|| self.start_time.elapsed().as_secs_f32());
        let file = self.file.as_mut().ok_or(BinlogError::NotOpen)?;

        let record_size = RECORD_FRAMING_SIZE + payload_size;
        let mut record = Vec::with_capacity(record_size as usize);
        record.write_u32::<LittleEndian>(record_size)?;
        record.write_u16::<LittleEndian>(package_id)?;
        record.write_f32::<LittleEndian>(timestamp_s)?;
        write_payload(&mut record)?;
        let sum_check_byte = sum_bytes(&record, 0);
        record.push(sum_check_byte);

        file.write_all(&record)?;
        self.current_recorded_timestamp_s = timestamp_s;
        Ok(())
    }

    /// Looks up a dynamic package and checks its single item is `expected`.
    pub(super) fn check_dynamic_package(&self, package_id: u16, expected: ItemType) -> Result<()> {
        let package = self
            .schema
            .get(package_id)
            .ok_or(BinlogError::NotRegistered(package_id))?;
        let matches = package.size == 0
            && package
                .items
                .first()
                .is_some_and(|item| item.item_type == expected);
        if !matches {
            return Err(BinlogError::SchemaInvalid(format!(
                "package '{}' does not hold a single {} item",
                package.name,
                expected.label()
            )));
        }
        Ok(())
    }
}

impl Default for BinlogEncoder {
    fn default() -> BinlogEncoder {
        BinlogEncoder::new()
    }
}
