
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use log::{info, warn};

use super::checksum::sum_bytes;
use super::reader_extension::ReaderExtension;
use super::{FILE_HEADER, LEGACY_FILE_HEADER};
use crate::format::*;

/// Decodes a binary log file back into its schema and per-package records.
///
/// A log file has three parts:
///
/// | Part | Content |
/// | ---- | ------- |
/// | 1 | Fixed ASCII header text, no length prefix, no checksum |
/// | 2 | Schema block: total size, then one checksummed entry per package |
/// | 3 | Record stream until end of file |
///
/// [`load_log_file`] walks all three and fills an in-memory index of
/// `package id → records in file order`. Corrupt records are dropped with a
/// warning and the walk resynchronizes at the next record using the corrupt
/// record's own length field; only header, schema-block and open failures
/// abort the load.
///
/// [`load_log_file`]: BinlogDecoder::load_log_file
pub struct BinlogDecoder {
    file: Option<BufReader<File>>,
    schema: SchemaRegistry,
    packages_id_with_data: BTreeMap<u16, Vec<PackageDataPerTick>>,
    timestamp_s_range: (f32, f32),
}

impl BinlogDecoder {
    pub fn new() -> BinlogDecoder {
        BinlogDecoder {
            file: None,
            schema: SchemaRegistry::new(),
            packages_id_with_data: BTreeMap::new(),
            timestamp_s_range: (f32::INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Drops the schema and all loaded records and closes the file.
    pub fn clean_up(&mut self) {
        self.file = None;
        self.schema.clear();
        self.packages_id_with_data.clear();
        self.timestamp_s_range = (f32::INFINITY, f32::NEG_INFINITY);
    }

    /// Opens `path`, validates the header, rebuilds the schema registry from
    /// Part 2 and walks every Part-3 record.
    ///
    /// With `load_dynamic_full_data == false`, dynamic-payload records are
    /// indexed (timestamp, file offset, on-disk size) but their payload bytes
    /// stay on disk, to be fetched through
    /// [`load_binary_data_from_log_file`]. Static payloads are always
    /// retained.
    ///
    /// [`load_binary_data_from_log_file`]: BinlogDecoder::load_binary_data_from_log_file
    pub fn load_log_file(&mut self, path: &Path, load_dynamic_full_data: bool) -> Result<()> {
        self.clean_up();

        let file = File::open(path).map_err(|source| BinlogError::IoOpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        Self::check_log_file_header(&mut reader)?;
        self.load_registered_packages(&mut reader)?;

        self.timestamp_s_range = (f32::INFINITY, f32::NEG_INFINITY);
        loop {
            if reader.stream_position()? >= file_len {
                break;
            }
            if !self.load_one_record(&mut reader, file_len, load_dynamic_full_data)? {
                break;
            }
        }

        // Reopen the handle so the random-access loader starts from a clean
        // stream.
        let file = File::open(path).map_err(|source| BinlogError::IoOpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        self.file = Some(BufReader::new(file));
        Ok(())
    }

    /// Reads `size` raw bytes at absolute file offset `index_in_file`.
    pub fn load_binary_data_from_log_file(
        &mut self,
        index_in_file: u64,
        size: u32,
    ) -> Result<Vec<u8>> {
        let reader = self.file.as_mut().ok_or(BinlogError::NotOpen)?;
        reader.seek(SeekFrom::Start(index_in_file))?;
        let mut bytes = vec![0u8; size as usize];
        reader.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Ordered schema map rebuilt from the file, keyed by package id.
    pub fn packages_id_with_objects(&self) -> &BTreeMap<u16, PackageInfo> {
        self.schema.packages()
    }

    /// Loaded records per package id, in file order.
    pub fn packages_id_with_data(&self) -> &BTreeMap<u16, Vec<PackageDataPerTick>> {
        &self.packages_id_with_data
    }

    /// `(min, max)` over the timestamps of all loaded records.
    pub fn timestamp_s_range_of_loaded_log(&self) -> (f32, f32) {
        self.timestamp_s_range
    }

    /// Logs every package registered in the loaded schema.
    pub fn report_all_registered_packages(&self) {
        self.schema.report_all_registered_packages();
    }

    /// Logs every loaded package with its record count and timestamp span.
    pub fn report_all_loaded_packages(&self) {
        info!("All loaded packages:");
        for (id, records) in &self.packages_id_with_data {
            let name = self
                .schema
                .get(*id)
                .map_or("<unknown>", |package| package.name.as_str());
            info!(">> Package {} ({}) : {} records", id, name, records.len());
            if let (Some(first), Some(last)) = (records.first(), records.last()) {
                info!(
                    "   Timestamps : {}s to {}s",
                    first.timestamp_s, last.timestamp_s
                );
            }
        }
        let (min, max) = self.timestamp_s_range;
        if min <= max {
            info!("Timestamp range of loaded log : ({}s, {}s)", min, max);
        }
    }

    /// Accepts the current header text or the one written by older files.
    fn check_log_file_header(reader: &mut BufReader<File>) -> Result<()> {
        let mut probe = [0u8; 13];
        reader
            .read_exact(&mut probe)
            .map_err(|_| BinlogError::HeaderInvalid)?;
        if probe == *LEGACY_FILE_HEADER {
            return Ok(());
        }

        let mut tail = [0u8; 2];
        reader
            .read_exact(&mut tail)
            .map_err(|_| BinlogError::HeaderInvalid)?;
        if probe[..] == FILE_HEADER[..13] && tail[..] == FILE_HEADER[13..] {
            Ok(())
        } else {
            Err(BinlogError::HeaderInvalid)
        }
    }

    /// Parses the Part-2 schema block and registers every package.
    ///
    /// The walk is driven by the per-package offsets; a checksum mismatch on
    /// any entry aborts the whole load.
    fn load_registered_packages(&mut self, reader: &mut BufReader<File>) -> Result<()> {
        let offset_to_data_part = reader.read_u32::<LittleEndian>()?;

        let mut consumed = 4u32;
        while consumed < offset_to_data_part {
            let per_pkg_offset = reader.read_u32::<LittleEndian>()?;
            if per_pkg_offset < 4 + 2 + 1 + 1 {
                return Err(BinlogError::SchemaInvalid(format!(
                    "schema entry length {} is shorter than its framing",
                    per_pkg_offset
                )));
            }
            let mut sum_check_byte = sum_bytes(&per_pkg_offset.to_le_bytes(), 0);

            let id = reader.read_u16::<LittleEndian>()?;
            sum_check_byte = sum_bytes(&id.to_le_bytes(), sum_check_byte);

            let name = reader.read_short_string()?;
            sum_check_byte = sum_bytes(&[name.len() as u8], sum_check_byte);
            sum_check_byte = sum_bytes(name.as_bytes(), sum_check_byte);

            let mut items = Vec::new();
            let mut offset_in_package = 4 + 2 + 1 + name.len() as u32 + 1;
            while offset_in_package < per_pkg_offset {
                let code = reader.read_u8()?;
                let item_type = ItemType::from_code(code).ok_or_else(|| {
                    BinlogError::SchemaInvalid(format!("unknown item type code {}", code))
                })?;
                sum_check_byte = sum_bytes(&[code], sum_check_byte);

                let item_name = reader.read_short_string()?;
                sum_check_byte = sum_bytes(&[item_name.len() as u8], sum_check_byte);
                sum_check_byte = sum_bytes(item_name.as_bytes(), sum_check_byte);

                offset_in_package += 2 + item_name.len() as u32;
                items.push(PackageItemInfo::new(item_type, &item_name));
            }

            let stored = reader.read_u8()?;
            if stored != sum_check_byte {
                return Err(BinlogError::ChecksumMismatch {
                    computed: sum_check_byte,
                    stored,
                });
            }

            self.schema.register(PackageInfo::new(id, &name, items))?;
            consumed += per_pkg_offset;
        }

        Ok(())
    }

    /// Decodes one Part-3 record. Returns `false` when the walk should stop.
    ///
    /// Whatever happens inside the record, the reader is resynchronized at
    /// `record start + record length` afterwards, so one corrupt record never
    /// takes down the rest of the stream.
    fn load_one_record(
        &mut self,
        reader: &mut BufReader<File>,
        file_len: u64,
        load_dynamic_full_data: bool,
    ) -> Result<bool> {
        let index_in_file = reader.stream_position()?;
        let record_offset = match reader.read_u32::<LittleEndian>() {
            Ok(value) => value,
            Err(error) if error.kind() == ErrorKind::UnexpectedEof => return Ok(false),
            Err(error) => return Err(error.into()),
        };
        let next_record = index_in_file + record_offset as u64;
        let sum_check_byte = sum_bytes(&record_offset.to_le_bytes(), 0);

        match self.read_record_body(
            reader,
            index_in_file,
            record_offset,
            sum_check_byte,
            load_dynamic_full_data,
        ) {
            Ok(Some((package_id, tick))) => {
                let records = self.packages_id_with_data.entry(package_id).or_default();
                if let Some(last) = records.last() {
                    if last.timestamp_s == tick.timestamp_s {
                        warn!(
                            "same timestamp {}s repeated for package id {}",
                            tick.timestamp_s, package_id
                        );
                    }
                }
                records.push(tick);
            }
            Ok(None) => {}
            Err(error) if error.kind() == ErrorKind::UnexpectedEof => {
                warn!(
                    "{}; short read, record dropped",
                    BinlogError::RecordCorrupt { index_in_file }
                );
            }
            Err(error) => return Err(error.into()),
        }

        // The resync target must stay inside the file and advance the walk.
        if next_record > file_len || next_record == index_in_file {
            return Ok(false);
        }
        reader.seek(SeekFrom::Start(next_record))?;
        Ok(true)
    }

    fn read_record_body(
        &mut self,
        reader: &mut BufReader<File>,
        index_in_file: u64,
        record_offset: u32,
        mut sum_check_byte: u8,
        load_dynamic_full_data: bool,
    ) -> std::io::Result<Option<(u16, PackageDataPerTick)>> {
        let package_id = reader.read_u16::<LittleEndian>()?;
        sum_check_byte = sum_bytes(&package_id.to_le_bytes(), sum_check_byte);

        let Some(package) = self.schema.get(package_id) else {
            warn!(
                "{}; record skipped",
                BinlogError::NotRegistered(package_id)
            );
            return Ok(None);
        };
        let static_size = package.size;
        let first_item_type = package.items[0].item_type;

        let timestamp_s = reader.read_f32::<LittleEndian>()?;
        sum_check_byte = sum_bytes(&timestamp_s.to_le_bytes(), sum_check_byte);
        self.timestamp_s_range.0 = self.timestamp_s_range.0.min(timestamp_s);
        self.timestamp_s_range.1 = self.timestamp_s_range.1.max(timestamp_s);

        let payload_size = if static_size != 0 {
            static_size as u64
        } else {
            match Self::dynamic_payload_size(reader, first_item_type)? {
                Some(size) => size,
                None => {
                    warn!(
                        "{}; record skipped",
                        BinlogError::UnsupportedDynamicType(first_item_type.code())
                    );
                    return Ok(None);
                }
            }
        };
        if payload_size + RECORD_FRAMING_SIZE as u64 > record_offset as u64 {
            warn!(
                "{}; payload size {} does not fit the record",
                BinlogError::RecordCorrupt { index_in_file },
                payload_size
            );
            return Ok(None);
        }

        let mut payload = vec![0u8; payload_size as usize];
        reader.read_exact(&mut payload)?;
        sum_check_byte = sum_bytes(&payload, sum_check_byte);

        let stored = reader.read_u8()?;
        if stored != sum_check_byte {
            warn!(
                "{}; checksum mismatch: computed {}, stored {}",
                BinlogError::RecordCorrupt { index_in_file },
                sum_check_byte,
                stored
            );
            return Ok(None);
        }

        let retain = static_size != 0 || load_dynamic_full_data;
        let tick = PackageDataPerTick {
            timestamp_s,
            index_in_file,
            size_of_all_in_file: record_offset,
            data: if retain { payload } else { Vec::new() },
        };
        Ok(Some((package_id, tick)))
    }

    /// Reads just enough of a dynamic payload's prefix to compute its total
    /// size, then rewinds so the following contiguous read covers the whole
    /// payload (prefix included) for the checksum.
    ///
    /// Returns `None` for item types with no dynamic layout.
    fn dynamic_payload_size(
        reader: &mut BufReader<File>,
        item_type: ItemType,
    ) -> std::io::Result<Option<u64>> {
        let size = match item_type {
            ItemType::Image => {
                let channels = reader.read_u8()? as u64;
                let rows = reader.read_u16::<LittleEndian>()? as u64;
                let cols = reader.read_u16::<LittleEndian>()? as u64;
                reader.seek_relative(-5)?;
                5 + channels * rows * cols
            }
            ItemType::Matrix => {
                let rows = reader.read_u16::<LittleEndian>()? as u64;
                let cols = reader.read_u16::<LittleEndian>()? as u64;
                reader.seek_relative(-4)?;
                4 + rows * cols * 4
            }
            ItemType::PngImage => {
                let num_bytes = reader.read_u32::<LittleEndian>()? as u64;
                reader.seek_relative(-4)?;
                4 + num_bytes
            }
            ItemType::PointCloud => {
                let num_points = reader.read_u32::<LittleEndian>()? as u64;
                reader.seek_relative(-4)?;
                4 + num_points * 12
            }
            ItemType::LineCloud => {
                let num_lines = reader.read_u32::<LittleEndian>()? as u64;
                reader.seek_relative(-4)?;
                4 + num_lines * 24
            }
            _ => return Ok(None),
        };
        Ok(Some(size))
    }
}

impl Default for BinlogDecoder {
    fn default() -> BinlogDecoder {
        BinlogDecoder::new()
    }
}
