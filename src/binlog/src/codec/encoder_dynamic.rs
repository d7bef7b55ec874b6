
use byteorder::{LittleEndian, WriteBytesExt};

use super::encoder::BinlogEncoder;
use crate::format::*;

/// Dynamic-payload record families. Each payload starts with the prefix the
/// decoder reads to learn the total size.
impl BinlogEncoder {
    /// Appends one image record: `{ channels: u8, rows: u16, cols: u16,
    /// pixels: channels·rows·cols × u8 }`.
    pub fn record_image(
        &mut self,
        package_id: u16,
        channels: u8,
        rows: u16,
        cols: u16,
        pixels: &[u8],
        timestamp_s: Option<f32>,
    ) -> Result<()> {
        self.check_dynamic_package(package_id, ItemType::Image)?;
        let pixel_count = channels as usize * rows as usize * cols as usize;
        if pixels.len() != pixel_count {
            return Err(BinlogError::SchemaInvalid(format!(
                "image payload is {} bytes but {}x{}x{} needs {}",
                pixels.len(),
                channels,
                rows,
                cols,
                pixel_count
            )));
        }

        let payload_size = 1 + 2 + 2 + pixel_count as u32;
        self.write_record(package_id, payload_size, timestamp_s, |record| {
            record.write_u8(channels)?;
            record.write_u16::<LittleEndian>(rows)?;
            record.write_u16::<LittleEndian>(cols)?;
            record.extend_from_slice(pixels);
            Ok(())
        })
    }

    /// Appends one matrix record: `{ rows: u16, cols: u16, elements:
    /// rows·cols × f32 }`, `elements` in row-major order.
    pub fn record_matrix(
        &mut self,
        package_id: u16,
        rows: u16,
        cols: u16,
        elements: &[f32],
        timestamp_s: Option<f32>,
    ) -> Result<()> {
        self.check_dynamic_package(package_id, ItemType::Matrix)?;
        let element_count = rows as usize * cols as usize;
        if elements.len() != element_count {
            return Err(BinlogError::SchemaInvalid(format!(
                "matrix payload is {} elements but {}x{} needs {}",
                elements.len(),
                rows,
                cols,
                element_count
            )));
        }

        let payload_size = 2 + 2 + element_count as u32 * 4;
        self.write_record(package_id, payload_size, timestamp_s, |record| {
            record.write_u16::<LittleEndian>(rows)?;
            record.write_u16::<LittleEndian>(cols)?;
            for element in elements {
                record.write_f32::<LittleEndian>(*element)?;
            }
            Ok(())
        })
    }

    /// Appends one opaque byte-blob record tagged with a dynamic item type:
    /// `{ num_bytes: u32, bytes: num_bytes × u8 }`.
    ///
    /// Only [`ItemType::PngImage`] blobs are supported so far.
    pub fn record_tagged_bytes(
        &mut self,
        package_id: u16,
        bytes: &[u8],
        item_type: ItemType,
        timestamp_s: Option<f32>,
    ) -> Result<()> {
        if item_type != ItemType::PngImage {
            return Err(BinlogError::UnsupportedDynamicType(item_type.code()));
        }
        self.check_dynamic_package(package_id, item_type)?;
        if bytes.is_empty() {
            return Err(BinlogError::SchemaInvalid(format!(
                "{} blob is empty",
                item_type.label()
            )));
        }

        let payload_size = 4 + bytes.len() as u32;
        self.write_record(package_id, payload_size, timestamp_s, |record| {
            record.write_u32::<LittleEndian>(bytes.len() as u32)?;
            record.extend_from_slice(bytes);
            Ok(())
        })
    }

    /// Appends one point-cloud record: `{ num_points: u32, points:
    /// num_points × (f32, f32, f32) }`.
    pub fn record_point_cloud(
        &mut self,
        package_id: u16,
        points: &[[f32; 3]],
        timestamp_s: Option<f32>,
    ) -> Result<()> {
        self.check_dynamic_package(package_id, ItemType::PointCloud)?;

        let payload_size = 4 + points.len() as u32 * 12;
        self.write_record(package_id, payload_size, timestamp_s, |record| {
            record.write_u32::<LittleEndian>(points.len() as u32)?;
            for point in points {
                for value in point {
                    record.write_f32::<LittleEndian>(*value)?;
                }
            }
            Ok(())
        })
    }

    /// Appends one line-cloud record: `{ num_lines: u32, lines: num_lines ×
    /// (f32, f32, f32, f32, f32, f32) }`, each line an endpoint pair.
    pub fn record_line_cloud(
        &mut self,
        package_id: u16,
        lines: &[[f32; 6]],
        timestamp_s: Option<f32>,
    ) -> Result<()> {
        self.check_dynamic_package(package_id, ItemType::LineCloud)?;

        let payload_size = 4 + lines.len() as u32 * 24;
        self.write_record(package_id, payload_size, timestamp_s, |record| {
            record.write_u32::<LittleEndian>(lines.len() as u32)?;
            for line in lines {
                for value in line {
                    record.write_f32::<LittleEndian>(*value)?;
                }
            }
            Ok(())
        })
    }
}
