
use super::*;

/// Bytes of record framing before the payload: length (4) + id (2) +
/// timestamp (4).
pub const RECORD_PAYLOAD_OFFSET: u32 = 10;

/// Total framing bytes around a payload, including the trailing checksum.
pub const RECORD_FRAMING_SIZE: u32 = RECORD_PAYLOAD_OFFSET + 1;

/// One decoded occurrence of a package.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageDataPerTick {
    /// Seconds since the encoder started, as stored in the record.
    pub timestamp_s: f32,
    /// File offset of the record's 4-byte length field.
    pub index_in_file: u64,
    /// Total record length on disk, length field through checksum byte.
    pub size_of_all_in_file: u32,
    /// Payload bytes without framing. Empty when the record was decoded in
    /// lazy mode and the package is dynamic.
    pub data: Vec<u8>,
}

impl PackageDataPerTick {
    /// On-disk byte range of the payload without framing, as accepted by the
    /// decoder's random-access loader.
    pub fn payload_location(&self) -> (u64, u32) {
        (
            self.index_in_file + RECORD_PAYLOAD_OFFSET as u64,
            self.size_of_all_in_file - RECORD_FRAMING_SIZE,
        )
    }

    /// Materializes one fixed-width item from the retained payload bytes.
    ///
    /// Returns `None` when the payload was not retained, the item lies
    /// outside it, or the item's type is dynamic.
    pub fn item_value(&self, item: &PackageItemInfo) -> Option<ItemValue> {
        let start = item.bindata_index_in_package as usize;
        ItemValue::read(item.item_type, self.data.get(start..)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_location_strips_framing() {
        let tick = PackageDataPerTick {
            timestamp_s: 0.5,
            index_in_file: 40,
            size_of_all_in_file: 24,
            data: Vec::new(),
        };
        assert_eq!(tick.payload_location(), (50, 13));
    }

    #[test]
    fn item_value_reads_at_item_offset() {
        let mut data = Vec::new();
        data.extend_from_slice(&1.5f32.to_le_bytes());
        data.extend_from_slice(&(-2.5f32).to_le_bytes());
        data.push(1);
        let tick = PackageDataPerTick {
            timestamp_s: 0.0,
            index_in_file: 0,
            size_of_all_in_file: data.len() as u32 + RECORD_FRAMING_SIZE,
            data,
        };

        let mut item = PackageItemInfo::new(ItemType::Float, "gyro_y");
        item.bindata_index_in_package = 4;
        assert_eq!(tick.item_value(&item).unwrap().as_float(), Some(-2.5));

        let mut item = PackageItemInfo::new(ItemType::Uint8, "valid");
        item.bindata_index_in_package = 8;
        assert_eq!(tick.item_value(&item).unwrap().as_uint8(), Some(1));
    }

    #[test]
    fn item_value_is_none_without_payload() {
        let tick = PackageDataPerTick::default();
        let item = PackageItemInfo::new(ItemType::Float, "gyro_x");
        assert_eq!(tick.item_value(&item), None);
    }
}
