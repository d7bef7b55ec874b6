
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use paste::paste;

macro_rules! item_types {
    ($(ITEM($name:ident, $code:literal, $width:literal, $label:literal))*) => {
        /// Wire code of one typed field inside a package.
        ///
        /// The code is a single byte stored in the schema block. Fixed-width
        /// types carry their payload inline at a known offset; dynamic types
        /// (width 0) own the whole package payload and prefix it with their
        /// own dimensions.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum ItemType {
            $($name = $code,)*
        }

        impl ItemType {
            pub fn from_code(code: u8) -> Option<ItemType> {
                match code {
                    $($code => Some(ItemType::$name),)*
                    _ => None,
                }
            }

            pub fn code(self) -> u8 {
                self as u8
            }

            /// Payload width in bytes, 0 for dynamic types.
            pub fn width(self) -> u32 {
                match self {
                    $(ItemType::$name => $width,)*
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $(ItemType::$name => $label,)*
                }
            }

            /// Dynamic types read their payload size from a prefix inside the
            /// payload instead of the schema.
            pub fn is_dynamic(self) -> bool {
                self.width() == 0
            }
        }
    };
}

item_types!(
    ITEM(Uint8, 0, 1, "uint8")
    ITEM(Int8, 1, 1, "int8")
    ITEM(Uint16, 2, 2, "uint16")
    ITEM(Int16, 3, 2, "int16")
    ITEM(Uint32, 4, 4, "uint32")
    ITEM(Int32, 5, 4, "int32")
    ITEM(Uint64, 6, 8, "uint64")
    ITEM(Int64, 7, 8, "int64")
    ITEM(Float, 8, 4, "float")
    ITEM(Double, 9, 8, "double")
    ITEM(Vector3, 10, 12, "vector3")
    ITEM(Pose6Dof, 11, 28, "pose6dof")
    ITEM(Image, 12, 0, "image")
    ITEM(PngImage, 13, 0, "png_image")
    ITEM(Matrix, 14, 0, "matrix")
    ITEM(PointCloud, 15, 0, "point_cloud")
    ITEM(LineCloud, 16, 0, "line_cloud")
);

macro_rules! item_values {
    ($(VALUE($name:ident, $snake:ident, $ty:ty))*) => {
        paste! {
            /// One fixed-width item materialized from a package payload.
            ///
            /// `Vector3` is `[x, y, z]`; `Pose6Dof` is position `[x, y, z]`
            /// followed by quaternion `[w, x, y, z]`.
            #[derive(Debug, Clone, Copy, PartialEq)]
            pub enum ItemValue {
                $($name($ty),)*
            }

            impl ItemValue {
                /// Decodes the item at the front of `bytes` as `item_type`.
                ///
                /// Returns `None` for dynamic item types and when `bytes` is
                /// too short.
                pub fn read(item_type: ItemType, bytes: &[u8]) -> Option<ItemValue> {
                    let mut cursor = Cursor::new(bytes);
                    match item_type {
                        $(ItemType::$name => Some(ItemValue::$name(item_values!(@read $name cursor))),)*
                        _ => None,
                    }
                }

                $(
                    pub fn [<as_ $snake>](self) -> Option<$ty> {
                        match self {
                            ItemValue::$name(value) => Some(value),
                            _ => None,
                        }
                    }
                )*
            }
        }
    };

    (@read Uint8 $cursor:ident) => { $cursor.read_u8().ok()? };
    (@read Int8 $cursor:ident) => { $cursor.read_i8().ok()? };
    (@read Uint16 $cursor:ident) => { $cursor.read_u16::<LittleEndian>().ok()? };
    (@read Int16 $cursor:ident) => { $cursor.read_i16::<LittleEndian>().ok()? };
    (@read Uint32 $cursor:ident) => { $cursor.read_u32::<LittleEndian>().ok()? };
    (@read Int32 $cursor:ident) => { $cursor.read_i32::<LittleEndian>().ok()? };
    (@read Uint64 $cursor:ident) => { $cursor.read_u64::<LittleEndian>().ok()? };
    (@read Int64 $cursor:ident) => { $cursor.read_i64::<LittleEndian>().ok()? };
    (@read Float $cursor:ident) => { $cursor.read_f32::<LittleEndian>().ok()? };
    (@read Double $cursor:ident) => { $cursor.read_f64::<LittleEndian>().ok()? };
    (@read Vector3 $cursor:ident) => {{
        let mut values = [0.0f32; 3];
        $cursor.read_f32_into::<LittleEndian>(&mut values).ok()?;
        values
    }};
    (@read Pose6Dof $cursor:ident) => {{
        let mut values = [0.0f32; 7];
        $cursor.read_f32_into::<LittleEndian>(&mut values).ok()?;
        values
    }};
}

item_values!(
    VALUE(Uint8, uint8, u8)
    VALUE(Int8, int8, i8)
    VALUE(Uint16, uint16, u16)
    VALUE(Int16, int16, i16)
    VALUE(Uint32, uint32, u32)
    VALUE(Int32, int32, i32)
    VALUE(Uint64, uint64, u64)
    VALUE(Int64, int64, i64)
    VALUE(Float, float, f32)
    VALUE(Double, double, f64)
    VALUE(Vector3, vector3, [f32; 3])
    VALUE(Pose6Dof, pose6dof, [f32; 7])
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for code in 0..=16u8 {
            let item_type = ItemType::from_code(code).unwrap();
            assert_eq!(item_type.code(), code);
        }
        assert_eq!(ItemType::from_code(17), None);
        assert_eq!(ItemType::from_code(255), None);
    }

    #[test]
    fn widths_match_wire_layout() {
        assert_eq!(ItemType::Uint8.width(), 1);
        assert_eq!(ItemType::Int64.width(), 8);
        assert_eq!(ItemType::Float.width(), 4);
        assert_eq!(ItemType::Vector3.width(), 12);
        assert_eq!(ItemType::Pose6Dof.width(), 28);
        for dynamic in [
            ItemType::Image,
            ItemType::PngImage,
            ItemType::Matrix,
            ItemType::PointCloud,
            ItemType::LineCloud,
        ] {
            assert_eq!(dynamic.width(), 0);
            assert!(dynamic.is_dynamic());
        }
        assert!(!ItemType::Double.is_dynamic());
    }

    #[test]
    fn reads_scalar_values() {
        let bytes = 3.5f32.to_le_bytes();
        let value = ItemValue::read(ItemType::Float, &bytes).unwrap();
        assert_eq!(value.as_float(), Some(3.5));
        assert_eq!(value.as_uint8(), None);

        let bytes = (-7i32).to_le_bytes();
        let value = ItemValue::read(ItemType::Int32, &bytes).unwrap();
        assert_eq!(value.as_int32(), Some(-7));
    }

    #[test]
    fn reads_composite_values() {
        let mut bytes = Vec::new();
        for value in [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        let value = ItemValue::read(ItemType::Vector3, &bytes).unwrap();
        assert_eq!(value.as_vector3(), Some([1.0, 2.0, 3.0]));

        let value = ItemValue::read(ItemType::Pose6Dof, &bytes).unwrap();
        assert_eq!(value.as_pose6dof(), Some([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]));
    }

    #[test]
    fn rejects_short_or_dynamic_reads() {
        assert_eq!(ItemValue::read(ItemType::Double, &[0u8; 4]), None);
        assert_eq!(ItemValue::read(ItemType::Image, &[0u8; 64]), None);
    }
}
