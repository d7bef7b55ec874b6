mod error;
mod item_type;
mod package;
mod record;

pub use error::{BinlogError, Result};
pub use item_type::{ItemType, ItemValue};
pub use package::{PackageInfo, PackageItemInfo, SchemaRegistry};
pub use record::{PackageDataPerTick, RECORD_FRAMING_SIZE, RECORD_PAYLOAD_OFFSET};
