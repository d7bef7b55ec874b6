
use std::collections::BTreeMap;

use log::info;

use super::*;

/// One typed field inside a package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageItemInfo {
    pub item_type: ItemType,
    /// Byte offset of this item inside the package payload. Assigned on
    /// registration as the running sum of the widths of all earlier items.
    pub bindata_index_in_package: u32,
    pub name: String,
}

impl PackageItemInfo {
    pub fn new(item_type: ItemType, name: &str) -> PackageItemInfo {
        PackageItemInfo {
            item_type,
            bindata_index_in_package: 0,
            name: name.to_string(),
        }
    }
}

/// A named, identified group of items that travel together as one
/// timestamped record.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageInfo {
    pub id: u16,
    /// Total payload size in bytes when every item is fixed-width, 0 when
    /// the package holds a dynamic item. Assigned on registration.
    pub size: u32,
    pub name: String,
    pub items: Vec<PackageItemInfo>,
}

impl PackageInfo {
    pub fn new(id: u16, name: &str, items: Vec<PackageItemInfo>) -> PackageInfo {
        PackageInfo {
            id,
            size: 0,
            name: name.to_string(),
            items,
        }
    }
}

/// Ordered registry of every package in a log file, keyed by id.
///
/// The tree map gives one stable order (ascending id) shared by schema-block
/// emission and diagnostic reports, so an encoded file is reproducible.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    packages: BTreeMap<u16, PackageInfo>,
}

impl SchemaRegistry {
    pub fn new() -> SchemaRegistry {
        SchemaRegistry::default()
    }

    /// Validates `package`, assigns its item offsets and total size, and
    /// stores it.
    ///
    /// A package must hold at least one item; a package holding a dynamic
    /// item must hold exactly that one item; ids are unique; package and
    /// item names must fit their one-byte length prefixes.
    pub fn register(&mut self, mut package: PackageInfo) -> Result<()> {
        if package.items.is_empty() {
            return Err(BinlogError::SchemaInvalid(format!(
                "package '{}' has no items",
                package.name
            )));
        }
        let dynamic_items = package
            .items
            .iter()
            .filter(|item| item.item_type.is_dynamic())
            .count();
        if dynamic_items > 0 && package.items.len() > 1 {
            return Err(BinlogError::SchemaInvalid(format!(
                "package '{}' mixes a dynamic item with other items",
                package.name
            )));
        }
        if package.name.len() > u8::MAX as usize {
            return Err(BinlogError::SchemaInvalid(format!(
                "package name '{}' is longer than 255 bytes",
                package.name
            )));
        }
        for item in &package.items {
            if item.name.len() > u8::MAX as usize {
                return Err(BinlogError::SchemaInvalid(format!(
                    "item name '{}' is longer than 255 bytes",
                    item.name
                )));
            }
        }
        if self.packages.contains_key(&package.id) {
            return Err(BinlogError::SchemaInvalid(format!(
                "package id {} is already registered",
                package.id
            )));
        }

        let mut offset = 0u32;
        for item in &mut package.items {
            item.bindata_index_in_package = offset;
            offset += item.item_type.width();
        }
        package.size = if dynamic_items > 0 { 0 } else { offset };

        self.packages.insert(package.id, package);
        Ok(())
    }

    pub fn get(&self, id: u16) -> Option<&PackageInfo> {
        self.packages.get(&id)
    }

    pub fn packages(&self) -> &BTreeMap<u16, PackageInfo> {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn clear(&mut self) {
        self.packages.clear();
    }

    /// Logs every registered package with its items.
    pub fn report_all_registered_packages(&self) {
        info!("All registered packages:");
        for package in self.packages.values() {
            info!(">> Package name : {}", package.name);
            info!("   Package id : {}", package.id);
            info!("   Package items :");
            for item in &package.items {
                info!("      [{}] : {}", item.item_type.label(), item.name);
            }
        }
    }
}
