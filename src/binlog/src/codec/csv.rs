
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use log::{info, warn};

use super::encoder::BinlogEncoder;
use crate::format::*;

/// Suffix patterns that reveal the unit of a timestamp column, checked in
/// priority order after the exact-name match.
const TIMESTAMP_SUFFIXES: [(&str, f64); 8] = [
    ("_s", 1.0),
    ("_ns", 1e-9),
    ("_us", 1e-6),
    ("_ms", 1e-3),
    ("[s]", 1.0),
    ("[ns]", 1e-9),
    ("[us]", 1e-6),
    ("[ms]", 1e-3),
];

/// Converts a column-oriented csv file (header line + comma-separated numeric
/// rows) into a binary log at `log_path`, inferring the schema from the
/// header.
///
/// Columns group into packages by the name part before `/` (columns without
/// one go to `default_package`); runs of axis-suffixed columns fold into
/// `pose6dof` and `vector3` items, everything else becomes a `float`. Each
/// package's id is the column index of its first data column. Timestamps are
/// taken from the detected timestamp column, shifted so the first row starts
/// at zero and scaled to seconds.
pub fn create_log_file_by_csv_file(csv_path: &Path, log_path: &Path) -> Result<()> {
    let content = fs::read_to_string(csv_path).map_err(|source| BinlogError::IoOpenFailed {
        path: csv_path.to_path_buf(),
        source,
    })?;
    let mut lines = content.lines();

    let header: Vec<String> = lines
        .next()
        .unwrap_or("")
        .split(',')
        .map(|field| field.trim().to_string())
        .filter(|field| !field.is_empty())
        .collect();
    if header.is_empty() {
        return Err(BinlogError::SchemaInvalid(format!(
            "{} has no csv header line",
            csv_path.display()
        )));
    }

    let (timestamp_index, timestamp_scale) = header
        .iter()
        .enumerate()
        .find_map(|(index, name)| {
            parse_timestamp_in_csv_header(name).map(|scale| (index, scale))
        })
        .ok_or_else(|| {
            BinlogError::SchemaInvalid(format!(
                "no timestamp column found in {}",
                csv_path.display()
            ))
        })?;
    info!(
        "Timestamp column found: index {} [name][{}] [scale][{}]",
        timestamp_index, header[timestamp_index], timestamp_scale
    );

    // Group the remaining columns into packages by the name part before '/'.
    let mut column_groups: BTreeMap<String, Vec<(String, usize)>> = BTreeMap::new();
    for (index, column) in header.iter().enumerate() {
        if index == timestamp_index {
            continue;
        }
        let (package_name, item_name) = match column.split_once('/') {
            Some((prefix, suffix)) => (prefix, suffix),
            None => ("default_package", column.as_str()),
        };
        if item_name.is_empty() {
            continue;
        }
        column_groups
            .entry(package_name.to_string())
            .or_default()
            .push((item_name.to_string(), index));
    }
    for (package_name, columns) in &column_groups {
        info!(
            ">> Package [name][{}] [id][{}]",
            package_name, columns[0].1
        );
        for (item_name, index) in columns {
            info!("   - Item [name][{}] [col index][{}]", item_name, index);
        }
    }

    let mut recorder = BinlogEncoder::new();
    recorder.create_log_file(log_path)?;
    for (package_name, columns) in &column_groups {
        recorder.register_package(PackageInfo::new(
            columns[0].1 as u16,
            package_name,
            infer_package_items(columns),
        ))?;
    }
    recorder.prepare_for_recording()?;

    // Stream the data rows.
    let mut time_stamp_offset_s = None;
    let mut payload = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let values: Option<Vec<f64>> = line
            .split(',')
            .map(|field| field.trim())
            .filter(|field| !field.is_empty())
            .map(|field| field.parse::<f64>().ok())
            .collect();
        let Some(values) = values else {
            warn!("skipping csv row with a non-numeric field: {}", line);
            continue;
        };
        if values.len() != header.len() {
            warn!(
                "skipping csv row with {} fields, header has {}",
                values.len(),
                header.len()
            );
            continue;
        }

        let raw_timestamp = values[timestamp_index];
        let offset = *time_stamp_offset_s.get_or_insert(raw_timestamp);
        let timestamp_s = ((raw_timestamp - offset) * timestamp_scale) as f32;

        for columns in column_groups.values() {
            payload.clear();
            for (_, index) in columns {
                payload.write_f32::<LittleEndian>(values[*index] as f32)?;
            }
            recorder.record_package(columns[0].1 as u16, &payload, Some(timestamp_s))?;
        }
    }

    Ok(())
}

/// Detects a timestamp column and its unit scale to seconds.
///
/// The exact names `timestamp` and `time_stamp` mean microseconds. Otherwise
/// a name containing either of those words is matched against the unit
/// suffix list, as are the short forms `t` and `time` plus a unit suffix.
/// Exact match stays ahead of suffix match so a column named `timestamp_s`
/// is not mis-scaled.
fn parse_timestamp_in_csv_header(name: &str) -> Option<f64> {
    if name == "timestamp" || name == "time_stamp" {
        return Some(1e-6);
    }
    let is_timestamp_word = name.contains("timestamp") || name.contains("time_stamp");
    for (suffix, scale) in TIMESTAMP_SUFFIXES {
        if !name.ends_with(suffix) {
            continue;
        }
        let stem = &name[..name.len() - suffix.len()];
        if is_timestamp_word || stem == "t" || stem == "time" {
            return Some(scale);
        }
    }
    None
}

/// Folds a package's columns into items.
///
/// Seven consecutive columns ending in `x,y,z,w,x,y,z` with the first
/// starting `p_` and the fourth `q_` become one pose6dof; three consecutive
/// columns ending in `x,y,z` become one vector3; every other column is a
/// float.
fn infer_package_items(columns: &[(String, usize)]) -> Vec<PackageItemInfo> {
    let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
    let mut items = Vec::new();
    let mut index = 0;
    while index < names.len() {
        if index + 7 <= names.len()
            && ends_with_axes(&names[index..index + 7], &["x", "y", "z", "w", "x", "y", "z"])
            && names[index].starts_with("p_")
            && names[index + 3].starts_with("q_")
        {
            items.push(PackageItemInfo::new(
                ItemType::Pose6Dof,
                &pose_item_name(names[index]),
            ));
            index += 7;
            continue;
        }
        if index + 3 <= names.len() && ends_with_axes(&names[index..index + 3], &["x", "y", "z"]) {
            items.push(PackageItemInfo::new(
                ItemType::Vector3,
                &vector_item_name(names[index]),
            ));
            index += 3;
            continue;
        }
        items.push(PackageItemInfo::new(ItemType::Float, names[index]));
        index += 1;
    }
    items
}

fn ends_with_axes(names: &[&str], axes: &[&str]) -> bool {
    names
        .iter()
        .zip(axes)
        .all(|(name, axis)| name.ends_with(axis))
}

/// Names a pose item from its first column: the trailing axis token is
/// stripped and a leading `p_` becomes `T_`.
fn pose_item_name(first_column: &str) -> String {
    if first_column.len() <= 2 {
        return "Transform".to_string();
    }
    let stripped = strip_axis_token(first_column);
    stripped.replacen("p_", "T_", 1)
}

/// Names a vector item from its first column by stripping the trailing axis
/// token.
fn vector_item_name(first_column: &str) -> String {
    if first_column.len() <= 2 {
        return "vector3".to_string();
    }
    strip_axis_token(first_column)
}

/// Drops the final axis character and, when present, the `_` before it.
fn strip_axis_token(name: &str) -> String {
    let bytes = name.as_bytes();
    if bytes[bytes.len() - 2] == b'_' {
        name[..name.len() - 2].to_string()
    } else {
        name[..name.len() - 1].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_timestamp_name_means_microseconds() {
        assert_eq!(parse_timestamp_in_csv_header("timestamp"), Some(1e-6));
        assert_eq!(parse_timestamp_in_csv_header("time_stamp"), Some(1e-6));
    }

    #[test]
    fn timestamp_suffix_selects_scale() {
        assert_eq!(parse_timestamp_in_csv_header("timestamp_s"), Some(1.0));
        assert_eq!(parse_timestamp_in_csv_header("timestamp_ns"), Some(1e-9));
        assert_eq!(parse_timestamp_in_csv_header("time_stamp_us"), Some(1e-6));
        assert_eq!(parse_timestamp_in_csv_header("timestamp_ms"), Some(1e-3));
        assert_eq!(parse_timestamp_in_csv_header("timestamp[ns]"), Some(1e-9));
        assert_eq!(parse_timestamp_in_csv_header("t_s"), Some(1.0));
        assert_eq!(parse_timestamp_in_csv_header("t_us"), Some(1e-6));
        assert_eq!(parse_timestamp_in_csv_header("time[ms]"), Some(1e-3));
        assert_eq!(parse_timestamp_in_csv_header("gyro_x"), None);
        assert_eq!(parse_timestamp_in_csv_header("t_of_frame"), None);
        assert_eq!(parse_timestamp_in_csv_header("timestamp_of_frame"), None);
    }

    fn columns(names: &[&str]) -> Vec<(String, usize)> {
        names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.to_string(), index + 1))
            .collect()
    }

    #[test]
    fn folds_pose_columns_into_pose6dof() {
        let items = infer_package_items(&columns(&[
            "p_x", "p_y", "p_z", "q_w", "q_x", "q_y", "q_z",
        ]));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_type, ItemType::Pose6Dof);
    }

    #[test]
    fn folds_axis_columns_into_vector3() {
        let items = infer_package_items(&columns(&["v_x", "v_y", "v_z"]));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_type, ItemType::Vector3);
        assert_eq!(items[0].name, "v");
    }

    #[test]
    fn plain_columns_become_floats() {
        let items = infer_package_items(&columns(&["a", "b"]));
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.item_type == ItemType::Float));
        assert_eq!(items[0].name, "a");
        assert_eq!(items[1].name, "b");
    }

    #[test]
    fn mixes_composites_and_floats() {
        let items = infer_package_items(&columns(&[
            "temp", "vel_x", "vel_y", "vel_z", "p_x", "p_y", "p_z", "q_w", "q_x", "q_y", "q_z",
        ]));
        let types: Vec<ItemType> = items.iter().map(|item| item.item_type).collect();
        assert_eq!(
            types,
            vec![ItemType::Float, ItemType::Vector3, ItemType::Pose6Dof]
        );
        assert_eq!(items[1].name, "vel");
    }
}
