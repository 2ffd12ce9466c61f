use serde_json::{json, Map, Value};

use crate::model::{Capability, InterfaceMap, MappingError};

/// Typed reads over one object's interface map.
///
/// A property that is absent (or null) reads as `None` and is simply left out
/// of the output. A property that is present with the wrong type is a
/// `MappingError`, which fails the whole member.
#[derive(Debug, Clone, Copy)]
pub struct PropertyReader<'a> {
    interfaces: &'a InterfaceMap,
}

impl<'a> PropertyReader<'a> {
    pub fn new(interfaces: &'a InterfaceMap) -> Self {
        Self { interfaces }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.interfaces.contains_key(capability.interface())
    }

    fn raw(&self, capability: Capability, property: &str) -> Option<&'a Value> {
        self.interfaces
            .get(capability.interface())?
            .get(property)
            .filter(|value| !value.is_null())
    }

    fn typed<T>(
        &self,
        capability: Capability,
        property: &str,
        expected: &'static str,
        convert: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<Option<T>, MappingError> {
        match self.raw(capability, property) {
            None => Ok(None),
            Some(value) => convert(value)
                .map(Some)
                .ok_or_else(|| MappingError::malformed(capability.interface(), property, expected)),
        }
    }

    pub fn string(&self, capability: Capability, property: &str) -> Result<Option<&'a str>, MappingError> {
        self.typed(capability, property, "a string", Value::as_str)
    }

    pub fn bool(&self, capability: Capability, property: &str) -> Result<Option<bool>, MappingError> {
        self.typed(capability, property, "a boolean", Value::as_bool)
    }

    pub fn u64(&self, capability: Capability, property: &str) -> Result<Option<u64>, MappingError> {
        self.typed(capability, property, "an unsigned integer", Value::as_u64)
    }

    pub fn f64(&self, capability: Capability, property: &str) -> Result<Option<f64>, MappingError> {
        self.typed(capability, property, "a number", Value::as_f64)
    }

    pub fn list(&self, capability: Capability, property: &str) -> Result<Option<&'a [Value]>, MappingError> {
        self.typed(capability, property, "a list", |value| value.as_array().map(Vec::as_slice))
    }

    pub fn u64_list(&self, capability: Capability, property: &str) -> Result<Option<Vec<u64>>, MappingError> {
        self.typed(capability, property, "a list of unsigned integers", |value| {
            value.as_array()?.iter().map(Value::as_u64).collect()
        })
    }

    /// Non-empty string; empty strings read as absent.
    pub fn text(&self, capability: Capability, property: &str) -> Result<Option<&'a str>, MappingError> {
        Ok(self.string(capability, property)?.filter(|s| !s.is_empty()))
    }
}

/// Output object being built by a mapper.
#[derive(Debug, Default)]
pub struct Fields {
    map: Map<String, Value>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.map.insert(key.to_string(), value.into());
        self
    }

    pub fn set_opt<T: Into<Value>>(&mut self, key: &str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    /// Sets `outer.inner`, creating `outer` as needed.
    pub fn set_nested<T: Into<Value>>(&mut self, outer: &str, inner: &str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            let entry = self
                .map
                .entry(outer.to_string())
                .or_insert_with(|| json!({}));
            if let Some(object) = entry.as_object_mut() {
                object.insert(inner.to_string(), value.into());
            }
        }
        self
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.map
    }
}

/// `Status` from presence and functional state; both default to true when
/// the backend does not publish them.
pub fn status(reader: &PropertyReader<'_>) -> Result<Value, MappingError> {
    let present = reader.bool(Capability::Item, "Present")?.unwrap_or(true);
    let functional = reader
        .bool(Capability::OperationalStatus, "Functional")?
        .unwrap_or(true);
    Ok(json!({
        "State": if present { "Enabled" } else { "Absent" },
        "Health": if functional { "OK" } else { "Critical" },
    }))
}

/// Fields shared by every inventory item: name, asset data, location, status.
pub fn common_fields(reader: &PropertyReader<'_>, fields: &mut Fields) -> Result<(), MappingError> {
    fields.set_opt("Name", reader.text(Capability::Item, "PrettyName")?);
    fields.set_opt("Manufacturer", reader.text(Capability::Asset, "Manufacturer")?);
    fields.set_opt("Model", reader.text(Capability::Asset, "Model")?);
    fields.set_opt("PartNumber", reader.text(Capability::Asset, "PartNumber")?);
    fields.set_opt("SerialNumber", reader.text(Capability::Asset, "SerialNumber")?);
    fields.set_opt("SparePartNumber", reader.text(Capability::Asset, "SparePartNumber")?);
    if let Some(label) = reader.text(Capability::LocationCode, "LocationCode")? {
        fields.set("Location", json!({ "PartLocation": { "ServiceLabel": label } }));
    }
    fields.set("Status", status(reader)?);
    Ok(())
}

/// `0x`-prefixed, zero-padded hex as used for processor identification.
pub fn hex(value: u64, width: usize) -> String {
    format!("0x{:0width$X}", value, width = width)
}

/// Last dotted segment of a backend enumeration value, e.g.
/// `"xyz.openbmc_project.Inventory.Item.Drive.DriveType.SSD"` is `"SSD"`.
pub fn enum_suffix(value: &str) -> &str {
    value.rsplit('.').next().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interfaces(entries: &[(Capability, &str, Value)]) -> InterfaceMap {
        let mut map = InterfaceMap::new();
        for (capability, property, value) in entries {
            map.entry(capability.interface().to_string())
                .or_default()
                .insert(property.to_string(), value.clone());
        }
        map
    }

    #[test]
    fn test_missing_and_null_read_as_absent() {
        let map = interfaces(&[(Capability::Cpu, "Socket", Value::Null)]);
        let reader = PropertyReader::new(&map);
        assert_eq!(reader.string(Capability::Cpu, "Socket").unwrap(), None);
        assert_eq!(reader.u64(Capability::Cpu, "CoreCount").unwrap(), None);
        assert!(reader.has(Capability::Cpu));
        assert!(!reader.has(Capability::Dimm));
    }

    #[test]
    fn test_wrong_type_is_malformed() {
        let map = interfaces(&[(Capability::Cpu, "CoreCount", json!(-4))]);
        let err = PropertyReader::new(&map)
            .u64(Capability::Cpu, "CoreCount")
            .unwrap_err();
        assert_eq!(
            err,
            MappingError::malformed("xyz.openbmc_project.Inventory.Item.Cpu", "CoreCount", "an unsigned integer")
        );
    }

    #[test]
    fn test_list_readers() {
        let map = interfaces(&[
            (Capability::Dimm, "AllowedSpeedsMT", json!([2400, 3200])),
            (Capability::Dimm, "MemoryType", json!([1, "two"])),
        ]);
        let reader = PropertyReader::new(&map);
        assert_eq!(reader.u64_list(Capability::Dimm, "AllowedSpeedsMT").unwrap(), Some(vec![2400, 3200]));
        assert!(reader.u64_list(Capability::Dimm, "MemoryType").is_err());
        assert_eq!(reader.list(Capability::Dimm, "MemoryType").unwrap().map(<[Value]>::len), Some(2));
        assert!(reader.list(Capability::Dimm, "Missing").unwrap().is_none());
    }

    #[test]
    fn test_status_derivation() {
        let map = InterfaceMap::new();
        assert_eq!(
            status(&PropertyReader::new(&map)).unwrap(),
            json!({ "State": "Enabled", "Health": "OK" })
        );

        let map = interfaces(&[
            (Capability::Item, "Present", json!(false)),
            (Capability::OperationalStatus, "Functional", json!(false)),
        ]);
        assert_eq!(
            status(&PropertyReader::new(&map)).unwrap(),
            json!({ "State": "Absent", "Health": "Critical" })
        );
    }

    #[test]
    fn test_common_fields() {
        let map = interfaces(&[
            (Capability::Item, "PrettyName", json!("DIMM A0")),
            (Capability::Asset, "Manufacturer", json!("Micron")),
            (Capability::Asset, "Model", json!("")),
            (Capability::LocationCode, "LocationCode", json!("U78DA.ND0.1234-P0-C12")),
        ]);
        let mut fields = Fields::new();
        common_fields(&PropertyReader::new(&map), &mut fields).unwrap();
        let fields = fields.into_map();
        assert_eq!(fields["Name"], json!("DIMM A0"));
        assert_eq!(fields["Manufacturer"], json!("Micron"));
        assert!(!fields.contains_key("Model"));
        assert_eq!(fields["Location"]["PartLocation"]["ServiceLabel"], json!("U78DA.ND0.1234-P0-C12"));
    }

    #[test]
    fn test_formatting_helpers() {
        assert_eq!(hex(0x6b, 4), "0x006B");
        assert_eq!(enum_suffix("xyz.openbmc_project.Inventory.Item.Drive.DriveType.SSD"), "SSD");
        assert_eq!(enum_suffix("SSD"), "SSD");
    }
}
