//! Headers describing objects and properties.

use super::MetaData;
use crate::util::DataType;

/// Header of an object in the hierarchy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectHeader {
    /// Name of this object (unique among siblings).
    pub name: String,
    /// Full path from the root, e.g. `/xform/shape`.
    pub full_name: String,
    /// Object metadata (including layering flags).
    pub meta_data: MetaData,
}

impl ObjectHeader {
    /// Create a new object header.
    pub fn new(name: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_name: full_name.into(),
            meta_data: MetaData::new(),
        }
    }

    /// Attach metadata.
    pub fn with_meta_data(mut self, meta_data: MetaData) -> Self {
        self.meta_data = meta_data;
        self
    }
}

/// Kind of a property.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PropertyType {
    /// Single fixed-extent value per sample.
    #[default]
    Scalar,
    /// Variable-length homogeneous buffer per sample.
    Array,
    /// Container of other properties; no samples of its own.
    Compound,
}

impl PropertyType {
    /// Stable textual name, as written by the directory encoding.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Array => "array",
            Self::Compound => "compound",
        }
    }

    /// Parse the textual name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "scalar" => Some(Self::Scalar),
            "array" => Some(Self::Array),
            "compound" => Some(Self::Compound),
            _ => None,
        }
    }
}

/// Header of a property.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyHeader {
    /// Name of this property (unique among siblings).
    pub name: String,
    /// Property kind.
    pub property_type: PropertyType,
    /// Element data type. Unused for compounds.
    pub data_type: DataType,
    /// Index into the archive's time sampling registry (0 = static).
    /// Unused for compounds.
    pub time_sampling_index: u32,
    /// Property metadata (including layering flags).
    pub meta_data: MetaData,
}

impl PropertyHeader {
    /// Create a scalar property header.
    pub fn scalar(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::Scalar,
            data_type,
            time_sampling_index: 0,
            meta_data: MetaData::new(),
        }
    }

    /// Create an array property header.
    pub fn array(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::Array,
            data_type,
            time_sampling_index: 0,
            meta_data: MetaData::new(),
        }
    }

    /// Create a compound property header.
    pub fn compound(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::Compound,
            data_type: DataType::UNKNOWN,
            time_sampling_index: 0,
            meta_data: MetaData::new(),
        }
    }

    /// Set the time sampling registry index.
    pub fn with_time_sampling(mut self, index: u32) -> Self {
        self.time_sampling_index = index;
        self
    }

    /// Attach metadata.
    pub fn with_meta_data(mut self, meta_data: MetaData) -> Self {
        self.meta_data = meta_data;
        self
    }

    /// Check if this is a scalar property.
    pub fn is_scalar(&self) -> bool {
        self.property_type == PropertyType::Scalar
    }

    /// Check if this is an array property.
    pub fn is_array(&self) -> bool {
        self.property_type == PropertyType::Array
    }

    /// Check if this is a compound property.
    pub fn is_compound(&self) -> bool {
        self.property_type == PropertyType::Compound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_header() {
        let header = ObjectHeader::new("shape", "/xform/shape");
        assert_eq!(header.name, "shape");
        assert_eq!(header.full_name, "/xform/shape");
    }

    #[test]
    fn test_property_headers() {
        let header = PropertyHeader::scalar("visible", DataType::BOOL);
        assert!(header.is_scalar());
        assert!(!header.is_compound());

        let header = PropertyHeader::array("P", DataType::VEC3F).with_time_sampling(2);
        assert!(header.is_array());
        assert_eq!(header.time_sampling_index, 2);

        let header = PropertyHeader::compound("group");
        assert!(header.is_compound());
    }

    #[test]
    fn test_type_names() {
        for pt in [PropertyType::Scalar, PropertyType::Array, PropertyType::Compound] {
            assert_eq!(PropertyType::from_name(pt.name()), Some(pt));
        }
        assert_eq!(PropertyType::from_name("blob"), None);
    }
}
