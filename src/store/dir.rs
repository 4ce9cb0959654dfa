//! Property directory encoding.
//!
//! A compound property's children are described entirely inside the
//! parent node's flat attribute namespace: each child publishes a cluster
//! of suffixed keys that together encode one [`PropertyHeader`]. This is
//! what lets a single flat key/value namespace represent an arbitrarily
//! nested tree.
//!
//! Per child property `name`:
//!
//! - `name.info` - kind plus element type, e.g. `array float32_t[3]` or
//!   `compound`. Required, exactly one per child.
//! - `name.meta` - serialized [`MetaData`]. Optional.
//! - `name.time` - decimal time sampling registry index. Optional,
//!   Scalar/Array only.
//!
//! The suffix is everything after the LAST dot, so property names may
//! themselves contain dots. Any other suffix, or a cluster without its
//! `info` key, is a [`Error::MalformedDirectory`].

use crate::core::{MetaData, PropertyHeader, PropertyType};
use crate::store::AttrValue;
use crate::util::{DataType, Error, Result};

/// Suffix of the required kind/type key.
pub const INFO_SUFFIX: &str = "info";
/// Suffix of the optional metadata key.
pub const META_SUFFIX: &str = "meta";
/// Suffix of the optional time sampling index key.
pub const TIME_SUFFIX: &str = "time";

/// Encode one property header as its attribute key cluster.
///
/// Empty metadata and the default time sampling index are omitted, so a
/// minimal property costs a single key.
pub fn encode_header(header: &PropertyHeader) -> Vec<(String, AttrValue)> {
    let mut attrs = Vec::with_capacity(3);

    let info = match header.property_type {
        PropertyType::Compound => PropertyType::Compound.name().to_string(),
        kind => format!("{} {}", kind.name(), header.data_type),
    };
    attrs.push((format!("{}.{}", header.name, INFO_SUFFIX), info.into()));

    if !header.meta_data.is_empty() {
        attrs.push((
            format!("{}.{}", header.name, META_SUFFIX),
            header.meta_data.serialize().into(),
        ));
    }
    if header.time_sampling_index != 0 && header.property_type != PropertyType::Compound {
        attrs.push((
            format!("{}.{}", header.name, TIME_SUFFIX),
            header.time_sampling_index.to_string().into(),
        ));
    }
    attrs
}

/// Decode a compound node's attribute namespace into its ordered child
/// header list.
///
/// Children appear in the order their first key appears in the namespace.
pub fn decode_directory(attrs: &[(String, AttrValue)]) -> Result<Vec<PropertyHeader>> {
    // Gather clusters by name prefix, preserving first-seen order.
    let mut order: Vec<String> = Vec::new();
    let mut clusters: Vec<(Option<String>, Option<String>, Option<String>)> = Vec::new();

    for (key, value) in attrs {
        let (name, suffix) = key.rsplit_once('.').ok_or_else(|| {
            Error::malformed(format!("attribute key '{}' has no suffix", key))
        })?;
        if name.is_empty() {
            return Err(Error::malformed(format!(
                "attribute key '{}' has an empty property name",
                key
            )));
        }
        let slot = match order.iter().position(|n| n == name) {
            Some(i) => &mut clusters[i],
            None => {
                order.push(name.to_string());
                clusters.push((None, None, None));
                let last = clusters.len() - 1;
                &mut clusters[last]
            }
        };
        let text = value.as_str().ok_or_else(|| {
            Error::malformed(format!("attribute '{}' is not a string", key))
        })?;
        match suffix {
            INFO_SUFFIX => slot.0 = Some(text.to_string()),
            META_SUFFIX => slot.1 = Some(text.to_string()),
            TIME_SUFFIX => slot.2 = Some(text.to_string()),
            other => {
                return Err(Error::malformed(format!(
                    "unrecognized attribute suffix '{}' on '{}'",
                    other, key
                )))
            }
        }
    }

    let mut headers = Vec::with_capacity(order.len());
    for (name, (info, meta, time)) in order.into_iter().zip(clusters) {
        let info = info.ok_or_else(|| {
            Error::malformed(format!("property '{}' has no info key", name))
        })?;
        let mut header = decode_info(&name, &info)?;
        if let Some(meta) = meta {
            header.meta_data = MetaData::parse(&meta);
        }
        if let Some(time) = time {
            header.time_sampling_index = time.parse::<u32>().map_err(|_| {
                Error::malformed(format!(
                    "property '{}' has a non-numeric time sampling index '{}'",
                    name, time
                ))
            })?;
        }
        headers.push(header);
    }
    Ok(headers)
}

/// Decode one `info` value into a bare header.
fn decode_info(name: &str, info: &str) -> Result<PropertyHeader> {
    match info.split_once(' ') {
        None => {
            if PropertyType::from_name(info) == Some(PropertyType::Compound) {
                Ok(PropertyHeader::compound(name))
            } else {
                Err(Error::malformed(format!(
                    "property '{}' has an unrecognized kind '{}'",
                    name, info
                )))
            }
        }
        Some((kind, dtype)) => {
            let kind = PropertyType::from_name(kind).ok_or_else(|| {
                Error::malformed(format!(
                    "property '{}' has an unrecognized kind '{}'",
                    name, kind
                ))
            })?;
            let data_type = DataType::parse(dtype).ok_or_else(|| {
                Error::malformed(format!(
                    "property '{}' has an unrecognized data type '{}'",
                    name, dtype
                ))
            })?;
            let header = match kind {
                PropertyType::Scalar => PropertyHeader::scalar(name, data_type),
                PropertyType::Array => PropertyHeader::array(name, data_type),
                PropertyType::Compound => {
                    return Err(Error::malformed(format!(
                        "property '{}' declares a data type on a compound",
                        name
                    )))
                }
            };
            Ok(header)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MetaData;

    fn roundtrip(headers: &[PropertyHeader]) -> Vec<PropertyHeader> {
        let mut attrs = Vec::new();
        for h in headers {
            attrs.extend(encode_header(h));
        }
        decode_directory(&attrs).unwrap()
    }

    #[test]
    fn test_directory_roundtrip() {
        let mut meta = MetaData::new();
        meta.set("role", "positions");
        let headers = vec![
            PropertyHeader::array("P", DataType::VEC3F)
                .with_time_sampling(1)
                .with_meta_data(meta),
            PropertyHeader::scalar("visible", DataType::BOOL),
            PropertyHeader::compound("arbGeomParams"),
        ];
        assert_eq!(roundtrip(&headers), headers);
    }

    #[test]
    fn test_order_is_first_key_order() {
        let attrs = vec![
            ("b.info".to_string(), AttrValue::from("compound")),
            ("a.info".to_string(), AttrValue::from("scalar int32_t")),
        ];
        let names: Vec<String> = decode_directory(&attrs)
            .unwrap()
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn test_dotted_property_name() {
        let header = PropertyHeader::scalar("ns.user.speed", DataType::FLOAT64);
        assert_eq!(roundtrip(&[header.clone()]), vec![header]);
    }

    #[test]
    fn test_missing_info_is_malformed() {
        let attrs = vec![("P.meta".to_string(), AttrValue::from("a=1"))];
        assert!(matches!(
            decode_directory(&attrs),
            Err(Error::MalformedDirectory(_))
        ));
    }

    #[test]
    fn test_unknown_suffix_is_malformed() {
        let attrs = vec![
            ("P.info".to_string(), AttrValue::from("scalar int32_t")),
            ("P.shape".to_string(), AttrValue::from("weird")),
        ];
        assert!(matches!(
            decode_directory(&attrs),
            Err(Error::MalformedDirectory(_))
        ));
    }

    #[test]
    fn test_bad_info_values() {
        for info in ["blob", "scalar vec3", "compound float32_t"] {
            let attrs = vec![("x.info".to_string(), AttrValue::from(info))];
            assert!(
                matches!(decode_directory(&attrs), Err(Error::MalformedDirectory(_))),
                "info '{}' should be rejected",
                info
            );
        }
    }
}
