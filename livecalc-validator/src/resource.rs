//! Bus resource catalog extraction and size-spec parsing.

use crate::error::ConfigError;

/// Element type backing a bus resource. `F64` is the default when a size
/// spec names no type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ElementType {
    F64,
    F32,
    I64,
    U64,
    I32,
    U32,
    I16,
    U16,
    I8,
    U8,
}

impl ElementType {
    pub fn element_size(self) -> usize {
        match self {
            ElementType::F64 | ElementType::I64 | ElementType::U64 => 8,
            ElementType::F32 | ElementType::I32 | ElementType::U32 => 4,
            ElementType::I16 | ElementType::U16 => 2,
            ElementType::I8 | ElementType::U8 => 1,
        }
    }

    fn parse(name: &str) -> Option<ElementType> {
        match name {
            "f64" => Some(ElementType::F64),
            "f32" => Some(ElementType::F32),
            "i64" => Some(ElementType::I64),
            "u64" => Some(ElementType::U64),
            "i32" => Some(ElementType::I32),
            "u32" => Some(ElementType::U32),
            "i16" => Some(ElementType::I16),
            "u16" => Some(ElementType::U16),
            "i8" => Some(ElementType::I8),
            "u8" => Some(ElementType::U8),
            _ => None,
        }
    }
}

/// A bus resource as it will be laid out in shared memory: one producer,
/// zero or more consumers, sized in elements and bytes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BusResourceDescriptor {
    pub name: String,
    pub element_type: ElementType,
    pub element_count: u64,
    /// Raw payload size before 16-byte alignment padding.
    pub size_bytes: u64,
    pub producer: String,
    pub consumers: Vec<String>,
}

const ALIGNMENT: u64 = 16;

fn align_up(n: u64, align: u64) -> u64 {
    (n + align - 1) / align * align
}

/// Parse a size spec in one of three grammars:
///   - `"<count>:<type>"`  e.g. `"4096:f32"` — explicit element count and type.
///   - `"<N><unit>"`       e.g. `"80KB"`     — a byte budget for `f64` elements,
///                          converted to an element count by dividing by 8 and
///                          rounding up.
///   - `"<N>"`             e.g. `"10000"`    — a plain `f64` element count.
pub fn parse_size_spec(spec: &str) -> Result<(ElementType, u64), String> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err("empty size spec".to_string());
    }

    if let Some((count_part, type_part)) = spec.split_once(':') {
        let count: u64 = count_part
            .parse()
            .map_err(|_| format!("{count_part:?} is not a positive integer count"))?;
        if count == 0 {
            return Err("element count must be positive".to_string());
        }
        let element_type = ElementType::parse(type_part)
            .ok_or_else(|| format!("unknown element type {type_part:?}"))?;
        return Ok((element_type, count));
    }

    for (suffix, multiplier) in [("GB", 1u64 << 30), ("MB", 1u64 << 20), ("KB", 1u64 << 10)] {
        if let Some(digits) = spec.strip_suffix(suffix) {
            let n: u64 = digits
                .parse()
                .map_err(|_| format!("{digits:?} is not a positive integer"))?;
            if n == 0 {
                return Err("byte budget must be positive".to_string());
            }
            let total_bytes = n
                .checked_mul(multiplier)
                .ok_or_else(|| "byte budget overflows u64".to_string())?;
            let element_size = ElementType::F64.element_size() as u64;
            let element_count = (total_bytes + element_size - 1) / element_size;
            return Ok((ElementType::F64, element_count.max(1)));
        }
    }

    if let Some(digits) = spec.strip_suffix("bytes") {
        let total_bytes: u64 = digits
            .parse()
            .map_err(|_| format!("{digits:?} is not a positive integer"))?;
        if total_bytes == 0 {
            return Err("byte budget must be positive".to_string());
        }
        let element_size = ElementType::F64.element_size() as u64;
        let element_count = (total_bytes + element_size - 1) / element_size;
        return Ok((ElementType::F64, element_count.max(1)));
    }

    let count: u64 = spec
        .parse()
        .map_err(|_| format!("{spec:?} is not a recognized size spec"))?;
    if count == 0 {
        return Err("element count must be positive".to_string());
    }
    Ok((ElementType::F64, count))
}

/// Resolve the size spec for a node's output, honoring a `<resource>_size`
/// key in the node's `config` map and falling back to `10000:f64`.
pub fn resolve_size_spec(
    node_id: &str,
    resource_name: &str,
    config: &std::collections::HashMap<String, serde_json::Value>,
) -> Result<(ElementType, u64), ConfigError> {
    let key = format!("{resource_name}_size");
    let spec = match config.get(&key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(ConfigError::InvalidSizeSpec {
                node: node_id.to_string(),
                key,
                spec: other.to_string(),
                reason: "size spec must be a string".to_string(),
            })
        }
        None => "10000:f64".to_string(),
    };
    parse_size_spec(&spec).map_err(|reason| ConfigError::InvalidSizeSpec {
        node: node_id.to_string(),
        key,
        spec,
        reason,
    })
}

/// Compute the 16-byte-aligned payload size in bytes for an element count/type.
pub fn aligned_size_bytes(element_type: ElementType, element_count: u64) -> u64 {
    align_up(element_count * element_type.element_size() as u64, ALIGNMENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_explicit_count_and_type() {
        assert_eq!(
            parse_size_spec("4096:f32").unwrap(),
            (ElementType::F32, 4096)
        );
    }

    #[test]
    fn parses_plain_count_as_f64() {
        assert_eq!(parse_size_spec("10000").unwrap(), (ElementType::F64, 10000));
    }

    #[test]
    fn parses_byte_budget_dividing_by_f64_width() {
        let (ty, count) = parse_size_spec("80KB").unwrap();
        assert_eq!(ty, ElementType::F64);
        assert_eq!(count, (80 * 1024) / 8);
    }

    #[test]
    fn rejects_zero_count() {
        assert!(parse_size_spec("0:f64").is_err());
        assert!(parse_size_spec("0").is_err());
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(parse_size_spec("10:decimal128").is_err());
    }

    #[test]
    fn alignment_rounds_up_to_sixteen_bytes() {
        // 3 f32 elements = 12 bytes, rounds up to 16.
        assert_eq!(aligned_size_bytes(ElementType::F32, 3), 16);
        // 4 f32 elements = 16 bytes exactly, no padding needed.
        assert_eq!(aligned_size_bytes(ElementType::F32, 4), 16);
    }

    proptest! {
        #[test]
        fn explicit_count_type_roundtrips(count in 1u64..1_000_000, ty in 0u8..10) {
            let type_name = match ty {
                0 => "f64", 1 => "f32", 2 => "i64", 3 => "u64", 4 => "i32",
                5 => "u32", 6 => "i16", 7 => "u16", 8 => "i8", _ => "u8",
            };
            let spec = format!("{count}:{type_name}");
            let (_, parsed_count) = parse_size_spec(&spec).unwrap();
            prop_assert_eq!(parsed_count, count);
        }

        #[test]
        fn byte_budgets_never_panic(n in 1u64..10_000) {
            let spec = format!("{n}KB");
            prop_assert!(parse_size_spec(&spec).is_ok());
        }
    }
}
