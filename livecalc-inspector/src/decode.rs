//! Widen a bus resource's raw bytes to `f64` regardless of its declared
//! element type, so every inspection operation works uniformly.

use livecalc_validator::ElementType;

pub fn decode_elements(bytes: &[u8], element_type: ElementType) -> Vec<f64> {
    match element_type {
        ElementType::F64 => bytes.chunks_exact(8).map(|c| f64::from_le_bytes(c.try_into().unwrap())).collect(),
        ElementType::F32 => bytes.chunks_exact(4).map(|c| f32::from_le_bytes(c.try_into().unwrap()) as f64).collect(),
        ElementType::I64 => bytes.chunks_exact(8).map(|c| i64::from_le_bytes(c.try_into().unwrap()) as f64).collect(),
        ElementType::U64 => bytes.chunks_exact(8).map(|c| u64::from_le_bytes(c.try_into().unwrap()) as f64).collect(),
        ElementType::I32 => bytes.chunks_exact(4).map(|c| i32::from_le_bytes(c.try_into().unwrap()) as f64).collect(),
        ElementType::U32 => bytes.chunks_exact(4).map(|c| u32::from_le_bytes(c.try_into().unwrap()) as f64).collect(),
        ElementType::I16 => bytes.chunks_exact(2).map(|c| i16::from_le_bytes(c.try_into().unwrap()) as f64).collect(),
        ElementType::U16 => bytes.chunks_exact(2).map(|c| u16::from_le_bytes(c.try_into().unwrap()) as f64).collect(),
        ElementType::I8 => bytes.iter().map(|&b| b as i8 as f64).collect(),
        ElementType::U8 => bytes.iter().map(|&b| b as f64).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_f64_little_endian() {
        let bytes = 3.25f64.to_le_bytes();
        assert_eq!(decode_elements(&bytes, ElementType::F64), vec![3.25]);
    }

    #[test]
    fn decodes_u8_directly() {
        assert_eq!(decode_elements(&[1, 2, 3], ElementType::U8), vec![1.0, 2.0, 3.0]);
    }
}
