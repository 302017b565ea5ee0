//! Typed views over raw bus resource bytes, used by engine adapters that
//! speak numeric arrays rather than raw bytes (currently only the script
//! engine; the native engine moves bytes directly into guest memory).

use crate::error::AdapterError;

pub fn as_f64(bytes: &[u8], resource: &str) -> Result<&[f64], AdapterError> {
    if bytes.len() % 8 != 0 {
        return Err(AdapterError::Misaligned(resource.to_string()));
    }
    // SAFETY: the shared region backs every resource with a 16-byte aligned
    // allocation, which satisfies f64's 8-byte alignment requirement.
    Ok(unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const f64, bytes.len() / 8) })
}

pub fn as_f64_mut(bytes: &mut [u8], resource: &str) -> Result<&mut [f64], AdapterError> {
    if bytes.len() % 8 != 0 {
        return Err(AdapterError::Misaligned(resource.to_string()));
    }
    Ok(unsafe { std::slice::from_raw_parts_mut(bytes.as_mut_ptr() as *mut f64, bytes.len() / 8) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_reinterpret_bytes_as_f64() {
        let mut bytes = [0u8; 16];
        as_f64_mut(&mut bytes, "r").unwrap()[0] = 3.5;
        assert_eq!(as_f64(&bytes, "r").unwrap()[0], 3.5);
    }

    #[test]
    fn misaligned_length_is_rejected() {
        let bytes = [0u8; 7];
        assert!(as_f64(&bytes, "r").is_err());
    }
}
