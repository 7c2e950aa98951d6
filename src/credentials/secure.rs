//! Best-effort zeroing of secrets held in memory.

/// Overwrite a `String`'s bytes with zeros, then truncate it.
///
/// Volatile writes keep the compiler from eliding the clear. Copies left
/// behind by earlier reallocations are out of reach.
pub(crate) fn zeroize_string(s: &mut String) {
    // SAFETY: only zero bytes are written, which are valid single-byte UTF-8,
    // and the string is cleared immediately afterwards.
    let bytes = unsafe { s.as_mut_vec() };
    for byte in bytes.iter_mut() {
        // SAFETY: `byte` is a valid, aligned reference into the Vec's buffer.
        unsafe {
            std::ptr::write_volatile(byte, 0);
        }
    }
    s.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroize_string_zeros_buffer() {
        let mut s = String::from("sk-deepseek-0123456789");
        let ptr = s.as_ptr();
        let len = s.len();

        zeroize_string(&mut s);

        assert!(s.is_empty());
        assert!(s.capacity() >= len);
        for i in 0..len {
            // SAFETY: the allocation is still owned and `i < len <= capacity`.
            let byte = unsafe { *ptr.add(i) };
            assert_eq!(byte, 0, "byte at offset {i} was not zeroed");
        }
    }

    #[test]
    fn zeroize_empty_string() {
        let mut s = String::new();
        zeroize_string(&mut s);
        assert!(s.is_empty());
    }
}
