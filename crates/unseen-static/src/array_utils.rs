//! Byte-buffer comparison and slicing primitives used to inspect packed calldata.

/// Byte-for-byte equality, lengths included.
pub fn array_eq(a: &[u8], b: &[u8]) -> bool {
	a.len() == b.len() && a == b
}

/// Returns `len` bytes starting at `start`, or `None` if the range runs past the end.
pub fn array_slice(data: &[u8], start: usize, len: usize) -> Option<&[u8]> {
	let end = start.checked_add(len)?;
	data.get(start..end)
}

/// The first `n` bytes.
pub fn array_take(data: &[u8], n: usize) -> Option<&[u8]> {
	data.get(..n)
}

/// Everything after the first `n` bytes.
pub fn array_drop(data: &[u8], n: usize) -> Option<&[u8]> {
	data.get(n..)
}
