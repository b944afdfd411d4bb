/// Value stored in the tag of every header owned by a pool.
///
/// A header whose tag holds anything else has been corrupted. The check is a best-effort safety
/// net for catching memory corruption in diagnostics, not a replacement for handle discipline.
pub const VALID_SENTINEL: u32 = 0xBAAD_A555;

/// Metadata kept alongside each block of a pool.
///
/// Headers live in a separate array indexed by block index, so no payload write can ever reach
/// them - a payload is only exposed as a slice of exactly `block_size` bytes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct BlockHeader {
    pub(crate) tag: u32,

    /// The single source of truth for whether a block is held by a caller. The free stack only
    /// provides the reuse order.
    pub(crate) in_use: bool,

    /// Number of bytes the last holder claimed to have written. Never exceeds the block size.
    pub(crate) logical_size: usize,

    /// Index of the header constructed after this one, `None` for the last header.
    /// Only used to walk the pool in construction order, never for the free order.
    pub(crate) next: Option<usize>,
}

impl BlockHeader {
    #[must_use]
    pub(crate) fn new(next: Option<usize>) -> Self {
        Self {
            tag: VALID_SENTINEL,
            in_use: false,
            logical_size: 0,
            next,
        }
    }

    #[must_use]
    pub(crate) fn is_valid(&self) -> bool {
        self.tag == VALID_SENTINEL
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn new_header_is_valid_and_free() {
        let header = BlockHeader::new(Some(1));

        assert!(header.is_valid());
        assert!(!header.in_use);
        assert_eq!(header.logical_size, 0);
        assert_eq!(header.next, Some(1));
    }

    #[test]
    fn overwritten_tag_is_invalid() {
        let mut header = BlockHeader::new(None);
        header.tag = 0;

        assert!(!header.is_valid());
    }
}
