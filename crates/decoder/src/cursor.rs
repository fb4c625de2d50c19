//! Position tracking within one input chunk.

/// Tracks consumed and remaining bytes of a single chunk.
///
/// Lives for one `decode` call. Carries no state between calls.
#[derive(Clone, Debug)]
pub struct BitstreamCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BitstreamCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes from the cursor to the end of the chunk.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    /// Advance by up to `count` bytes, returning how far the cursor moved.
    ///
    /// Never moves past the end of the chunk.
    pub fn advance(&mut self, count: usize) -> usize {
        let step = count.min(self.data.len() - self.position);
        self.position += step;
        step
    }

    pub fn consumed(&self) -> usize {
        self.position
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.data.len()
    }
}
