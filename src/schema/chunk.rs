/// Iterator adapter yielding `Vec`s of up to `size` items.
///
/// A size of `0` yields everything as a single chunk. An empty source yields
/// no chunks at all.
#[derive(Debug, Clone)]
pub struct Chunks<I> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Iterator for Chunks<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chunk = Vec::with_capacity(self.size.min(1024));
        for item in self.inner.by_ref() {
            chunk.push(item);
            if self.size > 0 && chunk.len() == self.size {
                break;
            }
        }
        (!chunk.is_empty()).then_some(chunk)
    }
}

pub trait ChunkExt: Iterator + Sized {
    fn chunked(self, size: usize) -> Chunks<Self> {
        Chunks { inner: self, size }
    }
}

impl<I: Iterator> ChunkExt for I {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_and_uneven_chunks() {
        let chunks: Vec<_> = (1..=5).chunked(2).collect();
        assert_eq!(chunks, vec![vec![1, 2], vec![3, 4], vec![5]]);

        let chunks: Vec<_> = (1..=4).chunked(2).collect();
        assert_eq!(chunks, vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_zero_size_is_one_chunk() {
        let chunks: Vec<_> = (1..=3).chunked(0).collect();
        assert_eq!(chunks, vec![vec![1, 2, 3]]);
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(std::iter::empty::<u8>().chunked(3).count(), 0);
    }
}
