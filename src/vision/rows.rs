//! Row-wise iteration over image buffers.
//!
//! Every row of the blur, gradient and rectification passes depends only on
//! the (read-only) source, so rows are handed to rayon when the `parallel`
//! feature is enabled.

/// Call `f(y, row)` for every `row_len`-sized row of `buf`
pub(crate) fn for_each_row<T, F>(buf: &mut [T], row_len: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if row_len == 0 || buf.is_empty() {
        return;
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        buf.par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| f(y, row));
    }

    #[cfg(not(feature = "parallel"))]
    {
        buf.chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| f(y, row));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_see_their_index() {
        let mut buf = vec![0usize; 12];
        for_each_row(&mut buf, 4, |y, row| row.iter_mut().for_each(|v| *v = y));
        assert_eq!(buf, vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn test_zero_row_len_is_noop() {
        let mut buf = vec![7u8; 3];
        for_each_row(&mut buf, 0, |_, row| row.fill(0));
        assert_eq!(buf, vec![7, 7, 7]);
    }
}
