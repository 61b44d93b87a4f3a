/// A typed index into one of the dense maps. Implement it with
/// [`impl_index!`](crate::impl_index) on a newtype over an unsigned integer.
pub trait IndexRef: Copy + Eq {
    fn index(&self) -> usize;
    fn new(input: usize) -> Self;
}
