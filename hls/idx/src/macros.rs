#[macro_export]
/// Implements [`IndexRef`](crate::IndexRef) for a newtype wrapping an
/// unsigned integer. The backing type defaults to [`u32`]; a different one
/// may be given as the second argument.
macro_rules! impl_index {
    ($struct_name: ident) => {
        $crate::impl_index!($struct_name, u32);
    };

    ($struct_name: ident, $backing_ty: ty) => {
        impl $crate::IndexRef for $struct_name {
            fn index(&self) -> usize {
                self.0 as usize
            }

            fn new(input: usize) -> Self {
                Self(input as $backing_ty)
            }
        }

        impl From<$backing_ty> for $struct_name {
            fn from(input: $backing_ty) -> Self {
                $struct_name(input)
            }
        }

        impl From<usize> for $struct_name {
            fn from(input: usize) -> Self {
                $crate::IndexRef::new(input)
            }
        }
    };
}
