use core::fmt::{Debug, Display, Formatter};

/// Little-endian field of a packed on-disk or in-firmware structure.
#[derive(Copy, Clone, Default, PartialEq)]
#[repr(transparent)]
pub(crate) struct Little<T: Copy>(T);

macro_rules! little {
    ($($type:ty),+) => {
        $(
            impl Little<$type> {
                #[inline]
                pub fn to_ne(self) -> $type {
                    <$type>::from_le(self.0)
                }
            }

            impl From<$type> for Little<$type> {
                #[inline]
                fn from(value: $type) -> Self {
                    Self(value.to_le())
                }
            }

            impl Debug for Little<$type> {
                fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
                    Debug::fmt(&self.to_ne(), f)
                }
            }

            impl Display for Little<$type> {
                fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
                    Display::fmt(&self.to_ne(), f)
                }
            }
        )+
    };
}

little!(u16, u32, u64);
