use std::fmt;

macro_rules! dense_index {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct $name(pub usize);

            impl $name {
                #[inline]
                pub fn get(self) -> usize {
                    self.0
                }
            }

            impl From<usize> for $name {
                fn from(value: usize) -> Self {
                    Self(value)
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

dense_index! {
    AtomIndex,
    ResidueIndex,
    ChainIndex,
    EntityIndex,
}
