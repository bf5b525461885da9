use std::fmt::{Display, Formatter};
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Sub};

/// A set of readiness categories.
///
/// Used both for what a registration is interested in and for what actually fired.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Mask(u8);

impl Mask {
    /// No category.
    pub const NONE: Mask = Mask(0);

    /// The descriptor can be read without blocking.
    pub const READABLE: Mask = Mask(1);

    /// The descriptor can be written without blocking.
    pub const WRITABLE: Mask = Mask(1 << 1);

    /// An exceptional condition, such as out-of-band data.
    pub const EXCEPTION: Mask = Mask(1 << 2);

    /// Every category.
    pub const ALL: Mask = Mask(0b111);

    /// Builds a mask from raw bits, unknown bits are dropped.
    #[must_use]
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Mask(bits & Self::ALL.0)
    }

    /// The raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if no category is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every category of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Mask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if any category of `other` is set.
    #[must_use]
    pub const fn intersects(self, other: Mask) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for Mask {
    type Output = Mask;

    fn bitor(self, rhs: Self) -> Self::Output {
        Mask(self.0 | rhs.0)
    }
}

impl BitOrAssign for Mask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Mask {
    type Output = Mask;

    fn bitand(self, rhs: Self) -> Self::Output {
        Mask(self.0 & rhs.0)
    }
}

impl BitAndAssign for Mask {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Sub for Mask {
    type Output = Mask;

    fn sub(self, rhs: Self) -> Self::Output {
        Mask(self.0 & !rhs.0)
    }
}

impl Display for Mask {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut first = true;
        for (flag, name) in [
            (Mask::READABLE, "READABLE"),
            (Mask::WRITABLE, "WRITABLE"),
            (Mask::EXCEPTION, "EXCEPTION"),
        ] {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}
