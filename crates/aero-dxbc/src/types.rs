use core::fmt;

/// Set of vector components (`x`, `y`, `z`, `w` in bits 0..3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ComponentMask(u8);

impl ComponentMask {
    pub const EMPTY: Self = Self(0);
    pub const X: Self = Self(0b0001);
    pub const Y: Self = Self(0b0010);
    pub const Z: Self = Self(0b0100);
    pub const W: Self = Self(0b1000);
    pub const XY: Self = Self(0b0011);
    pub const XYZ: Self = Self(0b0111);
    pub const XYZW: Self = Self(0b1111);

    /// Builds a mask from the low four bits of `bits`.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0xf)
    }

    /// Builds a mask from per-component flags.
    pub const fn new(x: bool, y: bool, z: bool, w: bool) -> Self {
        Self((x as u8) | ((y as u8) << 1) | ((z as u8) << 2) | ((w as u8) << 3))
    }

    /// Mask covering the first `n` components (`n` is clamped to 4).
    pub const fn first_n(n: u32) -> Self {
        let n = if n > 4 { 4 } else { n };
        Self(((1u16 << n) - 1) as u8)
    }

    /// Mask holding only component `index` (0..=3).
    pub const fn select(index: u8) -> Self {
        Self(1 << (index & 3))
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether component `index` (0..=3) is set.
    pub const fn contains(self, index: u8) -> bool {
        index < 4 && self.0 & (1 << index) != 0
    }

    pub const fn component_count(self) -> u32 {
        self.0.count_ones()
    }

    /// Index of the lowest set component.
    pub fn first_component(self) -> Option<u8> {
        (self.0 != 0).then(|| self.0.trailing_zeros() as u8)
    }

    /// Set component indices in ascending order.
    pub fn components(self) -> impl Iterator<Item = u8> {
        (0u8..4).filter(move |&i| self.contains(i))
    }
}

impl fmt::Display for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in self.components() {
            f.write_str(COMPONENT_NAMES[i as usize])?;
        }
        Ok(())
    }
}

const COMPONENT_NAMES: [&str; 4] = ["x", "y", "z", "w"];

/// 4-component swizzle; entry `i` is the source component feeding component `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swizzle(pub [u8; 4]);

impl Swizzle {
    pub const XYZW: Self = Self([0, 1, 2, 3]);
    pub const XXXX: Self = Self([0, 0, 0, 0]);
    pub const YYYY: Self = Self([1, 1, 1, 1]);
    pub const ZZZZ: Self = Self([2, 2, 2, 2]);
    pub const WWWW: Self = Self([3, 3, 3, 3]);

    /// Decodes the packed 2-bit-per-component form used by operand tokens.
    pub const fn from_packed(packed: u8) -> Self {
        Self([packed & 3, (packed >> 2) & 3, (packed >> 4) & 3, (packed >> 6) & 3])
    }

    pub fn is_identity(self) -> bool {
        self == Self::XYZW
    }

    /// Source component feeding component `index`.
    pub fn get(self, index: u8) -> u8 {
        self.0[(index & 3) as usize]
    }
}

impl Default for Swizzle {
    fn default() -> Self {
        Self::XYZW
    }
}

impl fmt::Display for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0 {
            f.write_str(COMPONENT_NAMES[c as usize])?;
        }
        Ok(())
    }
}

/// Component selection mode of a 4-component operand (token bits 2..3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionMode {
    Mask,
    Swizzle,
    Select1,
    /// Value 3, undefined by the token format.
    Reserved,
}

impl SelectionMode {
    pub(crate) fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Self::Mask,
            1 => Self::Swizzle,
            2 => Self::Select1,
            _ => Self::Reserved,
        }
    }
}

/// Component count of an operand (token bits 0..1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentCount {
    Zero,
    One,
    Four,
    /// `N`-component operands; unused by SM4/SM5 shaders.
    N,
}

impl ComponentCount {
    pub(crate) fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Self::Zero,
            1 => Self::One,
            2 => Self::Four,
            _ => Self::N,
        }
    }

    /// Number of components, if fixed.
    pub fn count(self) -> Option<u32> {
        match self {
            Self::Zero => Some(0),
            Self::One => Some(1),
            Self::Four => Some(4),
            Self::N => None,
        }
    }
}

/// Component selection decoded from a 4-component operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentSelection {
    Mask(ComponentMask),
    Swizzle(Swizzle),
    Select1(u8),
}
