//! Register map of the ramp synthesizer
//!
//! Which register bits hold which field is data, not code: each field is a
//! list of slices, and `RegisterImage::insert` walks the list.

/// Contiguous run of field bits stored in one register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    /// Register address, relative to the block base
    pub register: usize,
    /// Lowest register bit used
    pub register_lsb: u32,
    /// Lowest field bit stored here
    pub field_lsb: u32,
    /// Number of bits
    pub width: u32,
}

impl Slice {
    pub const fn new(register: usize, register_lsb: u32, field_lsb: u32, width: u32) -> Self {
        Self {
            register,
            register_lsb,
            field_lsb,
            width,
        }
    }

    /// Whole register holding field bits `field_lsb .. field_lsb + 8`
    pub const fn byte(register: usize, field_lsb: u32) -> Self {
        Self::new(register, 0, field_lsb, 8)
    }
}

/// Slices making up one named field
#[derive(Debug, Clone, Copy)]
pub struct FieldLayout {
    pub name: &'static str,
    pub slices: &'static [Slice],
}

impl FieldLayout {
    /// Bits allocated to the field
    pub fn capacity(&self) -> u32 {
        self.slices.iter().map(|s| s.width).sum()
    }
}

/// Repeating register block (one per ramp)
#[derive(Debug, Clone, Copy)]
pub struct RegisterLayout {
    /// Address of block 0
    pub base: usize,
    /// Registers per block
    pub stride: usize,
    pub fields: &'static [FieldLayout],
}

impl RegisterLayout {
    /// First register of block `index`
    pub fn block_base(&self, index: usize) -> usize {
        self.base + index * self.stride
    }

    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Total registers of the device
pub const NUM_REGISTERS: usize = 142;

/// Software reset register and value
pub const RESET_REGISTER: usize = 2;
pub const RESET_VALUE: u8 = 0b0000_0100;

/// Ramp control register
pub const RAMP_CONTROL_REGISTER: usize = 58;
/// Ramp control with RAMP_EN set
pub const RAMP_ENABLE: u8 = 0b0010_0001;
/// Ramp control with RAMP_EN cleared
pub const RAMP_DISABLE: u8 = 0b0010_0000;

/// Ramp 0..7 blocks, R86..R141
pub const RAMP_LAYOUT: RegisterLayout = RegisterLayout {
    base: 86,
    stride: 7,
    fields: &[
        FieldLayout {
            name: "increment",
            slices: &[
                Slice::byte(0, 0),
                Slice::byte(1, 8),
                Slice::byte(2, 16),
                Slice::new(3, 0, 24, 6),
            ],
        },
        FieldLayout {
            name: "flag",
            slices: &[Slice::new(3, 6, 0, 1)],
        },
        FieldLayout {
            name: "doubler",
            slices: &[Slice::new(3, 7, 0, 1)],
        },
        FieldLayout {
            name: "length",
            slices: &[Slice::byte(4, 0), Slice::byte(5, 8)],
        },
        FieldLayout {
            name: "next_trigger_reset",
            slices: &[Slice::byte(6, 0)],
        },
    ],
};

/// Fractional numerator, R19..R21
pub const FRAC_NUM_LAYOUT: FieldLayout = FieldLayout {
    name: "frac_num",
    slices: &[Slice::byte(19, 0), Slice::byte(20, 8), Slice::byte(21, 16)],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_blocks_fit_register_file() {
        let last = RAMP_LAYOUT.block_base(7) + RAMP_LAYOUT.stride - 1;
        assert_eq!(last, NUM_REGISTERS - 1);
    }

    #[test]
    fn test_field_capacities() {
        let capacity = |name: &str| RAMP_LAYOUT.field(name).unwrap().capacity();
        assert_eq!(capacity("increment"), 30);
        assert_eq!(capacity("length"), 16);
        assert_eq!(capacity("next_trigger_reset"), 8);
        assert_eq!(capacity("flag"), 1);
        assert_eq!(FRAC_NUM_LAYOUT.capacity(), 24);
    }

    #[test]
    fn test_slices_do_not_overlap() {
        let mut used = [0u8; 7];
        for field in RAMP_LAYOUT.fields {
            for slice in field.slices {
                let mask = (((1u16 << slice.width) - 1) << slice.register_lsb) as u8;
                assert_eq!(used[slice.register] & mask, 0, "{} overlaps", field.name);
                used[slice.register] |= mask;
            }
        }
        assert_eq!(used, [0xFF; 7]);
    }
}
