use bitflags::bitflags;
use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString};

/// A single school of damage.
///
/// The discriminant is the index into per-school tables (resistances);
/// `Physical` shares its slot with armor.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    EnumCount,
    EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SpellSchool {
    Physical = 0,
    Holy = 1,
    Fire = 2,
    Nature = 3,
    Frost = 4,
    Shadow = 5,
    Arcane = 6,
}

impl SpellSchool {
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn mask(self) -> SpellSchoolMask {
        SpellSchoolMask::from_bits_truncate(1 << self as u8)
    }
}

bitflags! {
    /// Set of schools carried by a damage event or filtered by an effect.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct SpellSchoolMask: u8 {
        const NORMAL = 1 << 0;
        const HOLY   = 1 << 1;
        const FIRE   = 1 << 2;
        const NATURE = 1 << 3;
        const FROST  = 1 << 4;
        const SHADOW = 1 << 5;
        const ARCANE = 1 << 6;

        const MAGIC = Self::HOLY.bits()
            | Self::FIRE.bits()
            | Self::NATURE.bits()
            | Self::FROST.bits()
            | Self::SHADOW.bits()
            | Self::ARCANE.bits();
    }
}

impl SpellSchoolMask {
    /// Schools contained in this mask, lowest index first.
    pub fn schools(self) -> impl Iterator<Item = SpellSchool> {
        use strum::IntoEnumIterator;
        SpellSchool::iter().filter(move |school| self.contains(school.mask()))
    }

    pub fn is_physical_only(self) -> bool {
        self == Self::NORMAL
    }

    pub fn has_magic(self) -> bool {
        self.intersects(Self::MAGIC)
    }

    /// Interprets an effect's misc value as a school mask.
    pub fn from_misc(misc: i32) -> Self {
        Self::from_bits_truncate(misc as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn school_masks_round_trip_through_indices() {
        assert_eq!(SpellSchool::Frost.mask(), SpellSchoolMask::FROST);
        let mask = SpellSchoolMask::NORMAL | SpellSchoolMask::SHADOW;
        let schools: Vec<_> = mask.schools().collect();
        assert_eq!(schools, vec![SpellSchool::Physical, SpellSchool::Shadow]);
        assert!(mask.has_magic());
        assert!(!mask.is_physical_only());
    }
}
