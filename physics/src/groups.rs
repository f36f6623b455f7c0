//! Collision group and surface category table.
//!
//! # Model
//! - A *group* is a single membership bit (`all`, `object`, `bumper`).
//! - A *category* is a semantic surface type (`floor`, `object`, `bumper`)
//!   packing a `(membership, filter)` pair into one `u32`:
//!   `(membership << 16) | filter`.
//! - Two colliders interact only if each one's membership bit is present in
//!   the other's filter.
//!
//! # Invariants
//! - Category codes are derived from the group table and never mutated per
//!   instance.
//! - The packed value round-trips: `membership = category >> 16`,
//!   `filter = category & 0xFFFF`.

use num_traits::{One, PrimInt, Zero};
use rapier3d::prelude::{Group, InteractionGroups, InteractionTestMode};

/// Trait implemented by flag enums whose discriminant is the bit index.
///
/// The backing integer type is chosen via the associated `Storage`.
pub trait FlagBitmask {
    type Storage: PrimInt;

    fn bit_index(&self) -> u8;

    fn mask(&self) -> Self::Storage {
        // Equivalent to: 1 << index
        // NOTE: Ensure your `bit_index()` is < number of bits in `Storage`.
        Self::Storage::one() << (self.bit_index() as usize)
    }
}

/// Combine a set of flags into a single mask.
#[inline]
pub fn mask_of<U: FlagBitmask + Copy>(flags: &[U]) -> U::Storage {
    flags
        .iter()
        .fold(U::Storage::zero(), |acc, f| acc | f.mask())
}

/// Collision groups of the world.
///
/// The numeric values are part of the packed category format. Do not reorder.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CollisionGroup {
    All = 0,
    Object = 1,
    Bumper = 2,
}

impl FlagBitmask for CollisionGroup {
    type Storage = u16;

    fn bit_index(&self) -> u8 {
        *self as u8
    }
}

/// Pack a `(membership, filter)` pair into the 32-bit category code.
#[inline]
pub const fn pack_category(membership: u16, filter: u16) -> u32 {
    ((membership as u32) << 16) | filter as u32
}

/// Membership half of a packed category code.
#[inline]
pub const fn category_membership(category: u32) -> u16 {
    (category >> 16) as u16
}

/// Filter half of a packed category code.
#[inline]
pub const fn category_filter(category: u32) -> u16 {
    (category & 0xFFFF) as u16
}

/// Semantic surface types assigned to colliders.
///
/// The table below is the entire collision policy of the world:
///
/// | category | membership | filter               |
/// |----------|------------|----------------------|
/// | floor    | all        | all, object, bumper  |
/// | object   | object     | all, bumper          |
/// | bumper   | bumper     | all, object          |
///
/// Consequences: objects never collide with other objects, bumpers never
/// collide with other bumpers, and everything collides with the floor.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SurfaceCategory {
    Floor,
    #[default]
    Object,
    Bumper,
}

impl SurfaceCategory {
    /// The packed 32-bit category code for this surface type.
    #[inline]
    pub fn packed(self) -> u32 {
        use CollisionGroup::{All, Bumper, Object};
        match self {
            SurfaceCategory::Floor => pack_category(All.mask(), mask_of(&[All, Object, Bumper])),
            SurfaceCategory::Object => pack_category(Object.mask(), mask_of(&[All, Bumper])),
            SurfaceCategory::Bumper => pack_category(Bumper.mask(), mask_of(&[All, Object])),
        }
    }

    /// The rapier interaction groups equivalent of [`Self::packed`].
    #[inline]
    pub fn interaction_groups(self) -> InteractionGroups {
        let packed = self.packed();
        InteractionGroups::new(
            Group::from_bits_truncate(category_membership(packed) as u32),
            Group::from_bits_truncate(category_filter(packed) as u32),
            InteractionTestMode::And,
        )
    }
}

/// Do two packed categories interact? Requires each membership to be present
/// in the other's filter, matching rapier's symmetric test.
#[inline]
pub const fn categories_interact(a: u32, b: u32) -> bool {
    (category_membership(a) & category_filter(b)) != 0
        && (category_membership(b) & category_filter(a)) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_round_trips() {
        for cat in [
            SurfaceCategory::Floor,
            SurfaceCategory::Object,
            SurfaceCategory::Bumper,
        ] {
            let packed = cat.packed();
            let membership = category_membership(packed);
            let filter = category_filter(packed);
            assert_eq!(pack_category(membership, filter), packed);
        }
    }

    #[test]
    fn object_category_matches_documented_encoding() {
        // An object belongs to group `object` (bit 1) and collides with
        // `all | bumper` (bits 0 and 2).
        let packed = SurfaceCategory::Object.packed();
        assert_eq!(category_membership(packed), 0b010);
        assert_eq!(category_filter(packed), 0b101);
        assert_eq!(packed, (0b010 << 16) | 0b101);
    }

    #[test]
    fn interaction_table_is_mutual() {
        let floor = SurfaceCategory::Floor.packed();
        let object = SurfaceCategory::Object.packed();
        let bumper = SurfaceCategory::Bumper.packed();

        // Everything collides with the floor.
        assert!(categories_interact(floor, object));
        assert!(categories_interact(floor, bumper));
        assert!(categories_interact(floor, floor));

        // Objects and bumpers collide with each other, not with themselves.
        assert!(categories_interact(object, bumper));
        assert!(!categories_interact(object, object));
        assert!(!categories_interact(bumper, bumper));
    }

    #[test]
    fn mask_of_combines_flags() {
        let m = mask_of(&[CollisionGroup::All, CollisionGroup::Bumper]);
        assert_eq!(m, CollisionGroup::All.mask() | CollisionGroup::Bumper.mask());
        assert_eq!(m, 0b101);
        assert_eq!(mask_of::<CollisionGroup>(&[]), 0);
    }
}
