// Creation/dispatch flag sets, component tags, and per-tag metadata enums.
// Raw values are part of the C ABI and must stay stable.
use crate::core::error::{Error, ErrorKind};

bitflags::bitflags! {
    /// Flags accepted when a context is created.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ContextFlags: u32 {
        /// Route notification-level diagnostics produced during dispatch.
        const DEBUG = 1 << 0;
        /// Create a per-context worker pool used by dispatch.
        const MULTI_THREADED = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Flags accepted by a dispatch call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DispatchFlags: u32 {
        const VERTEX_ARRAY_FLOAT = 1 << 0;
        const VERTEX_ARRAY_DOUBLE = 1 << 1;
        const INCLUDE_VERTEX_MAP = 1 << 2;
        const INCLUDE_FACE_MAP = 1 << 3;
        const INCLUDE_TRIANGULATION = 1 << 4;
        const ENFORCE_GENERAL_POSITION = 1 << 5;
        const REPLACE_COMPONENTS = 1 << 6;
        const FILTER_FRAGMENT_LOCATION_ABOVE = 1 << 8;
        const FILTER_FRAGMENT_LOCATION_BELOW = 1 << 9;
        const FILTER_FRAGMENT_LOCATION_UNDEFINED = 1 << 10;
        const FILTER_FRAGMENT_SEALING_INSIDE = 1 << 11;
        const FILTER_FRAGMENT_SEALING_NONE = 1 << 12;
        const FILTER_PATCH_INSIDE = 1 << 13;
        const FILTER_PATCH_OUTSIDE = 1 << 14;
        const FILTER_SEAM_SRCMESH = 1 << 15;
        const FILTER_SEAM_CUTMESH = 1 << 16;

        const FILTER_FRAGMENT_LOCATION = Self::FILTER_FRAGMENT_LOCATION_ABOVE.bits()
            | Self::FILTER_FRAGMENT_LOCATION_BELOW.bits()
            | Self::FILTER_FRAGMENT_LOCATION_UNDEFINED.bits();
        const FILTER_FRAGMENT_SEALING = Self::FILTER_FRAGMENT_SEALING_INSIDE.bits()
            | Self::FILTER_FRAGMENT_SEALING_NONE.bits();
        const FILTER_PATCH = Self::FILTER_PATCH_INSIDE.bits() | Self::FILTER_PATCH_OUTSIDE.bits();
        const FILTER_SEAM = Self::FILTER_SEAM_SRCMESH.bits() | Self::FILTER_SEAM_CUTMESH.bits();
        const FILTER_ALL = Self::FILTER_FRAGMENT_LOCATION.bits()
            | Self::FILTER_FRAGMENT_SEALING.bits()
            | Self::FILTER_PATCH.bits()
            | Self::FILTER_SEAM.bits();
    }
}

impl DispatchFlags {
    /// Fills every empty filter group with its default selection.
    pub fn effective_filters(self) -> DispatchFlags {
        let mut out = self & DispatchFlags::FILTER_ALL;
        if !self.intersects(DispatchFlags::FILTER_FRAGMENT_LOCATION) {
            out |= DispatchFlags::FILTER_FRAGMENT_LOCATION;
        }
        if !self.intersects(DispatchFlags::FILTER_FRAGMENT_SEALING) {
            out |= DispatchFlags::FILTER_FRAGMENT_SEALING_NONE;
        }
        if !self.intersects(DispatchFlags::FILTER_PATCH) {
            out |= DispatchFlags::FILTER_PATCH_INSIDE;
        }
        if !self.intersects(DispatchFlags::FILTER_SEAM) {
            out |= DispatchFlags::FILTER_SEAM_SRCMESH;
        }
        out
    }
}

bitflags::bitflags! {
    /// Component type filter; a union of tags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ComponentTypeFilter: u32 {
        const FRAGMENT = 1 << 0;
        const PATCH = 1 << 1;
        const SEAM = 1 << 2;
        const INPUT = 1 << 3;
        const ALL = Self::FRAGMENT.bits() | Self::PATCH.bits() | Self::SEAM.bits() | Self::INPUT.bits();
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DebugSource: u32 {
        const API = 1 << 0;
        const KERNEL = 1 << 1;
        const ALL = Self::API.bits() | Self::KERNEL.bits();
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DebugType: u32 {
        const ERROR = 1 << 0;
        const DEPRECATED_BEHAVIOR = 1 << 1;
        const UNDEFINED_BEHAVIOR = 1 << 2;
        const PORTABILITY = 1 << 3;
        const PERFORMANCE = 1 << 4;
        const OTHER = 1 << 5;
        const ALL = Self::ERROR.bits()
            | Self::DEPRECATED_BEHAVIOR.bits()
            | Self::UNDEFINED_BEHAVIOR.bits()
            | Self::PORTABILITY.bits()
            | Self::PERFORMANCE.bits()
            | Self::OTHER.bits();
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DebugSeverity: u32 {
        const HIGH = 1 << 0;
        const MEDIUM = 1 << 1;
        const LOW = 1 << 2;
        const NOTIFICATION = 1 << 3;
        const ALL = Self::HIGH.bits() | Self::MEDIUM.bits() | Self::LOW.bits() | Self::NOTIFICATION.bits();
    }
}

/// Parses a raw flag word, rejecting bits outside the known set.
pub fn parse_flags<F: bitflags::Flags<Bits = u32>>(raw: u32, what: &str) -> Result<F, Error> {
    F::from_bits(raw).ok_or_else(|| {
        Error::new(ErrorKind::InvalidArgument).with_message(format!("unknown {what} bits: {raw:#x}"))
    })
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ComponentType {
    Fragment,
    Patch,
    Seam,
    Input,
}

impl ComponentType {
    pub fn filter_bit(self) -> ComponentTypeFilter {
        match self {
            ComponentType::Fragment => ComponentTypeFilter::FRAGMENT,
            ComponentType::Patch => ComponentTypeFilter::PATCH,
            ComponentType::Seam => ComponentTypeFilter::SEAM,
            ComponentType::Input => ComponentTypeFilter::INPUT,
        }
    }

    pub fn to_raw(self) -> u32 {
        self.filter_bit().bits()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FragmentLocation {
    Above = 1,
    Below = 2,
    Undefined = 4,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SealType {
    Complete = 1,
    None = 2,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PatchLocation {
    Inside = 1,
    Outside = 2,
    Undefined = 4,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SeamOrigin {
    SrcMesh = 1,
    CutMesh = 2,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputOrigin {
    SrcMesh = 1,
    CutMesh = 2,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum WindingOrder {
    #[default]
    AsGiven = 0,
    Reversed = 1,
}

impl WindingOrder {
    pub fn from_raw(value: u32) -> Result<Self, Error> {
        match value {
            0 => Ok(WindingOrder::AsGiven),
            1 => Ok(WindingOrder::Reversed),
            _ => Err(Error::new(ErrorKind::InvalidArgument)
                .with_message(format!("invalid face winding order: {value}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ComponentTypeFilter, ContextFlags, DispatchFlags, WindingOrder, parse_flags};
    use crate::core::error::ErrorKind;

    #[test]
    fn empty_filter_groups_take_defaults() {
        let flags = DispatchFlags::VERTEX_ARRAY_DOUBLE.effective_filters();
        assert!(flags.contains(DispatchFlags::FILTER_FRAGMENT_LOCATION));
        assert!(flags.contains(DispatchFlags::FILTER_FRAGMENT_SEALING_NONE));
        assert!(!flags.contains(DispatchFlags::FILTER_FRAGMENT_SEALING_INSIDE));
        assert!(flags.contains(DispatchFlags::FILTER_PATCH_INSIDE));
        assert!(flags.contains(DispatchFlags::FILTER_SEAM_SRCMESH));
        assert!(!flags.contains(DispatchFlags::VERTEX_ARRAY_DOUBLE));
    }

    #[test]
    fn explicit_filter_group_is_kept() {
        let flags = (DispatchFlags::FILTER_FRAGMENT_LOCATION_ABOVE
            | DispatchFlags::FILTER_FRAGMENT_SEALING_INSIDE)
            .effective_filters();
        assert!(flags.contains(DispatchFlags::FILTER_FRAGMENT_LOCATION_ABOVE));
        assert!(!flags.contains(DispatchFlags::FILTER_FRAGMENT_LOCATION_BELOW));
        assert!(!flags.contains(DispatchFlags::FILTER_FRAGMENT_SEALING_NONE));
    }

    #[test]
    fn unknown_bits_are_rejected() {
        let err = parse_flags::<ContextFlags>(1 << 30, "context flag").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let ok = parse_flags::<ComponentTypeFilter>(0xF, "type filter").expect("all");
        assert_eq!(ok, ComponentTypeFilter::ALL);
    }

    #[test]
    fn winding_order_rejects_out_of_range() {
        assert_eq!(WindingOrder::from_raw(1).expect("valid"), WindingOrder::Reversed);
        let err = WindingOrder::from_raw(2).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
