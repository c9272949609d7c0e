// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A macro to define bitflag sets for GPU usage and state masks.

/// Declares a `Copy` bitflag set with named constants and the usual
/// set operators. Used for buffer usages, texture usages and resource states.
#[macro_export]
#[doc(hidden)]
macro_rules! lucent_bitflags {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $(
                $(#[$flag_attr:meta])*
                const $flag_name:ident = $flag_value:expr;
            )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name {
            bits: $ty,
        }

        impl $name {
            /// An empty set of flags.
            pub const EMPTY: Self = Self { bits: 0 };

            /// Creates a flag set from raw bits, keeping unknown bits.
            pub const fn from_bits_truncate(bits: $ty) -> Self {
                Self { bits }
            }

            /// Returns the raw value of the flag set.
            pub const fn bits(&self) -> $ty {
                self.bits
            }

            /// Returns `true` if no flag is set.
            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            /// Returns `true` if all flags in `other` are contained within `self`.
            pub const fn contains(&self, other: Self) -> bool {
                (self.bits & other.bits) == other.bits
            }

            /// Returns `true` if any flag in `other` is contained within `self`.
            pub const fn intersects(&self, other: Self) -> bool {
                (self.bits & other.bits) != 0
            }

            /// Inserts the flags in `other` into `self`.
            pub fn insert(&mut self, other: Self) {
                self.bits |= other.bits;
            }

            /// Removes the flags in `other` from `self`.
            pub fn remove(&mut self, other: Self) {
                self.bits &= !other.bits;
            }

            $(
                $(#[$flag_attr])*
                pub const $flag_name: Self = Self { bits: $flag_value };
            )*
        }

        impl core::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, other: Self) -> Self {
                Self { bits: self.bits | other.bits }
            }
        }

        impl core::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, other: Self) -> Self {
                Self { bits: self.bits & other.bits }
            }
        }

        impl core::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, other: Self) {
                self.bits |= other.bits;
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mut bits = self.bits;
                let mut first_flag = true;

                write!(f, "{} {{ ", stringify!($name))?;

                $(
                    if ($flag_value != 0) && (bits & $flag_value) == $flag_value {
                        if !first_flag {
                            write!(f, " | ")?;
                        }
                        write!(f, "{}", stringify!($flag_name))?;
                        bits &= !$flag_value;
                        first_flag = false;
                    }
                )*

                if bits != 0 {
                    if !first_flag {
                        write!(f, " | ")?;
                    }
                    write!(f, "UNKNOWN({:#x})", bits)?;
                    first_flag = false;
                }

                if self.bits == 0 && first_flag {
                    write!(f, "EMPTY")?;
                }

                write!(f, " }}")
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::lucent_bitflags;

    lucent_bitflags! {
        /// Access flags used only to exercise the macro.
        pub struct AccessFlags: u32 {
            const READ = 1 << 0;
            const WRITE = 1 << 1;
            const COPY = 1 << 2;
            const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
        }
    }

    #[test]
    fn empty_set_reports_empty() {
        let flags = AccessFlags::EMPTY;
        assert!(flags.is_empty());
        assert!(flags.contains(AccessFlags::EMPTY));
        assert!(!flags.contains(AccessFlags::READ));
        assert_eq!(format!("{flags:?}"), "AccessFlags { EMPTY }");
    }

    #[test]
    fn combined_flags_contain_their_parts() {
        let flags = AccessFlags::READ | AccessFlags::COPY;
        assert!(flags.contains(AccessFlags::READ));
        assert!(flags.contains(AccessFlags::COPY));
        assert!(!flags.contains(AccessFlags::READ_WRITE));
        assert!(flags.intersects(AccessFlags::READ_WRITE));
        assert_eq!(format!("{flags:?}"), "AccessFlags { READ | COPY }");
    }

    #[test]
    fn insert_and_remove() {
        let mut flags = AccessFlags::READ;
        flags.insert(AccessFlags::WRITE);
        assert_eq!(flags, AccessFlags::READ_WRITE);
        flags.remove(AccessFlags::READ);
        assert_eq!(flags, AccessFlags::WRITE);
    }

    #[test]
    fn unknown_bits_are_printed() {
        let flags = AccessFlags::from_bits_truncate(1 << 8);
        assert_eq!(format!("{flags:?}"), "AccessFlags { UNKNOWN(0x100) }");
    }
}
