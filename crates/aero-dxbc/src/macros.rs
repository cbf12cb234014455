/// Declares a closed, `u32`-numbered token enumeration.
///
/// Each variant is written as `Name = value => "label"`. The generated type gets
/// `from_raw`, `raw`, `label`, a `Display` impl printing the label, and
/// `decode`, which maps unknown values to
/// [`DecodeErrorKind::InvalidEnumValue`](crate::DecodeErrorKind::InvalidEnumValue).
macro_rules! numbered_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($what:literal) {
            $( $variant:ident = $value:literal => $label:literal, )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        $vis enum $name {
            $(
                #[doc = concat!("`", $label, "` (", stringify!($value), ")")]
                $variant = $value,
            )*
        }

        impl $name {
            /// Every defined value, in numeric order.
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            /// Maps a raw token field to a variant.
            pub fn from_raw(raw: u32) -> Option<Self> {
                match raw {
                    $( $value => Some(Self::$variant), )*
                    _ => None,
                }
            }

            /// The raw token value.
            pub fn raw(self) -> u32 {
                self as u32
            }

            /// Assembly-style label.
            pub fn label(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )*
                }
            }

            /// Like [`Self::from_raw`], reporting unknown values as a decode
            /// error positioned at `at_dword`.
            pub fn decode(raw: u32, at_dword: usize) -> Result<Self, $crate::DecodeError> {
                Self::from_raw(raw).ok_or_else(|| {
                    $crate::DecodeError::new(
                        at_dword,
                        $crate::DecodeErrorKind::InvalidEnumValue { what: $what, value: raw },
                    )
                })
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}
