/// Defines a closed, `u32`-backed enum that crosses the wire.
///
/// Generates the enum itself (`#[repr(u32)]`, serde derives), an `ALL` table, a fallible
/// `TryFrom<u32>` that rejects unknown discriminants with a
/// [`WebnnDataError::DeserializationError`](crate::WebnnDataError), and a `Display` that prints
/// the variant name.
///
/// # Example
/// ```
/// use webnn_structures::define_wire_enum;
///
/// define_wire_enum! {
///     /// Example enum
///     pub enum Fruit {
///         Apple = 0,
///         Pear = 1,
///     }
/// }
///
/// assert_eq!(Fruit::try_from(1u32).unwrap(), Fruit::Pear);
/// assert!(Fruit::try_from(7u32).is_err());
/// assert_eq!(Fruit::Apple.to_string(), "Apple");
/// ```
#[macro_export]
macro_rules! define_wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$variant_meta:meta])* $variant:ident = $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(u32)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$variant_meta])* $variant = $value ),+
        }

        impl $name {
            /// Every variant, in discriminant order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            pub const fn as_u32(self) -> u32 {
                self as u32
            }
        }

        impl TryFrom<u32> for $name {
            type Error = $crate::WebnnDataError;
            fn try_from(value: u32) -> Result<Self, $crate::WebnnDataError> {
                match value {
                    $( $value => Ok($name::$variant), )+
                    _ => Err($crate::WebnnDataError::DeserializationError(format!(
                        "Unknown {} value {}",
                        stringify!($name),
                        value
                    ))),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let name = match self {
                    $( $name::$variant => stringify!($variant), )+
                };
                write!(f, "{name}")
            }
        }
    };
}
