#![allow(unused_macros)]

/// Declares an operator payload from a single ordered field list.
///
/// The field list is the only place a payload field is named. From it the macro generates the
/// struct, one getter per field, the [`FieldDescriptor`](crate::ir::FieldDescriptor) table, the
/// transformation walk (fields visited in declared order) and the cloning constructor, so the
/// walk and the clone can never disagree on which fields exist.
///
/// ```rust, ignore
/// operator_payload! {
///     /// A software breakpoint.
///     pub struct Breakpoint {
///         /// The immediate encoded into the instruction
///         value: u32,
///     }
/// }
/// ```
macro_rules! operator_payload {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $name {
            $( $field: $ty, )*
        }

        impl $name {
            pub(crate) fn new($($field: $ty),*) -> Self {
                Self { $($field),* }
            }

            $(
                $(#[$fmeta])*
                #[must_use]
                #[allow(clippy::clone_on_copy)]
                pub fn $field(&self) -> $ty {
                    self.$field.clone()
                }
            )*
        }

        impl $crate::ir::Payload for $name {
            const FIELDS: &'static [$crate::ir::FieldDescriptor] = &[
                $(
                    $crate::ir::FieldDescriptor {
                        name: stringify!($field),
                        type_name: stringify!($ty),
                    },
                )*
            ];

            #[allow(unused_variables)]
            fn transform_fields(
                &mut self,
                ctx: &mut $crate::ir::TransformationContext<'_>,
            ) -> $crate::Result<()> {
                $(
                    $crate::ir::TransformField::transform_field(
                        &mut self.$field,
                        stringify!($field),
                        ctx,
                    )?;
                )*
                Ok(())
            }

            #[allow(unused_variables)]
            fn clone_fields(
                &self,
                ctx: &mut $crate::ir::CloningContext<'_>,
            ) -> $crate::Result<Self> {
                Ok(Self {
                    $( $field: $crate::ir::CloneField::clone_field(&self.$field, ctx)?, )*
                })
            }
        }
    };
}

/// Declares the closed set of operator kinds and their payload dispatch.
///
/// Every variant wraps exactly one payload type declared with [`operator_payload!`]. The generated
/// dispatch functions are exhaustive, so adding a variant here is the only step needed for it to
/// take part in transformation, cloning and field introspection.
macro_rules! operator_kinds {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident($payload:ty)
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant($payload),
            )*
        }

        impl $name {
            /// Returns the ordered field schema of the payload.
            #[must_use]
            pub fn fields(&self) -> &'static [$crate::ir::FieldDescriptor] {
                match self {
                    $( Self::$variant(_) => <$payload as $crate::ir::Payload>::FIELDS, )*
                }
            }

            pub(crate) fn transform_payload(
                &mut self,
                ctx: &mut $crate::ir::TransformationContext<'_>,
            ) -> $crate::Result<()> {
                match self {
                    $( Self::$variant(p) => $crate::ir::Payload::transform_fields(p, ctx), )*
                }
            }

            pub(crate) fn clone_payload(
                &self,
                ctx: &mut $crate::ir::CloningContext<'_>,
            ) -> $crate::Result<Self> {
                Ok(match self {
                    $(
                        Self::$variant(p) => {
                            Self::$variant($crate::ir::Payload::clone_fields(p, ctx)?)
                        }
                    )*
                })
            }
        }
    };
}
