//! Field Metadata for Component Records
//!
//! Every fragment type exposes its exported attributes through [`Record`]:
//! a read-only snapshot used by the diff step, and mutable slots used by the
//! patch step. Implementations are generated with [`impl_record!`] so the
//! field table and the struct definition sit next to each other.

use std::collections::BTreeMap;

use serde::Serialize;

// =============================================================================
// Values
// =============================================================================

/// A scalar field value, tagged with its concrete type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    String(String),
    I8(i8),
    I32(i32),
    I64(i64),
    U64(u64),
    Bool(bool),
}

impl Value {
    /// Emptiness as seen by the vet step.
    ///
    /// Strings are empty when they have no bytes, signed integers when they
    /// are zero. Every other type counts as empty and never protects the
    /// existing value from being overwritten.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::I8(v) => *v == 0,
            Value::I32(v) => *v == 0,
            Value::I64(v) => *v == 0,
            Value::U64(_) | Value::Bool(_) => true,
        }
    }

    /// Name of the concrete type, used in diff/patch error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::I8(_) => "i8",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U64(_) => "u64",
            Value::Bool(_) => "bool",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(v) => write!(f, "{:?}", v),
            Value::I8(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
        }
    }
}

// =============================================================================
// Record Trait
// =============================================================================

/// Read-only view of one field.
pub enum Field<'a> {
    /// Scalar attribute
    Value(Value),
    /// String-keyed map attribute (metadata, capabilities)
    Map(BTreeMap<String, Value>),
    /// Optional nested record
    Record(Option<&'a dyn Record>),
}

impl Field<'_> {
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Field::Value(_) => "value",
            Field::Map(_) => "map",
            Field::Record(_) => "record",
        }
    }
}

/// Mutable view of one field.
pub enum FieldMut<'a> {
    Value(&'a mut dyn ValueSlot),
    Map(&'a mut dyn MapSlot),
    Record(&'a mut dyn RecordSlot),
}

/// A structured component fragment whose fields can be diffed and patched.
///
/// Field names are the PascalCase attribute names used in change paths
/// (`Vendor`, `Firmware.Installed`, `Metadata.<key>`).
pub trait Record {
    /// Snapshot of every exported field, in declaration order.
    fn fields(&self) -> Vec<(&'static str, Field<'_>)>;

    /// Mutable access to a field by name.
    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>>;
}

// =============================================================================
// Slots
// =============================================================================

/// A scalar storage location that accepts a [`Value`] of its own type.
pub trait ValueSlot {
    fn set(&mut self, value: Value) -> std::result::Result<(), String>;
    fn clear(&mut self);
}

/// A map storage location.
pub trait MapSlot {
    fn insert(&mut self, key: &str, value: Value) -> std::result::Result<(), String>;
    fn remove(&mut self, key: &str);
}

/// An optional nested record.
pub trait RecordSlot {
    fn is_absent(&self) -> bool;

    /// Returns the nested record, materialising a default one if absent.
    fn get_or_insert(&mut self) -> &mut dyn Record;
}

/// Conversion of a struct field into its [`Field`] / [`FieldMut`] views.
pub trait AsField {
    fn as_field(&self) -> Field<'_>;
    fn as_field_mut(&mut self) -> FieldMut<'_>;
}

macro_rules! scalar_slot {
    ($ty:ty, $variant:ident) => {
        impl ValueSlot for $ty {
            fn set(&mut self, value: Value) -> std::result::Result<(), String> {
                match value {
                    Value::$variant(v) => {
                        *self = v;
                        Ok(())
                    }
                    other => Err(format!(
                        "expected {}, got {}",
                        stringify!($ty),
                        other.type_name()
                    )),
                }
            }

            fn clear(&mut self) {
                *self = <$ty>::default();
            }
        }

        impl AsField for $ty {
            fn as_field(&self) -> Field<'_> {
                Field::Value(Value::$variant(self.clone()))
            }

            fn as_field_mut(&mut self) -> FieldMut<'_> {
                FieldMut::Value(self)
            }
        }
    };
}

scalar_slot!(String, String);
scalar_slot!(i8, I8);
scalar_slot!(i32, I32);
scalar_slot!(i64, I64);
scalar_slot!(u64, U64);
scalar_slot!(bool, Bool);

impl MapSlot for BTreeMap<String, String> {
    fn insert(&mut self, key: &str, value: Value) -> std::result::Result<(), String> {
        match value {
            Value::String(v) => {
                BTreeMap::insert(self, key.to_string(), v);
                Ok(())
            }
            other => Err(format!("expected string entry, got {}", other.type_name())),
        }
    }

    fn remove(&mut self, key: &str) {
        BTreeMap::remove(self, key);
    }
}

impl AsField for BTreeMap<String, String> {
    fn as_field(&self) -> Field<'_> {
        Field::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }

    fn as_field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Map(self)
    }
}

impl MapSlot for BTreeMap<String, bool> {
    fn insert(&mut self, key: &str, value: Value) -> std::result::Result<(), String> {
        match value {
            Value::Bool(v) => {
                BTreeMap::insert(self, key.to_string(), v);
                Ok(())
            }
            other => Err(format!("expected bool entry, got {}", other.type_name())),
        }
    }

    fn remove(&mut self, key: &str) {
        BTreeMap::remove(self, key);
    }
}

impl AsField for BTreeMap<String, bool> {
    fn as_field(&self) -> Field<'_> {
        Field::Map(self.iter().map(|(k, v)| (k.clone(), Value::Bool(*v))).collect())
    }

    fn as_field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Map(self)
    }
}

impl<T: Record + Default> RecordSlot for Option<T> {
    fn is_absent(&self) -> bool {
        self.is_none()
    }

    fn get_or_insert(&mut self) -> &mut dyn Record {
        self.get_or_insert_with(T::default)
    }
}

impl<T: Record + Default> AsField for Option<T> {
    fn as_field(&self) -> Field<'_> {
        Field::Record(self.as_ref().map(|r| r as &dyn Record))
    }

    fn as_field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Record(self)
    }
}

// =============================================================================
// Record Generation
// =============================================================================

/// Implements [`Record`] from a field table.
///
/// ```ignore
/// impl_record!(Drive embeds common {
///     "Protocol" => protocol,
///     "CapacityBytes" => capacity_bytes,
/// });
/// ```
///
/// An embedded record contributes its fields at the top level of the path,
/// ahead of the struct's own fields.
macro_rules! impl_record {
    ($ty:ident { $( $name:literal => $field:ident ),* $(,)? }) => {
        impl $crate::merge::Record for $ty {
            fn fields(&self) -> Vec<(&'static str, $crate::merge::Field<'_>)> {
                vec![ $( ($name, $crate::merge::AsField::as_field(&self.$field)) ),* ]
            }

            fn field_mut(&mut self, name: &str) -> Option<$crate::merge::FieldMut<'_>> {
                match name {
                    $( $name => Some($crate::merge::AsField::as_field_mut(&mut self.$field)), )*
                    _ => None,
                }
            }
        }
    };
    ($ty:ident embeds $embedded:ident { $( $name:literal => $field:ident ),* $(,)? }) => {
        impl $crate::merge::Record for $ty {
            fn fields(&self) -> Vec<(&'static str, $crate::merge::Field<'_>)> {
                let mut fields = $crate::merge::Record::fields(&self.$embedded);
                $( fields.push(($name, $crate::merge::AsField::as_field(&self.$field))); )*
                fields
            }

            fn field_mut(&mut self, name: &str) -> Option<$crate::merge::FieldMut<'_>> {
                match name {
                    $( $name => Some($crate::merge::AsField::as_field_mut(&mut self.$field)), )*
                    _ => $crate::merge::Record::field_mut(&mut self.$embedded, name),
                }
            }
        }
    };
}

pub(crate) use impl_record;
