// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Shallow equality for selector projections.
//!
//! Projections are compared one level deep: scalars by value, shared pointers by identity, and
//! small aggregates member by member. Shared documents inside a [`FormState`] are only rebuilt
//! when they change, so pointer identity is a reliable and cheap change signal for them.

use crate::FormState;
use serde_json::Value;
use std::rc::Rc;

/// Equality that does not look past direct members.
pub trait ShallowEq {
    fn shallow_eq(&self, other: &Self) -> bool;
}

macro_rules! shallow_eq_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ShallowEq for $ty {
                #[inline]
                fn shallow_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

shallow_eq_by_value!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String, str,
);

impl<T: ?Sized> ShallowEq for Rc<T> {
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ShallowEq + ?Sized> ShallowEq for &T {
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        (**self).shallow_eq(*other)
    }
}

impl<T: ShallowEq> ShallowEq for Option<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.shallow_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ShallowEq> ShallowEq for [T] {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.shallow_eq(b))
    }
}

impl<T: ShallowEq> ShallowEq for Vec<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.as_slice().shallow_eq(other.as_slice())
    }
}

macro_rules! shallow_eq_for_tuple {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: ShallowEq),+> ShallowEq for ($($name,)+) {
            fn shallow_eq(&self, other: &Self) -> bool {
                $(self.$idx.shallow_eq(&other.$idx))&&+
            }
        }
    };
}

shallow_eq_for_tuple!(A.0);
shallow_eq_for_tuple!(A.0, B.1);
shallow_eq_for_tuple!(A.0, B.1, C.2);
shallow_eq_for_tuple!(A.0, B.1, C.2, D.3);

/// Containers compare their direct members; owned JSON members have no identity, so members
/// compare by value.
impl ShallowEq for Value {
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len() && a.iter().all(|(key, value)| b.get(key) == Some(value))
            }
            (Value::Array(a), Value::Array(b)) => a == b,
            (a, b) => a == b,
        }
    }
}

impl ShallowEq for FormState {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.values.shallow_eq(&other.values)
            && self.initial_values.shallow_eq(&other.initial_values)
            && self.dirty_fields.shallow_eq(&other.dirty_fields)
            && self.is_valid == other.is_valid
            && self.is_validating == other.is_validating
            && self.is_submitting == other.is_submitting
    }
}
