//! Extra return values of polled producers.
//!
//! A producer handed to [`Actual::from_tuple_fn`](crate::Actual::from_tuple_fn)
//! returns the value under test first and then any number of extras. Every
//! extra must be nil/zero; the first one that is not turns the sample into a
//! resolution failure.

use std::any::type_name;
use std::fmt::Debug;

use thiserror::Error;

/// An extra value that must be nil/zero for a sample to be usable.
pub trait ExtraValue: Debug {
    /// Returns `true` when the value is nil/zero.
    fn is_zero(&self) -> bool;
}

impl<T: Debug> ExtraValue for Option<T> {
    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

impl<E: Debug> ExtraValue for Result<(), E> {
    fn is_zero(&self) -> bool {
        self.is_ok()
    }
}

impl ExtraValue for () {
    fn is_zero(&self) -> bool {
        true
    }
}

impl ExtraValue for bool {
    fn is_zero(&self) -> bool {
        !*self
    }
}

impl ExtraValue for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl ExtraValue for &str {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Debug> ExtraValue for Vec<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

macro_rules! zero_is_default {
    ($($ty:ty),*) => {
        $(
            impl ExtraValue for $ty {
                fn is_zero(&self) -> bool {
                    *self == <$ty>::default()
                }
            }
        )*
    };
}

zero_is_default!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

/// A non-nil/non-zero extra value returned by a producer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unexpected non-nil/non-zero extra argument at index {index}:\n\t<{type_name}>: {value}")]
pub struct UnexpectedExtraValue {
    /// Position in the returned tuple; the value under test is index 0.
    pub index: usize,
    /// Type of the extra value.
    pub type_name: &'static str,
    /// The extra value, rendered with `{:#?}`.
    pub value: String,
}

fn check_extra<X: ExtraValue>(index: usize, extra: &X) -> Result<(), UnexpectedExtraValue> {
    if extra.is_zero() {
        Ok(())
    } else {
        Err(UnexpectedExtraValue {
            index,
            type_name: type_name::<X>(),
            value: format!("{extra:#?}"),
        })
    }
}

/// A producer return value made of the value under test plus extras.
pub trait WithExtras {
    /// The value under test.
    type Value;

    /// Split off the value, rejecting the first non-zero extra.
    ///
    /// # Errors
    ///
    /// Returns [`UnexpectedExtraValue`] for the first extra that is not nil/zero.
    fn into_value(self) -> Result<Self::Value, UnexpectedExtraValue>;
}

impl<T, A: ExtraValue> WithExtras for (T, A) {
    type Value = T;

    fn into_value(self) -> Result<T, UnexpectedExtraValue> {
        check_extra(1, &self.1)?;
        Ok(self.0)
    }
}

impl<T, A: ExtraValue, B: ExtraValue> WithExtras for (T, A, B) {
    type Value = T;

    fn into_value(self) -> Result<T, UnexpectedExtraValue> {
        check_extra(1, &self.1)?;
        check_extra(2, &self.2)?;
        Ok(self.0)
    }
}

impl<T, A: ExtraValue, B: ExtraValue, C: ExtraValue> WithExtras for (T, A, B, C) {
    type Value = T;

    fn into_value(self) -> Result<T, UnexpectedExtraValue> {
        check_extra(1, &self.1)?;
        check_extra(2, &self.2)?;
        check_extra(3, &self.3)?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_extras_pass_through() {
        assert_eq!((5, None::<String>).into_value(), Ok(5));
        assert_eq!((5, Ok::<(), String>(()), 0u8).into_value(), Ok(5));
        assert_eq!(("v", (), false, String::new()).into_value(), Ok("v"));
    }

    #[test]
    fn test_first_non_zero_extra_is_reported() {
        let err = (5, None::<i32>, 7i32, Some("late")).into_value().unwrap_err();
        assert_eq!(err.index, 2);
        assert_eq!(err.type_name, "i32");
        assert_eq!(err.value, "7");
        assert_eq!(
            err.to_string(),
            "Unexpected non-nil/non-zero extra argument at index 2:\n\t<i32>: 7"
        );
    }

    #[test]
    fn test_error_extra() {
        let err = (1, Err::<(), _>("boom")).into_value().unwrap_err();
        assert_eq!(err.index, 1);
        assert!(err.value.contains("boom"));
    }
}
