//! The three-state evaluation lattice.
//!
//! `Pending` means "not known yet, ask again after more data arrives".
//! `Invalid` means "known, and undefined here forever".
//! `Ready(v)` is a computed value.
//!
//! Only `Pending` may ever change on re-query, so `Ready` and `Invalid` are
//! the only results that may be memoized.

/// Result of evaluating an indicator at one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalResult<V> {
    Pending,
    Invalid,
    Ready(V),
}

impl<V> EvalResult<V> {
    pub fn is_ready(&self) -> bool {
        matches!(self, EvalResult::Ready(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, EvalResult::Pending)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, EvalResult::Invalid)
    }

    /// `Ready` or `Invalid`: will never change again.
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    pub fn ready(self) -> Option<V> {
        match self {
            EvalResult::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> EvalResult<&V> {
        match self {
            EvalResult::Ready(v) => EvalResult::Ready(v),
            EvalResult::Pending => EvalResult::Pending,
            EvalResult::Invalid => EvalResult::Invalid,
        }
    }

    pub fn map<U, F: FnOnce(V) -> U>(self, f: F) -> EvalResult<U> {
        match self {
            EvalResult::Ready(v) => EvalResult::Ready(f(v)),
            EvalResult::Pending => EvalResult::Pending,
            EvalResult::Invalid => EvalResult::Invalid,
        }
    }

    pub fn and_then<U, F: FnOnce(V) -> EvalResult<U>>(self, f: F) -> EvalResult<U> {
        match self {
            EvalResult::Ready(v) => f(v),
            EvalResult::Pending => EvalResult::Pending,
            EvalResult::Invalid => EvalResult::Invalid,
        }
    }

    /// Pair two results. `Pending` on either side dominates `Invalid`.
    pub fn zip<U>(self, other: EvalResult<U>) -> EvalResult<(V, U)> {
        match (self, other) {
            (EvalResult::Ready(a), EvalResult::Ready(b)) => EvalResult::Ready((a, b)),
            (EvalResult::Pending, _) | (_, EvalResult::Pending) => EvalResult::Pending,
            _ => EvalResult::Invalid,
        }
    }
}

impl<V> From<EvalResult<V>> for Option<V> {
    fn from(result: EvalResult<V>) -> Self {
        result.ready()
    }
}

/// Collect N results with the combinator precedence: any `Pending` wins,
/// otherwise any `Invalid`, otherwise all values in order.
impl<V> FromIterator<EvalResult<V>> for EvalResult<Vec<V>> {
    fn from_iter<T: IntoIterator<Item = EvalResult<V>>>(iter: T) -> Self {
        let mut values = Vec::new();
        let mut pending = false;
        let mut invalid = false;
        for result in iter {
            match result {
                EvalResult::Ready(v) => values.push(v),
                EvalResult::Pending => pending = true,
                EvalResult::Invalid => invalid = true,
            }
        }
        if pending {
            EvalResult::Pending
        } else if invalid {
            EvalResult::Invalid
        } else {
            EvalResult::Ready(values)
        }
    }
}

/// Unwrap a `Ready` value or return the non-ready status from the enclosing
/// function.
#[macro_export]
macro_rules! ready {
    ($e:expr) => {
        match $e {
            $crate::eval::EvalResult::Ready(v) => v,
            $crate::eval::EvalResult::Pending => return $crate::eval::EvalResult::Pending,
            $crate::eval::EvalResult::Invalid => return $crate::eval::EvalResult::Invalid,
        }
    };
}

/// Nullable slot of a sparse source: explicitly recorded as absent, or present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence<V> {
    Present(V),
    Absent,
}

impl<V> Presence<V> {
    pub fn is_present(&self) -> bool {
        matches!(self, Presence::Present(_))
    }

    pub fn into_option(self) -> Option<V> {
        match self {
            Presence::Present(v) => Some(v),
            Presence::Absent => None,
        }
    }

    pub fn map<U, F: FnOnce(V) -> U>(self, f: F) -> Presence<U> {
        match self {
            Presence::Present(v) => Presence::Present(f(v)),
            Presence::Absent => Presence::Absent,
        }
    }
}

impl<V> From<Option<V>> for Presence<V> {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(v) => Presence::Present(v),
            None => Presence::Absent,
        }
    }
}

impl<V> From<Presence<V>> for Option<V> {
    fn from(value: Presence<V>) -> Self {
        value.into_option()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EvalResult::*;

    #[test]
    fn zip_precedence() {
        assert_eq!(Ready(1).zip(Ready(2)), Ready((1, 2)));
        assert_eq!(Ready(1).zip(Pending::<i32>), Pending);
        assert_eq!(Invalid::<i32>.zip(Pending::<i32>), Pending);
        assert_eq!(Pending::<i32>.zip(Invalid::<i32>), Pending);
        assert_eq!(Invalid::<i32>.zip(Ready(2)), Invalid);
    }

    #[test]
    fn collect_pending_dominates_invalid() {
        let r: EvalResult<Vec<i32>> = vec![Ready(1), Invalid, Pending].into_iter().collect();
        assert_eq!(r, Pending);
        let r: EvalResult<Vec<i32>> = vec![Ready(1), Invalid, Ready(3)].into_iter().collect();
        assert_eq!(r, Invalid);
        let r: EvalResult<Vec<i32>> = vec![Ready(1), Ready(3)].into_iter().collect();
        assert_eq!(r, Ready(vec![1, 3]));
    }

    #[test]
    fn settled_states() {
        assert!(Ready(0.0).is_settled());
        assert!(Invalid::<f64>.is_settled());
        assert!(!Pending::<f64>.is_settled());
    }

    #[test]
    fn ready_macro_short_circuits() {
        fn double(r: EvalResult<i32>) -> EvalResult<i32> {
            let v = ready!(r);
            Ready(v * 2)
        }
        assert_eq!(double(Ready(4)), Ready(8));
        assert_eq!(double(Pending), Pending);
        assert_eq!(double(Invalid), Invalid);
    }

    #[test]
    fn presence_option_conversions() {
        assert_eq!(Presence::from(Some(3)), Presence::Present(3));
        assert_eq!(Presence::<i32>::from(None), Presence::Absent);
        assert_eq!(Option::from(Presence::Present(1.5)), Some(1.5));
        assert_eq!(Presence::Present(2).map(|v| v * 10), Presence::Present(20));
    }
}
