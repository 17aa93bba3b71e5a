use crate::ast::{ListIter, NumberType, Value};
use crate::{Arity, Error};
use std::iter::FusedIterator;
use std::sync::Arc;

/// Canonical erased builtin function type used by the evaluator.
///
/// Builtins receive ownership of their evaluated argument vector, enabling
/// implementations that consume or rearrange arguments if desired.
pub type OperationFn = dyn Fn(Vec<Value>) -> Result<Value, Error> + Send + Sync;

// =====================================================================
// Fixed-arity argument conversion
//
// `FromParam` turns evaluated `Value` arguments into strongly-typed Rust
// parameters. All conversions live here so the supported parameter types
// are easy to audit.
// =====================================================================

/// Core trait used by the fixed-arity adapters to turn `Value` nodes
/// into strongly-typed parameters.
///
/// `Param<'a>` is the parameter type as seen by the builtin for a given
/// lifetime of the local `Value` slots used during argument conversion.
pub(crate) trait FromParam {
    type Param<'a>;

    /// Convert a single argument, either borrowing from it (`&str`, list
    /// iterators) or moving it out (`Value` itself).
    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error>;
}

impl FromParam for Value {
    type Param<'a> = Value;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        Ok(std::mem::replace(value, Value::Nil))
    }
}

// By-value scalars obtainable through `impl TryInto<T> for Value` in `ast.rs`.
impl<T> FromParam for T
where
    Value: std::convert::TryInto<T, Error = Error>,
{
    type Param<'a> = T;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        let owned = std::mem::replace(value, Value::Nil);
        <Value as std::convert::TryInto<T>>::try_into(owned)
    }
}

/// Symbols are the only text in the language, so `&str` borrows a symbol name.
impl FromParam for &str {
    type Param<'a> = &'a str;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        if let Value::Symbol(s) = value {
            Ok(s.as_str())
        } else {
            Err(Error::TypeMismatch(format!("expected symbol, got {value}")))
        }
    }
}

impl<'b> FromParam for ValueListIterator<'b> {
    type Param<'a> = ValueListIterator<'a>;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        ValueListIterator::from_list(value)
    }
}

impl<'b> FromParam for NumIterator<'b> {
    type Param<'a> = NumIterator<'a>;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        NumIterator::new(ValueListIterator::from_list(value)?)
    }
}

/// Normalize both plain values and `Result`-returning functions into `Result<T, Error>`.
pub trait IntoResult<T> {
    fn into_result(self) -> Result<T, Error>;
}

impl<T> IntoResult<T> for T {
    fn into_result(self) -> Result<T, Error> {
        Ok(self)
    }
}

// Interpreter errors pass through unchanged; plain messages (`&str`,
// `String`) become `Error::EvalError` via the `From` impls in `lib.rs`.
impl<T, E> IntoResult<T> for Result<T, E>
where
    E: Into<Error>,
{
    fn into_result(self) -> Result<T, Error> {
        self.map_err(Into::into)
    }
}

// =====================================================================
// Iterator-based parameter types
// =====================================================================

#[derive(Debug, Clone)]
enum Source<'a> {
    /// Trailing call arguments
    Args(std::slice::Iter<'a, Value>),
    /// Elements of a proper list argument
    List(ListIter<'a>),
}

/// Borrowed iterator over a sequence of `Value` references.
///
/// Produced either from the trailing arguments of a variadic call or from
/// a single proper-list argument. Typed iterators such as [`NumIterator`]
/// wrap this to provide element-level typing.
#[derive(Debug, Clone)]
pub struct ValueListIterator<'a> {
    source: Source<'a>,
    remaining: usize,
}

impl<'a> ValueListIterator<'a> {
    pub(crate) fn new(values: &'a [Value]) -> Self {
        ValueListIterator {
            source: Source::Args(values.iter()),
            remaining: values.len(),
        }
    }

    /// Iterate the elements of `list`, which must be a proper list
    pub(crate) fn from_list(list: &'a Value) -> Result<Self, Error> {
        let mut walk = list.iter();
        let remaining = walk.by_ref().count();
        if !walk.tail().is_nil() {
            return Err(Error::TypeMismatch(format!("expected list, got {list}")));
        }
        Ok(ValueListIterator {
            source: Source::List(list.iter()),
            remaining,
        })
    }
}

impl<'a> Iterator for ValueListIterator<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        let v = match &mut self.source {
            Source::Args(iter) => iter.next(),
            Source::List(iter) => iter.next(),
        }?;
        self.remaining -= 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a> ExactSizeIterator for ValueListIterator<'a> {}
impl<'a> FusedIterator for ValueListIterator<'a> {}

/// Borrowed iterator over numeric arguments. Construction checks every
/// element once, so iteration itself cannot fail.
#[derive(Debug, Clone)]
pub struct NumIterator<'a> {
    inner: ValueListIterator<'a>,
}

impl<'a> NumIterator<'a> {
    pub(crate) fn new(values: ValueListIterator<'a>) -> Result<Self, Error> {
        if let Some(bad) = values.clone().find(|v| !matches!(v, Value::Number(_))) {
            return Err(Error::TypeMismatch(format!("expected number, got {bad}")));
        }
        Ok(NumIterator { inner: values })
    }
}

impl<'a> Iterator for NumIterator<'a> {
    type Item = NumberType;

    fn next(&mut self) -> Option<Self::Item> {
        let v = self.inner.next()?;

        if let Value::Number(n) = v {
            Some(*n)
        } else {
            debug_assert!(false, "NumIterator saw non-number after construction");
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> ExactSizeIterator for NumIterator<'a> {}
impl<'a> FusedIterator for NumIterator<'a> {}

// =====================================================================
// Rest-parameter support for variadic operations
// =====================================================================

/// Builds a rest-parameter value from the trailing argument slice.
pub(crate) trait FromRest {
    type Param<'a>;

    fn from_rest<'a>(slice: &'a [Value]) -> Result<Self::Param<'a>, Error>;
}

impl FromRest for ValueListIterator<'static> {
    type Param<'a> = ValueListIterator<'a>;

    fn from_rest<'a>(slice: &'a [Value]) -> Result<Self::Param<'a>, Error> {
        Ok(ValueListIterator::new(slice))
    }
}

impl FromRest for NumIterator<'static> {
    type Param<'a> = NumIterator<'a>;

    fn from_rest<'a>(slice: &'a [Value]) -> Result<Self::Param<'a>, Error> {
        NumIterator::new(ValueListIterator::new(slice))
    }
}

/// Marker type used in `Args` tuples to indicate that a parameter
/// position is populated from the variadic "rest" arguments using
/// [`FromRest`].
#[derive(Debug, Clone, Copy)]
pub struct Rest<I>(std::marker::PhantomData<I>);

// Type-level aliases; the builtin itself sees the lifetime-parameterised
// iterator types above.
pub type ValuesRest = Rest<ValueListIterator<'static>>;
pub type NumRest = Rest<NumIterator<'static>>;

/// Convert a strongly-typed Rust function or closure into the erased
/// [`OperationFn`], parameterized by an argument tuple type.
pub trait IntoOperation<Args, R> {
    /// Argument count implied by the Rust signature
    const ARITY: Arity;

    fn into_operation(self) -> Arc<OperationFn>;
}

/// Operations whose Rust signature ends in a rest parameter, optionally
/// after a fixed prefix of `FromParam` parameters. Their arity is supplied
/// at registration time.
pub trait IntoVariadicOperation<Args, R> {
    fn into_variadic_operation(self) -> Arc<OperationFn>;
}

// =====================================================================
// Variadic adapters
// =====================================================================

impl<F, FR, R, I> IntoVariadicOperation<(Rest<I>,), R> for F
where
    I: FromRest,
    F: for<'a> Fn(<I as FromRest>::Param<'a>) -> FR + Send + Sync + 'static,
    FR: IntoResult<R> + 'static,
    R: Into<Value> + 'static,
{
    fn into_variadic_operation(self) -> Arc<OperationFn> {
        Arc::new(move |args: Vec<Value>| {
            let rest_param: <I as FromRest>::Param<'_> = <I as FromRest>::from_rest(&args[..])?;
            let result: FR = (self)(rest_param);
            let value: R = result.into_result()?;
            Ok(value.into())
        })
    }
}

macro_rules! impl_into_variadic_operation_for_prefix_and_rest {
    ($prefix:expr, $( $v:ident, $p:ident : $A:ident ),+ ) => {
        impl<F, FR, R, I, $( $A ),+> IntoVariadicOperation<( $( $A, )+ Rest<I>, ), R> for F
        where
            I: FromRest,
            $( $A: FromParam, )+
            F: for<'a> Fn(
                    $( <$A as FromParam>::Param<'a> ),+,
                    <I as FromRest>::Param<'a>,
                ) -> FR
                + Send
                + Sync
                + 'static,
            FR: IntoResult<R> + 'static,
            R: Into<Value> + 'static,
        {
            fn into_variadic_operation(self) -> Arc<OperationFn> {
                Arc::new(move |mut args: Vec<Value>| {
                    let len = args.len();
                    match args.as_mut_slice() {
                        &mut [ $( ref mut $v ),+, ref mut rest @ .. ] => {
                            $(
                                let $p: <$A as FromParam>::Param<'_> =
                                    <$A as FromParam>::from_arg($v)?;
                            )+

                            let rest_param: <I as FromRest>::Param<'_> =
                                <I as FromRest>::from_rest(&*rest)?;

                            let result: FR = (self)( $( $p ),+, rest_param );
                            let value: R = result.into_result()?;
                            Ok(value.into())
                        }
                        _ => Err(Error::arity_error("builtin", Arity::AtLeast($prefix), len)),
                    }
                })
            }
        }
    };
}

impl_into_variadic_operation_for_prefix_and_rest!(1, v0, p0: A1);
impl_into_variadic_operation_for_prefix_and_rest!(2, v0, p0: A1, v1, p1: A2);
impl_into_variadic_operation_for_prefix_and_rest!(3, v0, p0: A1, v1, p1: A2, v2, p2: A3);

// =====================================================================
// Fixed-arity adapters
// =====================================================================

/// Implements `IntoOperation` for one arity: destructure the owned argument
/// vector into local slots so `FromParam` can borrow from or consume each one.
macro_rules! impl_into_operation_for_arity {
    ($arity:expr, $( $v:ident, $p:ident : $A:ident ),+ ) => {
        impl<F, FR, R, $( $A ),+> IntoOperation<( $( $A, )+ ), R> for F
        where
            F: for<'a> Fn( $( <$A as FromParam>::Param<'a> ),+ ) -> FR
                + Send
                + Sync
                + 'static,
            FR: IntoResult<R> + 'static,
            R: Into<Value> + 'static,
            $( $A: FromParam, )+
        {
            const ARITY: Arity = Arity::Exact($arity);

            fn into_operation(self) -> Arc<OperationFn> {
                Arc::new(move |mut args: Vec<Value>| {
                    let len = args.len();
                    match args.as_mut_slice() {
                        &mut [ $( ref mut $v ),+ ] => {
                            $(
                                let $p: <$A as FromParam>::Param<'_> =
                                    <$A as FromParam>::from_arg($v)?;
                            )+

                            let result: FR = (self)( $( $p ),+ );
                            let value: R = result.into_result()?;
                            Ok(value.into())
                        }
                        _ => Err(Error::arity_error("builtin", Arity::Exact($arity), len)),
                    }
                })
            }
        }
    };
}

impl<F, FR, R> IntoOperation<(), R> for F
where
    F: Fn() -> FR + Send + Sync + 'static,
    FR: IntoResult<R> + 'static,
    R: Into<Value> + 'static,
{
    const ARITY: Arity = Arity::Exact(0);

    fn into_operation(self) -> Arc<OperationFn> {
        Arc::new(move |args: Vec<Value>| {
            if !args.is_empty() {
                return Err(Error::arity_error("builtin", Arity::Exact(0), args.len()));
            }

            let result: FR = (self)();
            let value: R = result.into_result()?;
            Ok(value.into())
        })
    }
}

impl_into_operation_for_arity!(1, v0, p0: A1);
impl_into_operation_for_arity!(2, v0, p0: A1, v1, p1: A2);
impl_into_operation_for_arity!(3, v0, p0: A1, v1, p1: A2, v2, p2: A3);
impl_into_operation_for_arity!(4, v0, p0: A1, v1, p1: A2, v2, p2: A3, v3, p3: A4);
