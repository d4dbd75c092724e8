// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The untyped, runtime-arity `Pipe`: composes an [`Observable`] with a
//! slice of type-erased operator functions.
//!
//! Fixed-arity generated sugar (`Pipe1..25`, `PipeOp1..25`) is deliberately
//! not offered — a single variadic `pipe` plus this crate's native
//! method-chaining (`observable.map(...).filter(...)`) covers the same
//! ground without the generated boilerplate. `pipe` exists for the case
//! where the chain of operators is itself only known at runtime (e.g.
//! built from configuration).

use crate::observable::Observable;
use std::any::{Any, TypeId};

/// A single type-erased pipeline stage: `Observable<A> -> Observable<B>`
/// for some `A`/`B` known only at construction time.
pub struct Operator {
    name: &'static str,
    input_type: TypeId,
    output_type: TypeId,
    apply: Box<dyn Fn(Box<dyn Any + Send>) -> Box<dyn Any + Send> + Send + Sync>,
}

impl Operator {
    /// Wraps a statically-typed operator function as a type-erased stage.
    pub fn new<A, B, F>(name: &'static str, f: F) -> Self
    where
        A: Send + 'static,
        B: Send + 'static,
        F: Fn(Observable<A>) -> Observable<B> + Send + Sync + 'static,
    {
        Self {
            name,
            input_type: TypeId::of::<Observable<A>>(),
            output_type: TypeId::of::<Observable<B>>(),
            apply: Box::new(move |input: Box<dyn Any + Send>| {
                let input = *input
                    .downcast::<Observable<A>>()
                    .unwrap_or_else(|_| panic!("pipe: operator input type mismatch"));
                Box::new(f(input)) as Box<dyn Any + Send>
            }),
        }
    }
}

/// Composes `source` through `operators` in order, checking at each step
/// that the previous stage's output type matches the next stage's input
/// type.
///
/// Returns the type-erased final `Observable<_>`; callers downcast it back
/// to the concrete type they expect with `result.downcast::<Observable<T>>()`.
///
/// # Panics
/// Panics if the chain's types don't line up — a programmer error, raised
/// synchronously at invocation time rather than delivered through the
/// stream, matching every other operator-construction violation in this
/// library.
pub fn pipe<T: Send + 'static>(source: Observable<T>, operators: &[Operator]) -> Box<dyn Any + Send> {
    let mut current: Box<dyn Any + Send> = Box::new(source);
    let mut current_type = TypeId::of::<Observable<T>>();

    for operator in operators {
        assert!(
            current_type == operator.input_type,
            "pipe: operator `{}` expects a different upstream type than the pipeline produced so far",
            operator.name
        );
        current = (operator.apply)(current);
        current_type = operator.output_type;
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::collect;
    use crate::sources::from_iter;

    #[test]
    fn pipe_chains_operators_in_order() {
        let result = pipe(
            from_iter(vec![1, 2, 3]),
            &[
                Operator::new("double", |o: Observable<i32>| o.map(|x| x * 2)),
                Operator::new("stringify", |o: Observable<i32>| o.map(|x| x.to_string())),
            ],
        );
        let observable = *result.downcast::<Observable<String>>().unwrap();
        let (values, _) = collect(&observable);
        assert_eq!(values, vec!["2", "4", "6"]);
    }

    #[test]
    #[should_panic(expected = "expects a different upstream type")]
    fn pipe_panics_on_type_mismatch() {
        let _ = pipe(
            from_iter(vec![1i32, 2, 3]),
            &[Operator::new("stringify", |o: Observable<String>| o.map(|s| s.len()))],
        );
    }
}
