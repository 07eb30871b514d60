//! Ready-made hook variants built on the series driver.

use std::ops::ControlFlow;

use uncino_kernel::Hook;

use crate::series::{Series, SeriesPolicy};

/// Runs every tap and ignores their results.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl<A, R> SeriesPolicy<A, R> for Sequential {
    type Output = ();

    fn step(&self, _args: &mut A, _result: R) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn finish(&self, _args: A) {}
}

/// Stops at the first tap returning `Some`, which becomes the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bail;

impl<A, T> SeriesPolicy<A, Option<T>> for Bail
where
    T: Send + 'static,
{
    type Output = Option<T>;

    fn step(&self, _args: &mut A, result: Option<T>) -> ControlFlow<Option<T>> {
        match result {
            Some(value) => ControlFlow::Break(Some(value)),
            None => ControlFlow::Continue(()),
        }
    }

    fn finish(&self, _args: A) -> Option<T> {
        None
    }
}

/// Threads the arguments through the taps. A tap returning `Some` replaces
/// the arguments seen by later taps; the output is the final arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct Waterfall;

impl<A> SeriesPolicy<A, Option<A>> for Waterfall
where
    A: Send + 'static,
{
    type Output = A;

    fn step(&self, args: &mut A, result: Option<A>) -> ControlFlow<A> {
        if let Some(next) = result {
            *args = next;
        }
        ControlFlow::Continue(())
    }

    fn finish(&self, args: A) -> A {
        args
    }
}

/// Hook running every tap in order.
pub type SeriesHook<A, R = ()> = Hook<A, R, ()>;

/// Hook returning the first `Some` produced by a tap.
pub type BailHook<A, T> = Hook<A, Option<T>, Option<T>>;

/// Hook threading its arguments through every tap.
pub type WaterfallHook<A> = Hook<A, Option<A>, A>;

/// Create a hook that runs every tap in order.
pub fn series_hook<A, R, I, S>(args: I) -> SeriesHook<A, R>
where
    A: Clone + Send + 'static,
    R: Send + 'static,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Hook::with_compiler(args, Series::new(Sequential))
}

/// Create a hook that stops at the first tap returning `Some`.
pub fn bail_hook<A, T, I, S>(args: I) -> BailHook<A, T>
where
    A: Clone + Send + 'static,
    T: Send + 'static,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Hook::with_compiler(args, Series::new(Bail))
}

/// Create a hook that threads its arguments through every tap.
pub fn waterfall_hook<A, I, S>(args: I) -> WaterfallHook<A>
where
    A: Clone + Send + 'static,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Hook::with_compiler(args, Series::new(Waterfall))
}
