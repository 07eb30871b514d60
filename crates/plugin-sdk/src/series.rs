//! Series driver: runs a hook's taps one after another.
//!
//! The driver implements [`Compile`] for all three invocation kinds. What a
//! tap's result means (ignored, an early exit, new arguments) is decided by a
//! [`SeriesPolicy`].
//!
//! | invocation   | sync taps | callback taps | deferred taps |
//! |--------------|-----------|---------------|---------------|
//! | `call`       | yes       | no            | no            |
//! | `call_async` | yes       | yes           | no            |
//! | `promise`    | yes       | yes           | yes           |

use std::ops::ControlFlow;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;
use uncino_kernel::{
    BoxFuture, Compile, CompileOptions, CompiledInvoker, Done, HookError, Interceptor, Tap,
    TapFn, TapInfo, TapKind,
};

/// Decides what each tap result does to the running series.
pub trait SeriesPolicy<A, R>: Send + Sync + 'static {
    /// What the hook returns.
    type Output: Send + 'static;

    /// Fold one tap result into the arguments for later taps.
    /// `Break` ends the series with that output.
    fn step(&self, args: &mut A, result: R) -> ControlFlow<Self::Output>;

    /// Output when every tap ran without breaking.
    fn finish(&self, args: A) -> Self::Output;
}

/// Whether an invocation of kind `mode` can drive a tap of kind `kind`.
pub fn supports(mode: TapKind, kind: TapKind) -> bool {
    match mode {
        TapKind::Sync => kind == TapKind::Sync,
        TapKind::Callback => kind != TapKind::Deferred,
        TapKind::Deferred => true,
    }
}

/// Compile strategy running taps in series under policy `P`.
pub struct Series<P> {
    policy: Arc<P>,
}

impl<P> Series<P> {
    pub fn new(policy: P) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    /// The policy applied to tap results.
    pub fn policy(&self) -> &P {
        &self.policy
    }
}

impl<P: Default> Default for Series<P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

impl<A, R, P> Compile<A, R> for Series<P>
where
    A: Clone + Send + 'static,
    R: Send + 'static,
    P: SeriesPolicy<A, R>,
{
    type Output = P::Output;

    fn compile(
        &self,
        options: CompileOptions<A, R>,
    ) -> Result<CompiledInvoker<A, P::Output>, HookError> {
        let mode = options.kind;
        let hook = options.hook_label().to_string();

        if let Some(tap) = options.taps.iter().find(|t| !supports(mode, t.kind())) {
            return Err(HookError::unsupported_tap(hook, &tap.name, tap.kind(), mode));
        }

        debug!(hook = %hook, kind = %mode, taps = options.taps.len(), "planned series");

        let plan = Arc::new(Plan {
            infos: options.taps.iter().map(Tap::info).collect(),
            hook,
            taps: options.taps,
            interceptors: options.interceptors,
            policy: Arc::clone(&self.policy),
        });

        Ok(match mode {
            TapKind::Sync => CompiledInvoker::Sync(Arc::new(move |args: A| plan.run_sync(args))),
            TapKind::Callback => CompiledInvoker::Callback(Arc::new(
                move |args: A, done: Done<P::Output>| Arc::clone(&plan).run_callback(args, done),
            )),
            TapKind::Deferred => CompiledInvoker::Deferred(Arc::new(
                move |args: A| -> BoxFuture<'static, Result<P::Output, HookError>> {
                    let plan = Arc::clone(&plan);
                    Box::pin(async move { plan.run_deferred(args).await })
                },
            )),
        })
    }
}

/// Snapshot of one compile: the taps to run and who observes them.
struct Plan<A, R, P> {
    hook: String,
    taps: Vec<Tap<A, R>>,
    infos: Vec<TapInfo>,
    interceptors: Vec<Interceptor<A, R>>,
    policy: Arc<P>,
}

impl<A, R, P> Plan<A, R, P>
where
    A: Clone + Send + 'static,
    R: Send + 'static,
    P: SeriesPolicy<A, R>,
{
    fn on_call(&self, args: &A) {
        for call in self.interceptors.iter().filter_map(|i| i.call.as_ref()) {
            call(args);
        }
    }

    fn on_tap(&self, index: usize) {
        let info = &self.infos[index];
        for observe in self.interceptors.iter().filter_map(|i| i.tap.as_ref()) {
            observe(info);
        }
    }

    fn on_finish(&self, result: &Result<P::Output, HookError>) {
        match result {
            Ok(_) => {
                for done in self.interceptors.iter().filter_map(|i| i.done.as_ref()) {
                    done();
                }
            }
            Err(e) => {
                debug!(hook = %self.hook, tap = ?e.tap_name(), error = %e, "series failed");
                for error in self.interceptors.iter().filter_map(|i| i.error.as_ref()) {
                    error(e);
                }
            }
        }
    }

    fn failed(&self, tap: &Tap<A, R>, source: anyhow::Error) -> HookError {
        HookError::tap_failed(&self.hook, &tap.name, source)
    }

    fn unsupported(&self, tap: &Tap<A, R>, mode: TapKind) -> HookError {
        HookError::unsupported_tap(&self.hook, &tap.name, tap.kind(), mode)
    }

    fn run_sync(&self, args: A) -> Result<P::Output, HookError> {
        self.on_call(&args);
        let result = self.drive_sync(args);
        self.on_finish(&result);
        result
    }

    fn drive_sync(&self, mut args: A) -> Result<P::Output, HookError> {
        for (index, tap) in self.taps.iter().enumerate() {
            self.on_tap(index);
            let TapFn::Sync(func) = &tap.func else {
                return Err(self.unsupported(tap, TapKind::Sync));
            };

            let value = func(args.clone()).map_err(|e| self.failed(tap, e))?;
            if let ControlFlow::Break(output) = self.policy.step(&mut args, value) {
                return Ok(output);
            }
        }

        Ok(self.policy.finish(args))
    }

    fn run_callback(self: Arc<Self>, args: A, done: Done<P::Output>) {
        self.on_call(&args);
        let plan = Arc::clone(&self);
        let finish: Done<P::Output> = Box::new(move |result| {
            plan.on_finish(&result);
            done(result);
        });
        self.resume(0, args, finish);
    }

    /// Continue the series at `start`. Sync taps run in a loop. A callback
    /// tap that completes before returning hands its state back through the
    /// handoff and the loop carries on; one that completes later resumes the
    /// series itself.
    fn resume(self: Arc<Self>, start: usize, mut args: A, mut done: Done<P::Output>) {
        for index in start..self.taps.len() {
            let tap = &self.taps[index];
            self.on_tap(index);

            match &tap.func {
                TapFn::Sync(func) => {
                    let value = match func(args.clone()) {
                        Ok(value) => value,
                        Err(e) => return done(Err(self.failed(tap, e))),
                    };
                    if let ControlFlow::Break(output) = self.policy.step(&mut args, value) {
                        return done(Ok(output));
                    }
                }
                TapFn::Callback(func) => {
                    let input = args.clone();
                    let handoff = Arc::new(Mutex::new(Handoff::Running));
                    let next = Continuation {
                        plan: Arc::clone(&self),
                        index,
                        args: Some(args),
                        done: Some(done),
                        handoff: Arc::clone(&handoff),
                    };
                    func(input, Box::new(move |result| next.complete(result)));

                    let state = std::mem::replace(&mut *handoff.lock(), Handoff::Detached);
                    match state {
                        Handoff::Ready(next_args, next_done) => {
                            args = next_args;
                            done = next_done;
                        }
                        Handoff::Running | Handoff::Detached => return,
                    }
                }
                TapFn::Deferred(_) => return done(Err(self.unsupported(tap, TapKind::Callback))),
            }
        }

        done(Ok(self.policy.finish(args)));
    }

    async fn run_deferred(&self, args: A) -> Result<P::Output, HookError> {
        self.on_call(&args);
        let result = self.drive_deferred(args).await;
        self.on_finish(&result);
        result
    }

    async fn drive_deferred(&self, mut args: A) -> Result<P::Output, HookError> {
        for (index, tap) in self.taps.iter().enumerate() {
            self.on_tap(index);

            let value = match &tap.func {
                TapFn::Sync(func) => func(args.clone()),
                TapFn::Callback(func) => {
                    let (tx, rx) = oneshot::channel();
                    func(
                        args.clone(),
                        Box::new(move |result| {
                            let _ = tx.send(result);
                        }),
                    );
                    rx.await
                        .map_err(|_| HookError::callback_dropped(&self.hook, &tap.name))?
                }
                TapFn::Deferred(func) => func(args.clone()).await,
            }
            .map_err(|e| self.failed(tap, e))?;

            if let ControlFlow::Break(output) = self.policy.step(&mut args, value) {
                return Ok(output);
            }
        }

        Ok(self.policy.finish(args))
    }
}

/// Where a callback tap's continuation leaves the series.
enum Handoff<A, O> {
    /// The tap has not returned yet.
    Running,
    /// Completed before the tap returned; the running loop picks this up.
    Ready(A, Done<O>),
    /// The tap returned first; the continuation resumes the series itself.
    Detached,
}

/// Rest of a callback-mode series, waiting on one callback tap.
///
/// Dropping it without completing reports `CallbackDropped`.
struct Continuation<A, R, P>
where
    A: Clone + Send + 'static,
    R: Send + 'static,
    P: SeriesPolicy<A, R>,
{
    plan: Arc<Plan<A, R, P>>,
    index: usize,
    args: Option<A>,
    done: Option<Done<P::Output>>,
    handoff: Arc<Mutex<Handoff<A, P::Output>>>,
}

impl<A, R, P> Continuation<A, R, P>
where
    A: Clone + Send + 'static,
    R: Send + 'static,
    P: SeriesPolicy<A, R>,
{
    fn complete(mut self, result: anyhow::Result<R>) {
        let (Some(mut args), Some(done)) = (self.args.take(), self.done.take()) else {
            return;
        };
        let plan = Arc::clone(&self.plan);
        let tap = &plan.taps[self.index];

        match result {
            Ok(value) => match plan.policy.step(&mut args, value) {
                ControlFlow::Break(output) => done(Ok(output)),
                ControlFlow::Continue(()) => {
                    let mut handoff = self.handoff.lock();
                    if let Handoff::Running = *handoff {
                        *handoff = Handoff::Ready(args, done);
                        return;
                    }
                    drop(handoff);
                    Arc::clone(&plan).resume(self.index + 1, args, done);
                }
            },
            Err(e) => done(Err(plan.failed(tap, e))),
        }
    }
}

impl<A, R, P> Drop for Continuation<A, R, P>
where
    A: Clone + Send + 'static,
    R: Send + 'static,
    P: SeriesPolicy<A, R>,
{
    fn drop(&mut self) {
        if let Some(done) = self.done.take() {
            let tap = &self.plan.taps[self.index];
            done(Err(HookError::callback_dropped(&self.plan.hook, &tap.name)));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn kind_support_matrix() {
        assert!(supports(TapKind::Sync, TapKind::Sync));
        assert!(!supports(TapKind::Sync, TapKind::Callback));
        assert!(!supports(TapKind::Sync, TapKind::Deferred));

        assert!(supports(TapKind::Callback, TapKind::Sync));
        assert!(supports(TapKind::Callback, TapKind::Callback));
        assert!(!supports(TapKind::Callback, TapKind::Deferred));

        assert!(TapKind::ALL.into_iter().all(|k| supports(TapKind::Deferred, k)));
    }
}
