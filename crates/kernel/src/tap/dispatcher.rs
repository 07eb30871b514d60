//! Dispatch cache - one lazily compiled invoker per invocation kind.
//!
//! Slots are filled on first use and cleared together whenever the tap
//! registry or interceptor chain changes.

use super::record::TapKind;
use crate::compile::CompiledInvoker;
use crate::error::HookError;

/// Cached invokers for `call`, `call_async` and `promise`.
pub(crate) struct DispatchCache<A, O> {
    slots: [Option<CompiledInvoker<A, O>>; 3],
}

impl<A, O> Default for DispatchCache<A, O> {
    fn default() -> Self {
        Self {
            slots: [None, None, None],
        }
    }
}

impl<A, O> DispatchCache<A, O> {
    fn slot(kind: TapKind) -> usize {
        match kind {
            TapKind::Sync => 0,
            TapKind::Callback => 1,
            TapKind::Deferred => 2,
        }
    }

    /// Return the cached invoker for `kind`, compiling it first if needed.
    ///
    /// A compile failure leaves the slot empty. An invoker of the wrong kind
    /// is rejected and not cached.
    pub(crate) fn get_or_compile<F>(
        &mut self,
        kind: TapKind,
        hook: Option<&str>,
        compile: F,
    ) -> Result<CompiledInvoker<A, O>, HookError>
    where
        F: FnOnce() -> Result<CompiledInvoker<A, O>, HookError>,
    {
        let slot = &mut self.slots[Self::slot(kind)];
        if let Some(invoker) = slot {
            return Ok(invoker.clone());
        }

        let invoker = compile()?;
        if invoker.kind() != kind {
            return Err(HookError::kind_mismatch(hook, kind, invoker.kind()));
        }

        *slot = Some(invoker.clone());
        Ok(invoker)
    }

    /// Whether an invoker is cached for `kind`.
    pub(crate) fn is_compiled(&self, kind: TapKind) -> bool {
        self.slots[Self::slot(kind)].is_some()
    }

    /// Drop every cached invoker. Returns how many were cached.
    pub(crate) fn reset(&mut self) -> usize {
        self.slots.iter_mut().filter_map(Option::take).count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sync_invoker() -> CompiledInvoker<(), u32> {
        CompiledInvoker::Sync(Arc::new(|()| Ok(7)))
    }

    #[test]
    fn compiles_once_until_reset() {
        let mut cache: DispatchCache<(), u32> = DispatchCache::default();
        let mut compiles = 0;

        for _ in 0..3 {
            cache
                .get_or_compile(TapKind::Sync, None, || {
                    compiles += 1;
                    Ok(sync_invoker())
                })
                .unwrap();
        }
        assert_eq!(compiles, 1);
        assert!(cache.is_compiled(TapKind::Sync));
        assert!(!cache.is_compiled(TapKind::Deferred));

        assert_eq!(cache.reset(), 1);
        assert!(!cache.is_compiled(TapKind::Sync));
        cache
            .get_or_compile(TapKind::Sync, None, || {
                compiles += 1;
                Ok(sync_invoker())
            })
            .unwrap();
        assert_eq!(compiles, 2);
    }

    #[test]
    fn rejects_mismatched_invoker() {
        let mut cache: DispatchCache<(), u32> = DispatchCache::default();
        let err = cache
            .get_or_compile(TapKind::Deferred, Some("emit"), || Ok(sync_invoker()))
            .unwrap_err();

        assert!(matches!(
            err,
            HookError::InvokerKindMismatch {
                expected: TapKind::Deferred,
                actual: TapKind::Sync,
                ..
            }
        ));
        assert!(!cache.is_compiled(TapKind::Deferred));
    }

    #[test]
    fn failed_compile_leaves_slot_empty() {
        let mut cache: DispatchCache<(), u32> = DispatchCache::default();
        let result = cache.get_or_compile(TapKind::Callback, None, || {
            Err(HookError::abstract_method(None))
        });

        assert!(result.is_err());
        assert!(!cache.is_compiled(TapKind::Callback));
        assert_eq!(cache.reset(), 0);
    }
}
