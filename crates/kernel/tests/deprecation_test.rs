#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for the `context` deprecation notice.
//!
//! Runs in its own test binary so the process-wide config and notice are not
//! shared with other tests.

use serde_json::json;
use uncino_kernel::{CONTEXT_DEPRECATION, Config, Hook, TapOptions};
use uncino_test_utils::init_tracing;

/// Test that the notice fires once per process, on the first `context` tap only.
#[test]
fn context_option_warns_once() {
    init_tracing();
    let _ = Config::default().install();
    CONTEXT_DEPRECATION.reset();

    let hook: Hook<(), ()> = Hook::new(Vec::<String>::new()).named("legacy");
    hook.tap("plain", |()| Ok(())).unwrap();
    assert!(!CONTEXT_DEPRECATION.has_warned());

    hook.tap(json!({ "name": "A", "context": true }), |()| Ok(()))
        .unwrap();
    assert!(CONTEXT_DEPRECATION.has_warned());

    // Already fired: a second context tap registers without another notice.
    assert!(!CONTEXT_DEPRECATION.warn_once());
    hook.tap(TapOptions::new("B").with_context(json!({})), |()| Ok(()))
        .unwrap();

    let taps = hook.taps();
    assert_eq!(
        taps.iter().map(|t| t.context).collect::<Vec<_>>(),
        vec![false, true, true]
    );
    assert_eq!(CONTEXT_DEPRECATION.code(), "UNCINO_DEP_CONTEXT");

    // An explicit null is still a supplied option.
    CONTEXT_DEPRECATION.reset();
    hook.tap(json!({ "name": "C", "context": null }), |()| Ok(()))
        .unwrap();
    assert!(CONTEXT_DEPRECATION.has_warned());
    assert!(hook.taps()[3].context);
}
