//! Per-class fault isolation boundary.
//!
//! A collector may fail two ways. A returned error is a reported, expected
//! failure (missing binary, bad exit code, unparseable output) and stays
//! fatal to the pass. A panic is an unexpected fault, usually a parser bug
//! on messy input; it is logged and treated as "no data" for that
//! collector only.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::error;

use crate::error::{Error, Result};

/// What came out of a guarded collector call.
#[derive(Debug)]
pub enum Guarded<T> {
    Completed(T),
    /// The collector panicked; the payload message is kept for reporting
    Faulted(String),
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Run one collector call inside the boundary.
///
/// Returned errors come back wrapped with `class`; panics come back as
/// [`Guarded::Faulted`].
pub async fn isolate<T, F>(class: &str, utility: &str, call: F) -> Result<Guarded<T>>
where
    F: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(value)) => Ok(Guarded::Completed(value)),
        Ok(Err(e)) => Err(Error::collector(class, e)),
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!(class, utility, reason = %reason, "collector faulted, class data skipped");
            Ok(Guarded::Faulted(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_completed_value_passes_through() {
        let guarded = isolate("drives", "nvme", async { Ok(3) }).await.unwrap();
        assert_matches!(guarded, Guarded::Completed(3));
    }

    #[tokio::test]
    async fn test_returned_error_is_wrapped_and_fatal() {
        let err = isolate::<(), _>("nics", "mlxup", async {
            Err(Error::ExecutableNotFound {
                program: "mlxup".into(),
            })
        })
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "nics collection failed: executable not found: mlxup");
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let guarded = isolate::<u32, _>("bmc", "ipmitool", async {
            let fields: Vec<&str> = Vec::new();
            // Index out of bounds inside a parser
            Ok(fields[2].len() as u32)
        })
        .await
        .unwrap();

        assert_matches!(guarded, Guarded::Faulted(ref reason) if reason.contains("index out of bounds"));
    }

    #[tokio::test]
    async fn test_string_payload_is_reported() {
        let guarded = isolate("bios", "dmidecode", async {
            if true {
                panic!("unexpected table {}", 42);
            }
            Ok(())
        })
        .await
        .unwrap();

        assert_matches!(guarded, Guarded::Faulted(ref reason) if reason == "unexpected table 42");
    }
}
