//! Optimistic mutation helper.
//!
//! Applies a local change immediately, awaits the remote confirmation, and
//! undoes the local change if confirmation fails. Every account-mode
//! wishlist mutation goes through [`run`] so the revert path exists in
//! exactly one place.

use std::future::Future;

/// Apply a local change now, then confirm it remotely, reverting on error.
///
/// `apply` performs the local change and returns a ticket describing what
/// must be confirmed, or `None` when there is nothing to confirm (the state
/// already matched, or the change needs no remote round-trip). The ticket is
/// handed to `confirm`, and to `revert` together with the error if
/// confirmation fails.
///
/// # Errors
///
/// Returns the confirmation error after `revert` has run.
pub async fn run<P, A, C, F, R, T, E>(apply: A, confirm: C, revert: R) -> Result<Option<T>, E>
where
    P: Clone,
    A: FnOnce() -> Option<P>,
    C: FnOnce(P) -> F,
    F: Future<Output = Result<T, E>>,
    R: FnOnce(P, &E),
{
    let Some(ticket) = apply() else {
        return Ok(None);
    };

    match confirm(ticket.clone()).await {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            revert(ticket, &e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[tokio::test]
    async fn test_confirmed_change_is_kept() {
        let state = RefCell::new(Vec::<&str>::new());
        let result: Result<_, ()> = run(
            || {
                state.borrow_mut().push("tee");
                Some("tee")
            },
            |_| async { Ok(7) },
            |_, _| state.borrow_mut().clear(),
        )
        .await;

        assert_eq!(result, Ok(Some(7)));
        assert_eq!(*state.borrow(), vec!["tee"]);
    }

    #[tokio::test]
    async fn test_failed_confirmation_reverts() {
        let state = RefCell::new(Vec::<&str>::new());
        let result: Result<Option<()>, &str> = run(
            || {
                state.borrow_mut().push("tee");
                Some("tee")
            },
            |_| async { Err("offline") },
            |added, e| {
                assert_eq!(*e, "offline");
                state.borrow_mut().retain(|p| *p != added);
            },
        )
        .await;

        assert_eq!(result, Err("offline"));
        assert!(state.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_noop_apply_skips_confirmation() {
        let confirmed = RefCell::new(false);
        let result: Result<Option<()>, ()> = run(
            || None::<()>,
            |()| {
                *confirmed.borrow_mut() = true;
                async { Ok(()) }
            },
            |(), _| {},
        )
        .await;

        assert_eq!(result, Ok(None));
        assert!(!*confirmed.borrow());
    }
}
