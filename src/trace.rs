//! Process-wide verbose toggle for generated statements.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::sql::SqlQuery;

static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Emits a generated statement: at `info` when verbose, else at `trace`.
pub(crate) fn statement(query: &SqlQuery) {
    if is_verbose() {
        tracing::info!(
            target: "rust_sqlite_orm::sql",
            params = query.params.len(),
            "{}",
            query.statement
        );
    } else {
        tracing::trace!(
            target: "rust_sqlite_orm::sql",
            params = query.params.len(),
            "{}",
            query.statement
        );
    }
}
