//! Fan-out/fan-in of independent API calls.

use futures::future::try_join_all;
use futures::{stream, StreamExt, TryStreamExt};
use std::future::Future;

use crate::error::Result;

/// Runs `task` for every item concurrently and collects the results.
///
/// With `limit == 0` every task is in flight at once; otherwise at most
/// `limit` run together and results come back in completion order. The first
/// error is returned and the remaining tasks are dropped.
pub async fn fan_out<I, F, Fut, T>(items: I, limit: usize, task: F) -> Result<Vec<T>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if limit == 0 {
        try_join_all(items.into_iter().map(task)).await
    } else {
        stream::iter(items)
            .map(task)
            .buffer_unordered(limit)
            .try_collect()
            .await
    }
}
