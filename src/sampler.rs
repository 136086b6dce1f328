use futures::stream::{self, StreamExt};

use crate::fetcher::PointFetcher;
use crate::types::{Coordinate, Observation};

/// Fetches every coordinate with at most `workers` requests in flight.
///
/// Results come back in input order, whatever order the fetches finish in.
pub async fn sample(
    fetcher: &dyn PointFetcher,
    coordinates: &[Coordinate],
    workers: usize,
) -> Vec<Observation> {
    stream::iter(coordinates.iter().copied())
        .map(|coordinate| fetcher.fetch(coordinate))
        .buffered(workers.max(1))
        .collect()
        .await
}
