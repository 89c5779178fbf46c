//! # Simple value pipeline
//!
//! Demonstrates basic reflow features:
//! - Deferred sources (values emitted on the first terminal operation)
//! - Chained map/filter/reduce stages
//! - Per-item failure routing with `try_map` + `when`

use std::sync::Arc;

use reflow::{Composable, SyncDispatcher};

#[derive(Debug, thiserror::Error)]
#[error("{0} is not even")]
struct OddInput(u32);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), reflow::FlowError> {
    let source = Composable::from_iter(vec![1u32, 2, 3, 4, 5, 6]);
    source.set_dispatcher(Arc::new(SyncDispatcher::new()));

    let halved = source.try_map(|n| {
        if n % 2 == 0 {
            Ok(n / 2)
        } else {
            Err(OddInput(n))
        }
    });
    halved.when::<OddInput, _>(|e| println!("skipped: {e}"));

    let sum = halved.reduce(|step| step.last + step.next, 0u32);
    println!("sum of halves: {:?}", sum.wait().await?);
    Ok(())
}
