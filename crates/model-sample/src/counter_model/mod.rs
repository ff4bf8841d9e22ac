//! # Counter Model
//!
//! A persisted counter. The count is stored under `counter/count` in the default
//! storage, so a counter built from a seeded storage starts from the stored value.
//!
//! | Prop | Kind | |
//! |------|------|-|
//! | `count` | state `i64` | persisted |
//! | `double` | computed `i64` | `count * 2` |
//! | `increment`, `decrement`, `reset` | method `() -> ()` | |

use reactive_models::{Deps, Lifecycle, ModelType, Props};
use tracing::info;

pub const NAME: &str = "counter";

pub fn counter_model() -> ModelType {
    ModelType::new(NAME, |ctx, _key| {
        let count = ctx.persisted_state("count", 0i64)?;
        let double = ctx.computed(Deps::new().with("count", &count), |deps| {
            Ok(deps.get::<i64>("count")? * 2)
        })?;
        ctx.watch(
            Deps::new().with("count", &count),
            |deps| deps.get::<i64>("count"),
            |new, old| info!(old, new, "Counter changed"),
        )?;

        let initial = count.clone();
        ctx.on(Lifecycle::Init, move || {
            info!(count = initial.get(), "Counter ready");
            Ok(())
        })?;

        let (inc, dec, reset) = (count.clone(), count.clone(), count.clone());
        Ok(Props::new()
            .state("count", &count)
            .computed("double", &double)
            .method("increment", move |_: ()| {
                inc.update(|n| n + 1);
            })
            .method("decrement", move |_: ()| {
                dec.update(|n| n - 1);
            })
            .method("reset", move |_: ()| {
                reset.set(0);
            }))
    })
}
