//! # Todo List Model
//!
//! One instance per user: the model key is the user id.
//!
//! | Prop | Kind | |
//! |------|------|-|
//! | `todos` | resource `Vec<Todo>` | loaded from [`TodoApi`] |
//! | `filter` | state [`TodoFilter`] | |
//! | `visible` | computed `Vec<Todo>` | last loaded todos matching `filter`, kept during reloads |
//! | `add` | method `String -> Result<Todo, ModelError>` | adds and reloads |
//! | `complete` | method `u32 -> Result<(), ModelError>` | completes and reloads |
//! | `reload` | method `() -> ()` | |
//!
//! The list starts loading as soon as the instance is initialized.

mod api;
mod error;

pub use api::TodoApi;
pub use error::TodoError;

use crate::model::{Todo, TodoFilter};
use reactive_models::{loader, Deps, Lifecycle, LoadError, Loadable, ModelError, ModelType, Props};

pub const NAME: &str = "todos";

pub fn todo_model(api: TodoApi) -> ModelType {
    ModelType::new(NAME, move |ctx, key| {
        let user_id = key
            .value()
            .as_u64()
            .and_then(|id| u32::try_from(id).ok())
            .ok_or_else(|| ModelError::hook(TodoError::InvalidKey(key.to_string())))?;

        let fetcher = api.clone();
        let todos = ctx.resource(
            Deps::new(),
            loader(move |_tracker| {
                let api = fetcher.clone();
                async move { api.fetch(user_id).await.map_err(LoadError::new) }
            }),
        )?;
        let filter = ctx.state(TodoFilter::All)?;
        let loaded = todos.clone();
        let visible = ctx.computed(
            Deps::new().with("todos", &todos).with("filter", &filter),
            move |deps| {
                let filter = deps.get::<TodoFilter>("filter")?;
                // Subscribes to status changes; the list itself survives reloads.
                deps.get::<Loadable<Vec<Todo>>>("todos")?;
                Ok(loaded
                    .value()
                    .map(|todos| todos.iter().filter(|todo| filter.matches(todo)).cloned().collect::<Vec<_>>())
                    .unwrap_or_default())
            },
        )?;

        let autoload = todos.clone();
        ctx.on(Lifecycle::Init, move || {
            autoload.load();
            Ok(())
        })?;

        let (adder, add_api) = (todos.clone(), api.clone());
        let (completer, complete_api) = (todos.clone(), api.clone());
        let reloader = todos.clone();
        Ok(Props::new()
            .resource("todos", &todos)
            .state("filter", &filter)
            .computed("visible", &visible)
            .value("user_id", user_id)
            .method("add", move |title: String| -> Result<Todo, ModelError> {
                let todo = add_api.add(user_id, title);
                adder.reload();
                Ok(todo)
            })
            .method("complete", move |todo_id: u32| -> Result<(), ModelError> {
                complete_api
                    .complete(user_id, todo_id)
                    .map_err(ModelError::hook)?;
                completer.reload();
                Ok(())
            })
            .method("reload", move |_: ()| reloader.reload()))
    })
}
