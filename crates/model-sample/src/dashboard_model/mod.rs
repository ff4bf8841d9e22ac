//! # Dashboard Model
//!
//! Composes the other models. Each dashboard owns a private counter and a private todo
//! list for its user (resolved with `use_model`), and renders a headline with a
//! summarizer module that is loaded lazily, once, and shared by every dashboard.

use crate::model::Todo;
use async_trait::async_trait;
use reactive_models::{
    loader, Deps, LazyModule, Lifecycle, LoadError, Loadable, ModelError, ModelType, ModuleSource,
    Props,
};
use std::rc::Rc;
use std::time::Duration;

pub const NAME: &str = "dashboard";

/// Formats todo summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct Summarizer {
    pub label: String,
}

impl Summarizer {
    pub fn summarize(&self, todos: &[Todo]) -> String {
        let done = todos.iter().filter(|todo| todo.done).count();
        format!("{}: {} open, {} done", self.label, todos.len() - done, done)
    }
}

/// Simulates fetching the summarizer code.
pub struct SummarizerSource {
    pub label: String,
    pub latency: Duration,
}

#[async_trait(?Send)]
impl ModuleSource<Summarizer> for SummarizerSource {
    async fn load(&self) -> Result<Summarizer, LoadError> {
        tokio::time::sleep(self.latency).await;
        Ok(Summarizer {
            label: self.label.clone(),
        })
    }
}

pub fn summarizer_module(latency: Duration) -> LazyModule<Summarizer> {
    LazyModule::new(
        "summarizer",
        SummarizerSource {
            label: "Todos".to_string(),
            latency,
        },
    )
}

pub fn dashboard_model(counter: ModelType, todos: ModelType, summarizer: LazyModule<Summarizer>) -> ModelType {
    ModelType::new(NAME, move |ctx, key| {
        let counter = ctx.use_model(&counter, &())?;
        let list = ctx.use_model(&todos, key.value())?;
        let visible = list.computed::<Vec<Todo>>("visible")?;

        // Start fetching right away; every (re)load asks the module again so a failed
        // fetch is retried.
        ctx.use_module(&summarizer)?;
        let source = summarizer.clone();
        let module = ctx.resource(
            Deps::new(),
            loader(move |_tracker| {
                let pending = source.load();
                async move { pending.await }
            }),
        )?;

        let headline = ctx.computed(
            Deps::new().with("visible", &visible).with("summarizer", &module),
            |deps| {
                let todos = deps.get::<Vec<Todo>>("visible")?;
                let summarizer = deps.get::<Loadable<Rc<Summarizer>>>("summarizer")?;
                Ok(match summarizer.value() {
                    Some(summarizer) => summarizer.summarize(&todos),
                    None => format!("{} todos", todos.len()),
                })
            },
        )?;

        let autoload = module.clone();
        ctx.on(Lifecycle::Init, move || {
            autoload.load();
            Ok(())
        })?;

        Ok(Props::new()
            .model("counter", &counter)
            .model("todos", &list)
            .resource("summarizer", &module)
            .computed("headline", &headline))
    })
}

/// The dashboard's headline, for callers that only need the text.
pub fn headline(dashboard: &reactive_models::ModelInstance) -> Result<String, ModelError> {
    Ok(dashboard.computed::<String>("headline")?.get())
}
