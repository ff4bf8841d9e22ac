use super::error::TodoError;
use crate::model::Todo;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

/// An in-process stand-in for a remote todo service.
///
/// Every fetch waits `latency` before answering, so loads are observably asynchronous.
#[derive(Clone, Debug, Default)]
pub struct TodoApi {
    lists: Rc<RefCell<BTreeMap<u32, Vec<Todo>>>>,
    next_id: Rc<Cell<u32>>,
    offline: Rc<Cell<bool>>,
    fetches: Rc<Cell<usize>>,
    latency: Duration,
}

impl TodoApi {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn add(&self, user_id: u32, title: impl Into<String>) -> Todo {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let todo = Todo::new(id, title);
        self.lists
            .borrow_mut()
            .entry(user_id)
            .or_default()
            .push(todo.clone());
        todo
    }

    pub fn complete(&self, user_id: u32, todo_id: u32) -> Result<(), TodoError> {
        let mut lists = self.lists.borrow_mut();
        let todo = lists
            .get_mut(&user_id)
            .and_then(|todos| todos.iter_mut().find(|todo| todo.id == todo_id))
            .ok_or(TodoError::NotFound(todo_id))?;
        todo.done = true;
        Ok(())
    }

    pub async fn fetch(&self, user_id: u32) -> Result<Vec<Todo>, TodoError> {
        self.fetches.set(self.fetches.get() + 1);
        tokio::time::sleep(self.latency).await;
        if self.offline.get() {
            return Err(TodoError::Unavailable);
        }
        Ok(self
            .lists
            .borrow()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }
}
