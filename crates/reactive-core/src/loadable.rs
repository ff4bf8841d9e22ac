use crate::error::LoadError;

/// The status snapshot of a [`Resource`](crate::Resource).
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Loadable<T> {
    #[default]
    Idle,
    Loading,
    Failed(LoadError),
    Succeeded(T),
}

impl<T> Loadable<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Loadable::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Loadable::Failed(_))
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, Loadable::Succeeded(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Loadable::Succeeded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            Loadable::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Loadable<U> {
        match self {
            Loadable::Idle => Loadable::Idle,
            Loadable::Loading => Loadable::Loading,
            Loadable::Failed(error) => Loadable::Failed(error),
            Loadable::Succeeded(value) => Loadable::Succeeded(f(value)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Loadable::Idle => "idle",
            Loadable::Loading => "loading",
            Loadable::Failed(_) => "failed",
            Loadable::Succeeded(_) => "succeeded",
        }
    }
}
