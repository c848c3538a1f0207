use std::{future::Future, pin::Pin, sync::Arc};

use kvburst_model::{TaskIndex, TaskResult};

/// Boxed future produced by one dispatch.
pub type TaskFuture = Pin<Box<dyn Future<Output = TaskResult> + Send + 'static>>;

/// Shared handle to a task implementation.
pub type TaskRef = Arc<dyn Task>;

/// Unit of work executed once per index.
///
/// `dispatch` is called on the runner's control flow, in ascending index order;
/// the returned future is then spawned onto the runtime. Any I/O belongs to the future.
pub trait Task: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn dispatch(&self, index: TaskIndex) -> TaskFuture;
}

/// [`Task`] backed by a closure.
pub struct TaskFn<F> {
    name: String,
    f: F,
}

impl<F, Fut> TaskFn<F>
where
    F: Fn(TaskIndex) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TaskResult> + Send + 'static,
{
    pub fn arc(name: impl Into<String>, f: F) -> TaskRef {
        Arc::new(Self {
            name: name.into(),
            f,
        })
    }
}

impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(TaskIndex) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TaskResult> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch(&self, index: TaskIndex) -> TaskFuture {
        Box::pin((self.f)(index))
    }
}
