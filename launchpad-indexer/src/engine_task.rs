use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Background tasks owned by an engine. Stopping aborts them all; work they
/// had in flight is dropped, which rolls back open storage transactions.
#[derive(Clone, Debug, Default)]
pub struct EngineTask {
    subtasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl EngineTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_subtask(&self, subtask: JoinHandle<()>) {
        let mut subtasks = self.subtasks.lock().await;

        subtasks.retain(|s| !s.is_finished());
        subtasks.push(subtask);
    }

    pub async fn len(&self) -> usize {
        self.subtasks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stop(&self) {
        for subtask in self.subtasks.lock().await.drain(..) {
            subtask.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    pub async fn adds_multiple_tokio_tasks() {
        let engine_task = EngineTask::new();

        for _ in 0..3 {
            engine_task.add_subtask(tokio::spawn(std::future::pending())).await;
        }

        assert_eq!(engine_task.len().await, 3);
    }

    #[tokio::test]
    pub async fn stop_aborts_every_subtask() {
        let engine_task = EngineTask::new();
        let (sender, mut receiver) = tokio::sync::mpsc::channel::<()>(1);

        engine_task
            .add_subtask(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                let _ = sender.send(()).await;
            }))
            .await;
        engine_task.stop().await;

        assert!(engine_task.is_empty().await);
        assert!(receiver.recv().await.is_none());
    }
}
