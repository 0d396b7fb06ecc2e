//! Task-list executor (§4.5): owns `tasksPostId`, `lastTasksContent`,
//! `tasksCompleted`, `tasksMinimized`, and renders either a full table or a
//! progress bar.

use crate::content::format::Formatter;
use crate::platform::PlatformDyn;
use crate::{Task, TaskStatus};
use std::sync::Arc;
use tokio::sync::Mutex;

struct State {
    tasks_post_id: Option<String>,
    last_tasks_content: String,
    tasks_completed: bool,
    tasks_minimized: bool,
}

pub struct TaskListExecutor {
    channel: String,
    thread_root: Option<String>,
    formatter: Arc<dyn Formatter + Send + Sync>,
    state: Mutex<State>,
}

impl TaskListExecutor {
    pub fn new(channel: String, thread_root: Option<String>, formatter: Arc<dyn Formatter + Send + Sync>) -> Self {
        Self {
            channel,
            thread_root,
            formatter,
            state: Mutex::new(State {
                tasks_post_id: None,
                last_tasks_content: String::new(),
                tasks_completed: false,
                tasks_minimized: false,
            }),
        }
    }

    pub async fn set_minimized(&self, minimized: bool) {
        self.state.lock().await.tasks_minimized = minimized;
    }

    pub async fn update(&self, platform: &Arc<dyn PlatformDyn>, tasks: Vec<Task>) -> crate::Result<()> {
        let completed = !tasks.is_empty() && tasks.iter().all(|t| t.status == TaskStatus::Completed);
        let mut state = self.state.lock().await;
        state.tasks_completed = completed;

        let content = if completed || state.tasks_minimized {
            render_progress_bar(&tasks)
        } else {
            render_table(self.formatter.as_ref(), &tasks)
        };

        if content == state.last_tasks_content {
            return Ok(());
        }

        match state.tasks_post_id.clone() {
            Some(id) => {
                platform.update_post(&id, &content).await?;
            }
            None => {
                let handle = platform
                    .create_post(&self.channel, &content, self.thread_root.as_deref())
                    .await?;
                state.tasks_post_id = Some(handle.id);
            }
        }
        state.last_tasks_content = content;
        Ok(())
    }

    /// Hand over the current tasks post id so the content executor can
    /// repurpose it for an overflow post instead of creating a fresh one.
    pub async fn take_post_id_for_reuse(&self) -> Option<String> {
        self.state.lock().await.tasks_post_id.take()
    }

    /// Give back an id that `take_post_id_for_reuse` handed out but the
    /// caller ended up not consuming.
    pub async fn restore_post_id(&self, id: String) {
        let mut state = self.state.lock().await;
        if state.tasks_post_id.is_none() {
            state.tasks_post_id = Some(id);
        }
    }

    /// Delete the current tasks post and recreate it, so the task list is
    /// always the last bot post in the thread.
    pub async fn bump_to_bottom(&self, platform: &Arc<dyn PlatformDyn>) -> crate::Result<()> {
        let mut state = self.state.lock().await;
        if let Some(id) = state.tasks_post_id.take() {
            platform.delete_post(&id).await?;
        }
        if state.last_tasks_content.is_empty() {
            return Ok(());
        }
        let handle = platform
            .create_post(&self.channel, &state.last_tasks_content.clone(), self.thread_root.as_deref())
            .await?;
        state.tasks_post_id = Some(handle.id);
        Ok(())
    }
}

fn render_progress_bar(tasks: &[Task]) -> String {
    let total = tasks.len();
    let done = tasks.iter().filter(|t| t.status == TaskStatus::Completed).count();
    let filled = if total == 0 { 0 } else { (done * 10) / total };
    let bar: String = (0..10).map(|i| if i < filled { '█' } else { '░' }).collect();
    format!("{bar} {done}/{total} tasks complete")
}

fn render_table(formatter: &dyn Formatter, tasks: &[Task]) -> String {
    let rows: Vec<Vec<String>> = tasks
        .iter()
        .map(|t| {
            let icon = match t.status {
                TaskStatus::Pending => "⬜",
                TaskStatus::InProgress => "🔄",
                TaskStatus::Completed => "✅",
            };
            vec![icon.to_string(), t.content.clone()]
        })
        .collect();
    formatter.format_table(&["", "Task"], &rows)
}
