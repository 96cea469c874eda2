//! Task command handlers.
//!
//! Every command passes the route guard first, exactly like navigating to
//! the matching screen, and then goes through the task store.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{ContentArrangement, Table};
use td_core::router::{Navigation, Route, RouteGuard};
use td_core::types::{RecordId, Task, TaskDraft, TaskStatus, UploadFile};
use td_core::{AppContext, StoreError};
use tokio_util::sync::CancellationToken;

/// Field changes requested on the command line.
#[derive(Debug, Default)]
pub struct DraftChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub effort: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
}

impl DraftChanges {
    /// Applies the changes on top of `base`.
    ///
    /// # Errors
    /// Returns an error if the effort is negative or the title ends up blank.
    fn apply(self, base: TaskDraft) -> Result<TaskDraft> {
        if let Some(effort) = self.effort
            && !(effort.is_finite() && effort >= 0.0)
        {
            anyhow::bail!("Effort must be a non-negative number");
        }
        let draft = TaskDraft {
            title: self.title.map_or(base.title, |t| t.trim().to_string()),
            description: self.description.unwrap_or(base.description),
            effort: self.effort.or(base.effort),
            due_date: self.due_date.or(base.due_date),
            status: self.status.unwrap_or(base.status),
        };
        if draft.title.is_empty() {
            anyhow::bail!("Title is required");
        }
        Ok(draft)
    }
}

fn require_session(ctx: &AppContext, route: Route) -> Result<()> {
    match RouteGuard::check(route, ctx.session.as_ref()) {
        Navigation::Allowed(_) => Ok(()),
        Navigation::Redirected { .. } => {
            anyhow::bail!("Not logged in: log in first with `td login --email <EMAIL>`")
        }
    }
}

/// Wraps a store failure with the message the store recorded for it.
fn store_failure(ctx: &AppContext, err: StoreError) -> anyhow::Error {
    let message = ctx.tasks.error().unwrap_or_else(|| err.to_string());
    anyhow::Error::new(err).context(message)
}

/// Fetches the collection, failing with the store's message if it could not.
async fn fetch(ctx: &AppContext) -> Result<Vec<Task>> {
    ctx.tasks.fetch_tasks(&CancellationToken::new()).await;
    match ctx.tasks.error() {
        Some(message) => Err(anyhow::anyhow!(message)),
        None => Ok(ctx.tasks.tasks()),
    }
}

pub async fn list(ctx: &AppContext, json: bool) -> Result<()> {
    require_session(ctx, Route::Tasks)?;
    let tasks = fetch(ctx).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&tasks).context("serialize tasks")?
        );
    } else if tasks.is_empty() {
        println!("No tasks found.");
    } else {
        println!("{}", task_table(&tasks));
    }
    Ok(())
}

fn task_table(tasks: &[Task]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(["ID", "Title", "Status", "Effort", "Due"]);
    for task in tasks {
        table.add_row([
            task.id.to_string(),
            task.title.clone(),
            task.status.label().to_string(),
            task.effort.map(|e| e.to_string()).unwrap_or_default(),
            task.due_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        ]);
    }
    table
}

pub async fn add(ctx: &AppContext, changes: DraftChanges) -> Result<()> {
    require_session(ctx, Route::NewTask)?;
    let draft = changes.apply(TaskDraft::default())?;

    let task = ctx
        .tasks
        .create_task(&draft, &CancellationToken::new())
        .await
        .map_err(|e| store_failure(ctx, e))?;
    println!("Created task {}: {}", task.id, task.title);
    Ok(())
}

/// Sends the full task back with the requested fields changed.
pub async fn update(ctx: &AppContext, id: &RecordId, changes: DraftChanges) -> Result<()> {
    require_session(ctx, Route::Tasks)?;
    let tasks = fetch(ctx).await?;
    let current = tasks
        .iter()
        .find(|t| &t.id == id)
        .with_context(|| format!("No task with id {id}"))?;
    let draft = changes.apply(TaskDraft::from(current))?;

    let task = ctx
        .tasks
        .update_task(id, &draft, &CancellationToken::new())
        .await
        .map_err(|e| store_failure(ctx, e))?;
    println!("Updated task {}: {} ({})", task.id, task.title, task.status);
    Ok(())
}

pub async fn delete(ctx: &AppContext, id: &RecordId) -> Result<()> {
    require_session(ctx, Route::Tasks)?;
    ctx.tasks
        .delete_task(id, &CancellationToken::new())
        .await
        .map_err(|e| store_failure(ctx, e))?;
    println!("Deleted task {id}");
    Ok(())
}

pub async fn import(ctx: &AppContext, file: &Path) -> Result<()> {
    require_session(ctx, Route::Tasks)?;
    let upload = UploadFile::from_path(file)
        .with_context(|| format!("read {}", file.display()))?;

    ctx.tasks
        .import_tasks(upload, &CancellationToken::new())
        .await
        .map_err(|e| store_failure(ctx, e))?;
    // The refresh after an accepted upload reports through the error field.
    if let Some(message) = ctx.tasks.error() {
        anyhow::bail!("Import accepted, but {message}");
    }
    println!("Imported. {} tasks now.", ctx.tasks.tasks().len());
    Ok(())
}

pub async fn export(ctx: &AppContext) -> Result<()> {
    require_session(ctx, Route::Tasks)?;
    match ctx.tasks.export_tasks(&CancellationToken::new()).await {
        Some(path) => {
            println!("Saved {}", path.display());
            Ok(())
        }
        None => Err(download_failure(ctx)),
    }
}

pub async fn template(ctx: &AppContext) -> Result<()> {
    require_session(ctx, Route::Tasks)?;
    match ctx.tasks.download_template(&CancellationToken::new()).await {
        Some(path) => {
            println!("Saved {}", path.display());
            Ok(())
        }
        None => Err(download_failure(ctx)),
    }
}

fn download_failure(ctx: &AppContext) -> anyhow::Error {
    anyhow::anyhow!(
        ctx.tasks
            .error()
            .unwrap_or_else(|| "Download failed".to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changes_keep_unset_fields() {
        let base = TaskDraft {
            title: "Old".to_string(),
            description: "keep".to_string(),
            effort: Some(2.0),
            due_date: NaiveDate::from_ymd_opt(2026, 1, 2),
            status: TaskStatus::Pending,
        };
        let changes = DraftChanges {
            status: Some(TaskStatus::Completed),
            ..DraftChanges::default()
        };

        let draft = changes.apply(base.clone()).unwrap();

        assert_eq!(
            draft,
            TaskDraft {
                status: TaskStatus::Completed,
                ..base
            }
        );
    }

    #[test]
    fn test_changes_reject_blank_title_and_negative_effort() {
        assert!(DraftChanges::default().apply(TaskDraft::default()).is_err());
        let changes = DraftChanges {
            title: Some("T".to_string()),
            effort: Some(-1.0),
            ..DraftChanges::default()
        };
        assert!(changes.apply(TaskDraft::default()).is_err());
    }
}
