//! CLI handlers for browsing projects, sources and notes.

use super::auth::orchestrator;
use crate::api::ApiError;
use crate::auth::{AuthOrchestrator, Credential};
use crate::config::FishchiConfig;
use crate::error::{FishchiError, Result};

const NOTE_PREVIEW_CHARS: usize = 120;

/// Handle `fishchi projects`.
pub async fn handle_projects(config: &FishchiConfig) -> Result<()> {
    let (auth, token) = session(config).await?;
    let projects = logout_if_unauthorized(&auth, auth.api().projects(&token).await).await?;

    if projects.is_empty() {
        println!("No projects yet.");
        return Ok(());
    }
    for project in &projects {
        match project.description.as_deref().filter(|d| !d.is_empty()) {
            Some(description) => println!("{}  {} - {}", project.id, project.name, description),
            None => println!("{}  {}", project.id, project.name),
        }
    }
    Ok(())
}

/// Handle `fishchi sources <project-id>`.
pub async fn handle_sources(config: &FishchiConfig, project_id: &str) -> Result<()> {
    let (auth, token) = session(config).await?;
    let sources =
        logout_if_unauthorized(&auth, auth.api().sources(&token, project_id).await).await?;

    if sources.is_empty() {
        println!("No sources in this project.");
        return Ok(());
    }
    for source in &sources {
        println!("{}  {}  {}", source.id, source.citation_label(), source.title);
    }
    Ok(())
}

/// Handle `fishchi notes <project-id> <source-id>`.
pub async fn handle_notes(config: &FishchiConfig, project_id: &str, source_id: &str) -> Result<()> {
    let (auth, token) = session(config).await?;
    let notes = logout_if_unauthorized(
        &auth,
        auth.api().notes(&token, project_id, source_id).await,
    )
    .await?;

    if notes.is_empty() {
        println!("No notes on this source.");
        return Ok(());
    }
    for note in &notes {
        println!("{}  {}", note.id, preview(&note.content));
        if !note.tags.is_empty() {
            println!("    tags: {}", note.tags.join(", "));
        }
    }
    Ok(())
}

/// Restore the stored session; fails with [`FishchiError::NotLoggedIn`] without one.
async fn session(config: &FishchiConfig) -> Result<(AuthOrchestrator, Credential)> {
    let auth = orchestrator(config);
    auth.restore().await;
    let token = auth.credential().ok_or(FishchiError::NotLoggedIn)?;
    Ok((auth, token))
}

/// A 401 from the service logs the user out before the error is returned.
async fn logout_if_unauthorized<T>(
    auth: &AuthOrchestrator,
    result: std::result::Result<T, ApiError>,
) -> Result<T> {
    match result {
        Err(ApiError::Unauthorized) => {
            tracing::warn!("service rejected the stored credential, logging out");
            if auth.logout().await.is_err() {
                tracing::warn!("credential removal task did not complete");
            }
            Err(ApiError::Unauthorized.into())
        }
        other => Ok(other?),
    }
}

/// Note text with markup stripped and whitespace collapsed, shortened for listing.
fn preview(content: &str) -> String {
    let mut text = String::with_capacity(content.len());
    let mut in_tag = false;
    for c in content.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() <= NOTE_PREVIEW_CHARS {
        return line;
    }
    let cut: String = line.chars().take(NOTE_PREVIEW_CHARS).collect();
    format!("{}...", cut.trim_end())
}
