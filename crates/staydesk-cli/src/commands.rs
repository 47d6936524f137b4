use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use staydesk_core::forms::{self, submit};
use staydesk_core::models::{list_items, record_id};
use staydesk_core::session::sign_in;
use staydesk_core::{
    gate, BookingStatus, Config, Credentials, DetailView, EnquiryStatus, FormValue, FormValues,
    GateDecision, ListParams, ListView, Mutation, Notifier, Resource, ReviewStatus, Schema,
    SubmitOutcome, ViewState,
};

use crate::app::{App, TerminalNotifier};

pub async fn login(app: &App, email: String, password: String) -> Result<()> {
    if let GateDecision::Redirect(to) = gate("/", app.session.has_auth_cookie()) {
        println!("Already signed in; continue at {}", to);
        return Ok(());
    }

    match sign_in(&app.slice, &app.session, Credentials { email, password }).await {
        Ok(stored) => {
            TerminalNotifier.success("Signed in");
            println!(
                "Session valid until {}",
                stored.expires_at.format("%Y-%m-%d")
            );
            Ok(())
        }
        Err(err) => {
            TerminalNotifier.error(&err.user_message());
            Err(err.into())
        }
    }
}

pub fn logout(app: &App) -> Result<()> {
    app.session.logout()?;
    TerminalNotifier.success("Signed out");
    Ok(())
}

pub fn check_gate(app: &App, path: &str) {
    match gate(path, app.session.has_auth_cookie()) {
        GateDecision::Allow => println!("allow {}", path),
        GateDecision::Redirect(to) => println!("redirect {} -> {}", path, to),
    }
}

pub struct ListArgs {
    pub resource: Resource,
    pub page: u32,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub filters: Vec<(String, String)>,
}

pub async fn list(app: &App, args: ListArgs) -> Result<()> {
    app.require_session(&format!("/{}", args.resource))?;

    let mut params = ListParams::with_limit(args.limit.unwrap_or(app.config.ui.page_size));
    if let Some(search) = &args.search {
        params.set_search(search);
    }
    for (key, value) in &args.filters {
        params.set_filter(key, Some(value));
    }
    params.set_page(args.page);

    let view = ListView::mount(app.slice.clone(), args.resource, params)?;
    let data = ready(view.settled().await)?;

    let rows = list_items(&data);
    if rows.is_empty() {
        println!("No {} found", args.resource);
        return Ok(());
    }
    for row in rows {
        let id = record_id(row).unwrap_or_else(|| "-".to_string());
        println!("{:<26} {}", id, summary(row));
    }
    println!("page {} ({} rows)", view.params().page, rows.len());
    Ok(())
}

pub async fn show(app: &App, resource: Resource, id: &str) -> Result<()> {
    app.require_session(&format!("/{}/{}", resource, id))?;

    let view = DetailView::mount(&app.slice, resource, id)?;
    let data = ready(view.settled().await)?;
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

pub async fn delete(app: &App, resource: Resource, id: &str) -> Result<()> {
    app.require_session(&format!("/{}", resource))?;
    let message = format!("Deleted {} {}", resource, id);
    app.slice
        .mutate_with_toast(resource.delete_mutation(id), &TerminalNotifier, &message)
        .await?;
    Ok(())
}

pub async fn booking_status(app: &App, id: &str, status: &str) -> Result<()> {
    app.require_session(&format!("/bookings/{}", id))?;
    let status: BookingStatus = status.parse().map_err(|e: String| anyhow!(e))?;
    let mutation = Mutation::UpdateBookingStatus {
        id: id.to_string(),
        status,
    };
    app.slice
        .mutate_with_toast(mutation, &TerminalNotifier, "Booking status updated")
        .await?;
    Ok(())
}

pub async fn enquiry_status(app: &App, id: &str, status: &str) -> Result<()> {
    app.require_session(&format!("/enquiries/{}", id))?;
    let status: EnquiryStatus = status.parse().map_err(|e: String| anyhow!(e))?;
    let mutation = Mutation::UpdateEnquiryStatus {
        id: id.to_string(),
        status,
    };
    app.slice
        .mutate_with_toast(mutation, &TerminalNotifier, "Enquiry status updated")
        .await?;
    Ok(())
}

pub async fn review_status(app: &App, id: &str, status: &str) -> Result<()> {
    app.require_session(&format!("/reviews/{}", id))?;
    let status: ReviewStatus = status.parse().map_err(|e: String| anyhow!(e))?;
    let mutation = Mutation::UpdateReviewStatus {
        id: id.to_string(),
        status,
    };
    app.slice
        .mutate_with_toast(mutation, &TerminalNotifier, "Review status updated")
        .await?;
    Ok(())
}

pub async fn create_property(
    app: &App,
    fields: Vec<(String, String)>,
    images: Vec<PathBuf>,
) -> Result<()> {
    app.require_session("/properties/new")?;

    let mut values: FormValues = fields
        .into_iter()
        .map(|(k, v)| (k, FormValue::Text(v)))
        .collect();
    if !images.is_empty() {
        let files = images
            .iter()
            .map(|p| read_image(p))
            .collect::<Result<Vec<_>>>()?;
        values.insert("images".to_string(), FormValue::List(files));
    }

    let outcome = submit(
        &app.slice,
        &TerminalNotifier,
        &Schema::property(),
        &values,
        "Property created",
        |v| Mutation::CreateProperty(forms::to_multipart(v)),
    )
    .await;

    match outcome {
        SubmitOutcome::Done(created) => {
            let id = record_id(&created).or_else(|| created.get("data").and_then(record_id));
            if let Some(id) = id {
                println!("id: {}", id);
            }
            Ok(())
        }
        SubmitOutcome::Invalid(errors) => {
            for (field, messages) in &errors.fields {
                for message in messages {
                    eprintln!("  {}: {}", field, message);
                }
            }
            bail!("Form has {} invalid field(s)", errors.fields.len())
        }
        SubmitOutcome::Failed(message) => bail!(message),
    }
}

pub async fn plan(app: &App, select: Option<String>) -> Result<()> {
    let plans = app.plans();
    let mut current = plans.rehydrate().await;

    match select {
        Some(name) => {
            current.selected_plan = Some(name);
            plans.persist(&current)?;
            TerminalNotifier.success("Plan saved");
        }
        None => match &current.selected_plan {
            Some(name) => println!("Selected plan: {}", name),
            None => println!("No plan selected"),
        },
    }
    Ok(())
}

pub fn show_config(app: &App) -> Result<()> {
    print!("{}", app.config.to_toml()?);
    Ok(())
}

pub fn init_config(force: bool) -> Result<()> {
    let path = Config::config_path()?;
    if Config::default().write_to(&path, force)? {
        println!("Wrote {}", path.display());
    } else {
        println!("{} already exists, pass --force to replace it", path.display());
    }
    Ok(())
}

/// Unwrap a settled view or surface its error branch
fn ready(state: ViewState) -> Result<Value> {
    match state {
        ViewState::Ready(data) => Ok(data),
        ViewState::Failed { message, not_found } if not_found => {
            bail!("Not found: {}", message)
        }
        ViewState::Failed { message, .. } => bail!(message),
        ViewState::Loading => bail!("Request did not settle"),
    }
}

/// One-line rendering of a record for list output
fn summary(row: &Value) -> String {
    const LABELS: [&str; 5] = ["title", "name", "email", "status", "location"];
    let parts: Vec<String> = LABELS
        .iter()
        .filter_map(|k| row.get(*k).and_then(Value::as_str).map(|v| format!("{}={}", k, v)))
        .collect();
    if parts.is_empty() {
        row.to_string()
    } else {
        parts.join("  ")
    }
}

fn read_image(path: &Path) -> Result<FormValue> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();
    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    };
    Ok(FormValue::File {
        file_name,
        mime: mime.to_string(),
        bytes,
    })
}

/// `key=value` argument parser for clap
pub fn parse_pair(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    if key.trim().is_empty() {
        return Err(format!("missing key in '{}'", raw));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            parse_pair("status=pending"),
            Ok(("status".to_string(), "pending".to_string()))
        );
        assert_eq!(
            parse_pair("q=a=b"),
            Ok(("q".to_string(), "a=b".to_string()))
        );
        assert!(parse_pair("status").is_err());
        assert!(parse_pair("=x").is_err());
    }

    #[test]
    fn test_summary_prefers_known_fields() {
        let row = json!({"_id": "p1", "title": "Cliff House", "status": "active", "price": 240});
        assert_eq!(summary(&row), "title=Cliff House  status=active");
        assert_eq!(summary(&json!({"price": 1})), r#"{"price":1}"#);
    }

    #[test]
    fn test_ready_surfaces_error_branch() {
        let err = ready(ViewState::Failed {
            message: "Booking not found".into(),
            not_found: true,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Not found: Booking not found");
    }
}
