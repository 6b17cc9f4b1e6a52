use anyhow::Result;
use clap::Parser;
use dashboard_core::{ControllerConfig, FetchStatus, ListController, ListEvent};
use shared::domain::UserStatus;
use tokio::sync::broadcast;
use tracing::info;
use url::Url;

mod settings;

#[derive(Parser, Debug)]
struct Args {
    /// Dashboard API base URL, e.g. http://127.0.0.1:8000/api
    #[arg(long)]
    server_url: Option<Url>,
    #[arg(long)]
    school_id: Option<i64>,
    #[arg(long)]
    tenant_id: Option<String>,
    /// List to show: "users" or "announcements"
    #[arg(long, default_value = "users")]
    view: String,
    /// Search text typed before the first read, goes through the debounce
    #[arg(long)]
    search: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = settings::load_settings();
    if let Some(server_url) = &args.server_url {
        settings.server_url = server_url.as_str().trim_end_matches('/').to_string();
    }
    if let Some(school_id) = args.school_id {
        settings.school_id = school_id;
    }
    if let Some(tenant_id) = args.tenant_id {
        settings.tenant_id = tenant_id;
    }
    info!(
        server_url = %settings.server_url,
        tenant = %settings.tenant_id,
        view = %args.view,
        "console: starting"
    );

    let config = settings.controller_config();
    match args.view.as_str() {
        "announcements" => show_announcements(config).await,
        _ => show_users(config, args.search).await,
    }
}

async fn show_users(config: ControllerConfig, search: Option<String>) -> Result<()> {
    let controller = ListController::users(config);
    let mut events = controller.subscribe_events();

    match search {
        Some(text) => {
            controller.set_search(text).await;
            wait_until_settled(&mut events).await?;
        }
        None => controller.refresh().await,
    }

    let rows = controller.rows().await;
    let (active, inactive) = controller.status_counts().await;
    println!(
        "{} of {} users (active {active}, inactive {inactive})",
        rows.len(),
        controller.total_rows().await
    );
    for row in &rows {
        let status = match row.status {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        };
        println!(
            "  #{:<5} {:<24} {:<30} [{}] {status}",
            row.id.0,
            row.full_name,
            row.email,
            row.role_names().join(", ")
        );
    }

    let roles = controller.assignable_roles().await?;
    println!(
        "assignable roles: {}",
        roles
            .iter()
            .map(|role| role.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    print_notices(&mut events);
    Ok(())
}

async fn show_announcements(config: ControllerConfig) -> Result<()> {
    let controller = ListController::announcements(config);
    let mut events = controller.subscribe_events();

    controller.refresh().await;

    let rows = controller.rows().await;
    println!("{} announcements", rows.len());
    for row in &rows {
        let posted = row
            .created_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  #{:<5} {:<32} {} attachment(s), posted {posted}",
            row.id.0,
            row.title,
            row.attachments.len()
        );
    }

    print_notices(&mut events);
    Ok(())
}

async fn wait_until_settled(events: &mut broadcast::Receiver<ListEvent>) -> Result<()> {
    loop {
        match events.recv().await? {
            ListEvent::StatusChanged(FetchStatus::Success | FetchStatus::Error) => return Ok(()),
            ListEvent::Notice { level, message } => println!("[{level:?}] {message}"),
            _ => {}
        }
    }
}

fn print_notices(events: &mut broadcast::Receiver<ListEvent>) {
    while let Ok(event) = events.try_recv() {
        if let ListEvent::Notice { level, message } = event {
            println!("[{level:?}] {message}");
        }
    }
}
