use anyhow::{Context, Result};
use client_core::{load_settings, MenuClient, MenuScreen, QueryKey, ScreenView};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_view(view: &ScreenView) {
    match view {
        ScreenView::Loading { label } => println!("{label}"),
        ScreenView::Error { message } => println!("{message}"),
        ScreenView::Ready {
            rows,
            chips,
            placeholder,
            submit,
        } => {
            for row in rows {
                let mark = if row.selected { "*" } else { " " };
                println!("[{mark}] {}", row.name);
            }
            match placeholder {
                Some(text) => println!("Selected: {text}"),
                None => println!("Selected: {}", chips.join(" | ")),
            }
            let state = if submit.enabled { "" } else { " (disabled)" };
            println!("<{}>{state}", submit.label);
        }
    }
}

/// Walks the menu screen once: load, pick everything but the first item,
/// order, and show the screen afterwards.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    info!(use_mock = settings.use_mock, "starting menu demo");
    let client = MenuClient::from_settings(&settings).context("failed to build menu client")?;
    let mut screen = MenuScreen::new(client.clone());

    print_view(&screen.render().await);
    client.queries().settle(QueryKey::Menus).await;

    let view = screen.render().await;
    print_view(&view);
    let ScreenView::Ready { rows, .. } = view else {
        return Ok(());
    };

    for row in &rows {
        screen.select(row.name.clone());
    }
    if let Some(first) = rows.first() {
        screen.remove(&first.name);
    }
    print_view(&screen.render().await);

    let notification = screen.submit().await;
    println!("[{}] {}", notification.title, notification.message);
    print_view(&screen.render().await);

    Ok(())
}
