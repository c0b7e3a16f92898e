use push_notify_flow::prelude::*;

fn parse_permission(value: &str) -> PermissionStatus {
    match value {
        "granted" => PermissionStatus::Granted,
        "denied" => PermissionStatus::Denied,
        _ => PermissionStatus::Undetermined,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    set_notification_handler(NotificationHandler::default())?;
    let config = ScreenConfig::from_env()?;

    // DEMO_SIMULATOR=1 pretends to run in a simulator,
    // DEMO_USER_DECISION=denied makes the user refuse the permission dialog
    let platform = LocalPlatformBuilder::new()
        .physical_device(std::env::var("DEMO_SIMULATOR").is_err())
        .user_decision(parse_permission(
            &std::env::var("DEMO_USER_DECISION").unwrap_or_else(|_| "granted".to_string()),
        ))
        .build();

    let screen = PushScreen::new(platform, config);
    screen.activate().await?;
    println!("{}", screen.render()?);

    for alert in screen.platform().alerts() {
        println!("⚠️  {}: {}", alert.title, alert.message);
    }

    // Press the button once
    let mut changes = screen.subscribe();
    let id = screen.send_local_test_notification().await?;
    println!("📳 Scheduled notification {id}");

    tokio::time::timeout(
        tokio::time::Duration::from_secs(5),
        changes.wait_for(|state| state.last_notification.is_some()),
    )
    .await??;
    println!("{}", screen.render()?);

    screen.deactivate()?;
    Ok(())
}
