use std::{env, env::VarError};

/// There's no real CLI for the server. Any argument prints the help text and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 22] = [
        "RUST_LOG",
        "MKT_HOST",
        "MKT_PORT",
        "MKT_DATABASE_URL",
        "MKT_CURRENCY",
        "MKT_COMMISSION_RATE",
        "MKT_ENFORCE_DELIVERY_ADDRESS",
        "MKT_FREE_DELIVERY_THRESHOLD",
        "MKT_DELIVERY_BASE_FEE",
        "MKT_DELIVERY_PER_KM_RATE",
        "MKT_DELIVERY_MAX_FEE",
        "MKT_DELIVERY_MAX_DISTANCE_KM",
        "MKT_DELIVERY_ORIGIN_LAT",
        "MKT_DELIVERY_ORIGIN_LNG",
        "MKT_PAYSTACK_BASE_URL",
        "MKT_PAYSTACK_CALLBACK_URL",
        "MKT_PAYSTACK_TIMEOUT_SECS",
        "MKT_OVERDUE_DELIVERY_DAYS",
        "MKT_OVERDUE_CHECK_INTERVAL_SECS",
        "MKT_NOTIFICATION_MAX_ATTEMPTS",
        "MKT_NOTIFICATION_INITIAL_BACKOFF_MS",
        "MKT_NOTIFICATION_BUFFER",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<40} {val:<15}");
    })
}
