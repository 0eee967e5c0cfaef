use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
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
    // Gateway and provider credentials live in the database, so none of these are secret
    const DISPLAY_ENVS: [&str; 14] = [
        "RUST_LOG",
        "SMM_HOST",
        "SMM_PORT",
        "SMM_DATABASE_URL",
        "SMM_RUN_MIGRATIONS",
        "SMM_REMOTE_TIMEOUT_SECS",
        "SMM_COMMENTS_RANGE_POLICY",
        "SMM_DEPOSIT_RETURN_URL",
        "SMM_DEPOSIT_CANCEL_URL",
        "SMM_CRYPTOMUS_CALLBACK_URL",
        "SMM_RECONCILE_INTERVAL",
        "SMM_PAYPAL_SANDBOX_URL",
        "SMM_PAYPAL_LIVE_URL",
        "SMM_CRYPTOMUS_URL",
    ];

    println!("Current environment values:");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
