// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kvitto - a WhatsApp receipt bot with a usage paywall.
//!
//! This is the binary entry point. `kvitto serve` runs the bot;
//! `kvitto config` reports the resolved configuration and whether the
//! credentials serving would need are in place.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use clap::{Parser, Subcommand};
use kvitto_config::KvittoConfig;

/// Kvitto - conversational receipt bot for WhatsApp.
#[derive(Parser, Debug)]
#[command(name = "kvitto", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the bot: channel loop, webhook gateway, paywall reconciler.
    Serve,
    /// Show the resolved configuration and check serve credentials.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match kvitto_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            kvitto_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("kvitto serve failed: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            print_config_report(&config);
            if let Err(errors) = kvitto_config::validate_serve_credentials(&config) {
                kvitto_config::render_errors(&errors);
                std::process::exit(1);
            }
            println!("\nserve credentials: ok");
        }
        None => {
            println!("kvitto: use --help for available commands");
        }
    }
}

/// Print the resolved configuration with secrets reduced to set/unset.
fn print_config_report(config: &KvittoConfig) {
    fn presence(value: &str) -> &'static str {
        if value.is_empty() { "unset" } else { "set" }
    }

    println!("kvitto configuration");
    println!("  bot.log_level          = {}", config.bot.log_level);
    println!(
        "  bot.admin_addresses    = {} configured",
        config.bot.admin_addresses.len()
    );
    println!(
        "  bot.reply_delay_ms     = {} (+{} jitter)",
        config.bot.reply_delay_ms, config.bot.reply_jitter_ms
    );
    println!("  storage.database_path  = {}", config.storage.database_path);
    println!("  whatsapp.api_base      = {}", config.whatsapp.api_base);
    println!(
        "  whatsapp.access_token  = {}",
        presence(&config.whatsapp.access_token)
    );
    println!(
        "  whatsapp.phone_number_id = {}",
        presence(&config.whatsapp.phone_number_id)
    );
    println!(
        "  whatsapp.verify_token  = {}",
        presence(&config.whatsapp.verify_token)
    );
    println!(
        "  whatsapp.app_secret    = {}",
        presence(&config.whatsapp.app_secret)
    );
    println!(
        "  render.template_base_url = {}",
        config.render.template_base_url
    );
    println!(
        "  render.screenshot_base_url = {}",
        config.render.screenshot_base_url
    );
    println!("  render.api_key         = {}", presence(&config.render.api_key));
    println!("  render.width           = {}", config.render.width);
    println!("  media.api_base         = {}", config.media.api_base);
    println!("  media.api_key          = {}", presence(&config.media.api_key));
    println!("  payments.api_base      = {}", config.payments.api_base);
    println!("  payments.api_key       = {}", presence(&config.payments.api_key));
    println!(
        "  payments.secret_key    = {}",
        presence(&config.payments.secret_key)
    );
    println!(
        "  payments.business_id   = {}",
        presence(&config.payments.business_id)
    );
    println!(
        "  payments.webhook_secret = {}",
        presence(&config.payments.webhook_secret)
    );
    println!(
        "  gateway                = {}:{}",
        config.gateway.host, config.gateway.port
    );
    println!(
        "  gateway.admin_secret   = {}",
        presence(&config.gateway.admin_secret)
    );
}
