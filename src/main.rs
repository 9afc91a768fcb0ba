use crossterm::style::Stylize;
use nlsql_cli::config::Config;
use nlsql_cli::utils::app_paths::AppPaths;
use nlsql_cli::utils::logging::init_tracing;
use tracing::{info, warn};

fn print_usage() {
    println!("{}", "nlsql-cli - natural language to SQL".blue().bold());
    println!();
    println!("{}", "Usage:".yellow());
    println!("  nlsql-cli [OPTIONS]");
    println!();
    println!("{}", "Options:".yellow());
    println!(
        "  {}     - Backend base URL for this session",
        "--api-url <URL>".green()
    );
    println!("  {}           - Use the line-mode interface", "--classic".green());
    println!(
        "  {}       - Initialize configuration with wizard",
        "--init-config".green()
    );
    println!(
        "  {}   - Generate config file with defaults",
        "--generate-config".green()
    );
    println!("  {}              - Show this help", "--help".green());
    println!();
    println!("{}", "TUI keys:".yellow());
    println!("  {}        - Switch between upload and query panels", "Tab".green());
    println!("  {}      - Select the file path typed in the upload panel", "Enter".green());
    println!("  {}  - Load question template n", "Alt+1..6".green());
    println!("  {}     - Run the generated SQL", "Ctrl+R".green());
    println!("  {}     - Copy the generated SQL", "Ctrl+Y".green());
    println!("  {}     - Export results to CSV", "Ctrl+E".green());
    println!("  {}     - Remove the attached file", "Ctrl+X".green());
    println!("  {}         - Show logs", "F5".green());
    println!("  {}     - Quit", "Ctrl+Q".green());
    println!();
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    // Check for config initialization
    if args.contains(&"--init-config".to_string()) {
        match Config::init_wizard() {
            Ok(config) => {
                println!("\nConfiguration initialized successfully!");
                if !config.display.use_glyphs {
                    println!("Note: Simple mode enabled (ASCII icons)");
                }
                return Ok(());
            }
            Err(e) => {
                eprintln!("Error initializing config: {}", e);
                std::process::exit(1);
            }
        }
    }

    // Check for config file generation
    if args.contains(&"--generate-config".to_string()) {
        match Config::get_config_path() {
            Ok(path) => {
                if let Some(parent) = path.parent() {
                    if let Err(e) = std::fs::create_dir_all(parent) {
                        eprintln!("Error creating config directory: {}", e);
                        std::process::exit(1);
                    }
                }
                if let Err(e) = std::fs::write(&path, Config::create_default_with_comments()) {
                    eprintln!("Error writing config file: {}", e);
                    std::process::exit(1);
                }
                println!("Configuration file created at: {:?}", path);
                return Ok(());
            }
            Err(e) => {
                eprintln!("Error determining config path: {}", e);
                std::process::exit(1);
            }
        }
    }

    let log_dir = AppPaths::log_dir().ok();
    let logging = init_tracing(log_dir.as_deref());
    if let Some(path) = &logging.log_path {
        eprintln!("Debug logs will be written to:");
        eprintln!("   {}", path.display());
    }

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!(target: "system", "Falling back to default config: {}", e);
            Config::default()
        }
    };

    if let Some(pos) = args.iter().position(|a| a == "--api-url") {
        match args.get(pos + 1) {
            Some(url) if !url.starts_with("--") => config.api.base_url = url.clone(),
            _ => {
                eprintln!("{}", "--api-url requires a URL".red());
                std::process::exit(2);
            }
        }
    }

    if args.contains(&"--classic".to_string()) {
        info!(target: "system", "Starting classic mode");
        return nlsql_cli::classic::run_classic(config);
    }

    info!(target: "system", "Starting TUI");
    if let Err(e) = nlsql_cli::ui::run_tui(config, Some(logging.buffer)) {
        eprintln!("TUI Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
