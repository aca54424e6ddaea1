//! Example: Analyze a WAV file and print the role view
//!
//! Usage: `cargo run --example analyze_wav -- <file.wav> [guest|free|pro] [config.json]`

use bnk_analysis_engine::{run_analysis, AnalysisInput, EngineConfig, LogObserver, Role, RunOptions};
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let path = match args.next() {
        Some(p) => PathBuf::from(p),
        None => {
            eprintln!("Usage: analyze_wav <file.wav> [guest|free|pro] [config.json]");
            std::process::exit(2);
        }
    };
    let role: Role = args.next().as_deref().unwrap_or("pro").parse()?;
    let config = match args.next() {
        Some(config_path) => EngineConfig::from_json(&std::fs::read_to_string(config_path)?)?,
        None => EngineConfig::default(),
    };

    match run_analysis(
        AnalysisInput::Path(path),
        role,
        &config,
        &LogObserver,
        RunOptions::default(),
    ) {
        Ok(output) => {
            println!("{}", output.to_json_pretty()?);
            Ok(())
        }
        Err(e) => {
            let body = e.to_boundary(uuid::Uuid::new_v4());
            eprintln!("{}", serde_json::to_string_pretty(&body)?);
            std::process::exit(1);
        }
    }
}
