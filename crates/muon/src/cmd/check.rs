//! Check command - print the resolved configuration
//!
//! Loading already validated the configuration; this only reports it.

use muon_config::Config;
use muon_sources::DeviceSource;

/// Run the check command
pub fn run(config: &Config) {
    println!("configuration ok");
    println!();
    println!("sources:");
    for source in &config.sources {
        let endpoint = match DeviceSource::from_config(source) {
            Ok(device) => device.endpoint().to_string(),
            Err(e) => format!("<{e}>"),
        };
        let state = if source.enabled { "" } else { " (disabled)" };
        println!("  {:<20} {}{}", source.id, endpoint, state);
    }

    println!();
    println!("sinks:");
    let file = &config.sinks.file;
    if file.enabled {
        println!("  {:<20} {}", "file", file.path);
    }
    let es = &config.sinks.elasticsearch;
    if es.enabled {
        println!("  {:<20} {} index={}", "elasticsearch", es.url, es.index);
    }

    println!();
    println!(
        "progress every {} deliveries, shutdown timeout {:?}",
        config.global.progress_interval,
        config.global.shutdown_timeout()
    );
}
