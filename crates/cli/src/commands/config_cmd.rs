//! `warren config` — Print a default configuration file.

use warren_config::AppConfig;

pub fn run() {
    println!("# Save as {}", AppConfig::config_dir().join("config.toml").display());
    println!("{}", AppConfig::default_toml());
}
