use crate::config::Config;

pub fn cmd_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("Config file created. Set steam.api_key in config.toml and run again.");
    } else {
        println!("Config file already exists, nothing to do.");
    }
    Ok(())
}
