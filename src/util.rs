
use crate::config::Config;
use crate::errors::*;

pub fn load_config_from_file(path: &str) -> Result<Config> {
    use std::fs::File;
    use std::io::Read;

    let mut file = File::open(path).chain_err(|| "Failed to open config file")?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).chain_err(|| "Failed to read file")?;

    let config = toml::de::from_str(&contents).chain_err(|| "Failed to deserialize config")?;

    Ok(config)
}

/// Renders the whole cause chain, one line per link, for the crit log on
/// exit.
pub fn get_error_trace(e: &Error) -> String {
    let mut trace = format!("Error: {}", e);
    for cause in e.iter().skip(1) {
        trace.push_str(&format!("\nCaused by: {}", cause));
    }
    trace
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_trace_lists_the_cause_chain() {
        let err = Err::<(), Error>(ErrorKind::Link("broker unreachable".into()).into())
            .chain_err(|| "Failed to open the mission link")
            .expect_err("chained error");
        let trace = get_error_trace(&err);
        assert!(trace.starts_with("Error: Failed to open the mission link"));
        assert!(trace.contains("\nCaused by: link error: broker unreachable"));
    }
}
