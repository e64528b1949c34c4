use crate::core::config::data::Config;

fn or_unset(value: Option<&str>) -> &str {
    value.unwrap_or("(unset)")
}

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        println!("  base_url: {}", self.base_url());
        println!("  model: {}", self.model());
        match self.api_key() {
            Some(_) => println!("  api_key_env: {} (set)", self.api_key_env()),
            None => println!("  api_key_env: {} (not set)", self.api_key_env()),
        }
        println!("  request_timeout_secs: {}", self.request_timeout().as_secs());
        println!(
            "  fallback_message: {}",
            or_unset(self.fallback_message.as_deref())
        );
        match self.markdown_enabled() {
            true => println!("  markdown: on"),
            false => println!("  markdown: off"),
        }
        if self.extensions.is_empty() {
            println!("  extensions: (none)");
        } else {
            println!("  extensions: {}", self.extensions.join(", "));
        }
        self.print_reveal();
    }

    fn print_reveal(&self) {
        println!("  reveal:");
        match self.reveal.to_config() {
            Ok(reveal) => {
                println!("    step: {}", reveal.step);
                println!("    interval_ms: {}", reveal.interval.as_millis());
                println!("    suffix: {}", or_unset(reveal.suffix.as_deref()));
            }
            Err(err) => println!("    invalid: {err}"),
        }
    }
}
