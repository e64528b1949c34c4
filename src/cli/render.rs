use std::error::Error;
use std::path::Path;

use crate::cli::read_input;
use crate::core::config::Config;
use crate::markdown::{Parser, Token};
use crate::render::{line_text, RenderTheme, Renderer};

/// Parse `input` the way a stream consumer would: tolerant while the stream
/// is still running, final otherwise.
pub fn parse_document(config: &Config, input: &str, streaming: bool) -> Vec<Token> {
    let parser = Parser::with_extensions(config.extension_set());
    if streaming {
        parser.parse(input)
    } else {
        parser.parse_final(input)
    }
}

pub fn render_document(config: &Config, tokens: &[Token]) -> Vec<String> {
    Renderer::new()
        .with_theme(RenderTheme::plain())
        .with_extensions(config.extension_set())
        .render(tokens)
        .iter()
        .map(line_text)
        .collect()
}

pub fn run_render(
    config: &Config,
    file: Option<&Path>,
    json: bool,
    streaming: bool,
) -> Result<(), Box<dyn Error>> {
    let input = read_input(file)?;
    let tokens = parse_document(config, &input, streaming);

    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
        return Ok(());
    }
    for line in render_document(config, &tokens) {
        println!("{line}");
    }
    Ok(())
}
