use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    streamark::cli::main()
}
