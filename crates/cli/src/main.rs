fn main() -> Result<(), Box<dyn std::error::Error>> {
    storyvault_cli::run()
}
