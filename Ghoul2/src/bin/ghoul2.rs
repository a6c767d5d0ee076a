fn main() -> anyhow::Result<()> {
    ghoul2::cli::run_cli()
}
