fn main() -> anyhow::Result<()> {
    mtlib::cli::run_cli()
}
