fn main() -> anyhow::Result<()> {
    mindful_notes::cli::run()
}
