fn main() -> anyhow::Result<()> {
    twopane_notes::cli::run()
}
