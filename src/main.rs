fn main() -> anyhow::Result<()> {
    Ok(edict::run()?)
}
