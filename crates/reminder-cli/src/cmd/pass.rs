use crate::output::print_json;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_checked_config(root)?;
    let engine = super::build_engine(root, &config)?;

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(engine.run_pass());

    if json {
        print_json(&report)?;
    } else {
        println!("{report}");
    }

    if let Some(err) = &report.load_error {
        anyhow::bail!("pass aborted: {err}");
    }
    Ok(())
}
