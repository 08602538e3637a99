//! Handler for `arbiter resolve`.

use miette::Result;

use arbiter_util::progress;

use super::Session;

pub fn exec(session: &Session, conflicts: bool) -> Result<()> {
    let resolution = session.resolve()?;

    for node in resolution.graph.projects() {
        println!("{} {}", node.project, node.version);
    }
    if conflicts {
        println!("{}", resolution.conflicts);
    }

    progress::status(
        "Resolved",
        &format!(
            "{} project(s) in {} iteration(s)",
            resolution.graph.len(),
            resolution.iterations
        ),
    );
    Ok(())
}
