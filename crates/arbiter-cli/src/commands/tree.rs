//! Handler for `arbiter tree`.

use miette::Result;

use super::Session;

pub fn exec(session: &Session, depth: Option<usize>, invert: Option<&str>) -> Result<()> {
    let resolution = session.resolve()?;
    let graph = &resolution.graph;

    match invert {
        Some(project) => {
            let project = project.to_string();
            if graph.version_for(&project).is_none() {
                println!("Project '{project}' not found in the graph.");
                return Ok(());
            }
            print!("{}", graph.print_inverted_tree(&project));
        }
        None => print!("{}", graph.print_tree(depth)),
    }

    for cycle in graph.cycles() {
        tracing::warn!("dependency cycle: {}", cycle.join(" -> "));
    }
    Ok(())
}
