//! Handler for `arbiter why`.

use miette::Result;

use arbiter_resolver::Dependent;
use arbiter_util::errors::ArbiterError;

use super::Session;

pub fn exec(session: &Session, project: &str) -> Result<()> {
    let resolution = session.resolve()?;
    let graph = &resolution.graph;
    let project = project.to_string();

    let Some(path) = graph.find_path(&project) else {
        return Err(ArbiterError::Resolution {
            message: format!("`{project}` is not part of the resolved graph"),
        }
        .into());
    };

    println!("{}", console::style(format!("Path to {project}:")).bold());
    println!("root");
    for (i, node) in path.iter().enumerate() {
        let indent = "  ".repeat(i + 1);
        println!("{indent}{node}");
    }

    println!();
    println!("{}", console::style("Required by:").bold());
    for (dependent, requirement) in graph.requirements_on(&project) {
        let who = match &dependent {
            Dependent::Root => "root".to_string(),
            Dependent::Project(p) => match graph.version_for(p) {
                Some(version) => format!("{p} {version}"),
                None => p.clone(),
            },
        };
        println!("  {who} ({requirement})");
    }
    Ok(())
}
