//! Version conflict descriptions and reporting.

use std::fmt;

/// Why no version could be chosen for a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    /// The project has no available versions at all.
    NoVersions,
    /// Versions exist, but none satisfies every accumulated requirement.
    NoSuitableVersion,
    /// Two candidates are each pinned as the best possible choice by
    /// different dependents.
    DivergentPins { first: String, second: String },
    /// Selecting `version` led back to a state already on the search path:
    /// the rebinds in between went in a circle.
    Circular { version: String },
}

/// One requirement that contributed to a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictCause {
    /// `root`, or `project version` for the dependent that placed it.
    pub dependent: String,
    pub requirement: String,
}

/// A project for which no version could be chosen, with the chain of
/// requirements that produced the conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub project: String,
    /// The version held before the conflicting requirement arrived, if any.
    pub attempted: Option<String>,
    /// The accumulated requirement, rendered.
    pub requirement: String,
    pub chain: Vec<ConflictCause>,
    pub kind: ConflictKind,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConflictKind::NoVersions => {
                write!(f, "no versions of `{}` are available", self.project)?
            }
            ConflictKind::NoSuitableVersion => write!(
                f,
                "no version of `{}` satisfies {}",
                self.project, self.requirement
            )?,
            ConflictKind::DivergentPins { first, second } => write!(
                f,
                "`{}` is pinned to both {first} and {second}",
                self.project
            )?,
            ConflictKind::Circular { version } => write!(
                f,
                "selecting `{}` {version} undoes an earlier choice",
                self.project
            )?,
        }
        if let Some(attempted) = &self.attempted {
            write!(f, " (had selected {attempted})")?;
        }
        for cause in &self.chain {
            write!(
                f,
                "\n  {} requires {} {}",
                cause.dependent, self.project, cause.requirement
            )?;
        }
        Ok(())
    }
}

/// Every conflict encountered during one resolution, in discovery order.
///
/// Most conflicts are recovered by backtracking; the report is kept for
/// diagnostics.
#[derive(Debug, Default, Clone)]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conflict: Conflict) {
        self.conflicts.push(conflict);
    }

    pub fn last(&self) -> Option<&Conflict> {
        self.conflicts.last()
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Conflict {
        Conflict {
            project: "b".to_string(),
            attempted: None,
            requirement: "==1.0.0".to_string(),
            chain: vec![ConflictCause {
                dependent: "a 2.0.0".to_string(),
                requirement: "==1.0.0".to_string(),
            }],
            kind: ConflictKind::NoSuitableVersion,
        }
    }

    #[test]
    fn empty_report() {
        let report = ConflictReport::new();
        assert!(report.is_empty());
        assert_eq!(report.len(), 0);
        assert_eq!(report.to_string(), "No version conflicts.");
    }

    #[test]
    fn report_with_conflicts() {
        let mut report = ConflictReport::new();
        report.add(sample());
        assert!(!report.is_empty());
        assert_eq!(report.len(), 1);
        let s = report.to_string();
        assert!(s.contains("no version of `b` satisfies ==1.0.0"));
        assert!(s.contains("a 2.0.0 requires b ==1.0.0"));
    }

    #[test]
    fn attempted_version_is_shown() {
        let mut conflict = sample();
        conflict.attempted = Some("2.0.0".to_string());
        assert!(conflict.to_string().contains("(had selected 2.0.0)"));
    }

    #[test]
    fn divergent_pins_display() {
        let mut conflict = sample();
        conflict.kind = ConflictKind::DivergentPins {
            first: "2.0.0".to_string(),
            second: "1.0.0".to_string(),
        };
        assert!(conflict
            .to_string()
            .starts_with("`b` is pinned to both 2.0.0 and 1.0.0"));
    }

    #[test]
    fn circular_display() {
        let mut conflict = sample();
        conflict.kind = ConflictKind::Circular {
            version: "1.0.0".to_string(),
        };
        assert!(conflict
            .to_string()
            .starts_with("selecting `b` 1.0.0 undoes an earlier choice"));
    }
}
