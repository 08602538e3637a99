//! Requirements: predicates classifying candidate versions.
//!
//! A [`Requirement`] is evaluated against a [`SelectedVersion`] and yields a
//! three-valued [`Suitability`]. The built-in variants only look at the
//! semantic version; [`Requirement::Custom`] hands the whole selected version
//! (metadata included) to a caller-supplied predicate.
//!
//! Text syntax, accepted by `FromStr` and produced by `Display`:
//!
//! | Text      | Requirement                                   |
//! |-----------|-----------------------------------------------|
//! | `*`       | `Any`                                         |
//! | `>=1.2.0` | `AtLeast(1.2.0)`                              |
//! | `~>1.2.0` | `CompatibleWith(1.2.0, Strict)`               |
//! | `^0.2.3`  | `CompatibleWith(0.2.3, AllowVersionZeroPatches)` |
//! | `==1.2.0` or `1.2.0` | `Exactly(1.2.0)`                   |
//! | `@main`   | pin to versions whose metadata is `"main"`    |
//! | `a, b`    | `Compound([a, b])`                            |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ModelError;
use crate::selected::{Metadata, SelectedVersion};
use crate::version::SemanticVersion;

/// How well a version satisfies a requirement.
///
/// Ordered `Unsuitable < Suitable < BestPossibleChoice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suitability {
    /// The version does not satisfy the requirement.
    Unsuitable,
    /// The version satisfies the requirement.
    Suitable,
    /// The version satisfies the requirement and should be preferred over
    /// every merely suitable candidate, e.g. a pin to a named branch.
    BestPossibleChoice,
}

impl Suitability {
    /// Combine the results of several requirements that must all hold.
    ///
    /// Any `Unsuitable` wins; otherwise any `BestPossibleChoice` wins;
    /// otherwise the result is `Suitable` (including for no inputs).
    pub fn combine<I: IntoIterator<Item = Suitability>>(results: I) -> Suitability {
        let mut combined = Suitability::Suitable;
        for result in results {
            match result {
                Suitability::Unsuitable => return Suitability::Unsuitable,
                Suitability::BestPossibleChoice => combined = Suitability::BestPossibleChoice,
                Suitability::Suitable => {}
            }
        }
        combined
    }

    pub fn is_suitable(self) -> bool {
        self != Suitability::Unsuitable
    }
}

impl From<bool> for Suitability {
    fn from(satisfied: bool) -> Self {
        if satisfied {
            Suitability::Suitable
        } else {
            Suitability::Unsuitable
        }
    }
}

/// How strictly "compatible with" treats `0.y.z` releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strictness {
    /// Strict SemVer: any `0.y.z` release may break compatibility, so only
    /// the same `0.y.z` is compatible.
    #[default]
    Strict,
    /// Accept newer patch releases of the same `0.y`.
    AllowVersionZeroPatches,
}

/// Caller-supplied predicate for [`Requirement::Custom`].
///
/// Must be deterministic for a given (version, context) pair; the resolver
/// evaluates it many times.
pub type Predicate = dyn Fn(&SelectedVersion, &Metadata) -> Suitability + Send + Sync;

/// A predicate plus the opaque context it is evaluated with.
#[derive(Clone)]
pub struct CustomRequirement {
    context: Metadata,
    predicate: Arc<Predicate>,
    description: String,
}

impl CustomRequirement {
    pub fn context(&self) -> &Metadata {
        &self.context
    }

    pub fn evaluate(&self, version: &SelectedVersion) -> Suitability {
        (self.predicate)(version, &self.context)
    }
}

impl PartialEq for CustomRequirement {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.predicate), Arc::as_ptr(&other.predicate))
            && self.context == other.context
    }
}

impl fmt::Debug for CustomRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRequirement")
            .field("context", &self.context)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A constraint placed on the version of one project.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Requirement {
    /// Every version is suitable.
    #[default]
    Any,
    /// Versions not less than the given one.
    AtLeast(SemanticVersion),
    /// Versions backwards-compatible with the given one.
    CompatibleWith(SemanticVersion, Strictness),
    /// Only the given version (build metadata ignored).
    Exactly(SemanticVersion),
    /// A caller-supplied predicate.
    Custom(CustomRequirement),
    /// Every child must hold; see [`Suitability::combine`].
    Compound(Vec<Requirement>),
}

impl Requirement {
    pub fn any() -> Self {
        Requirement::Any
    }

    pub fn at_least(version: SemanticVersion) -> Self {
        Requirement::AtLeast(version)
    }

    pub fn compatible_with(version: SemanticVersion, strictness: Strictness) -> Self {
        Requirement::CompatibleWith(version, strictness)
    }

    pub fn exactly(version: SemanticVersion) -> Self {
        Requirement::Exactly(version)
    }

    /// A requirement that evaluates `predicate` with `context` for every
    /// candidate.
    pub fn custom<F>(predicate: F, context: impl Into<Metadata>) -> Self
    where
        F: Fn(&SelectedVersion, &Metadata) -> Suitability + Send + Sync + 'static,
    {
        let context = context.into();
        let description = format!("custom({context})");
        Requirement::Custom(CustomRequirement {
            context,
            predicate: Arc::new(predicate),
            description,
        })
    }

    /// Pin to the version whose metadata equals `metadata`.
    ///
    /// The matching version is the best possible choice; every other version
    /// is unsuitable. The metadata is also the context handed to the
    /// resolver's metadata lookup, so pinned versions that are never
    /// enumerated can still be found.
    pub fn pinned(metadata: impl Into<Metadata>) -> Self {
        let context = metadata.into();
        let description = format!("@{context}");
        Requirement::Custom(CustomRequirement {
            context,
            predicate: Arc::new(|version: &SelectedVersion, wanted: &Metadata| {
                if version.metadata() == Some(wanted) {
                    Suitability::BestPossibleChoice
                } else {
                    Suitability::Unsuitable
                }
            }),
            description,
        })
    }

    pub fn compound<I: IntoIterator<Item = Requirement>>(requirements: I) -> Self {
        Requirement::Compound(requirements.into_iter().collect())
    }

    /// Fold `other` into this requirement so that both must hold.
    ///
    /// Nested compounds are flattened; the combination rule is associative so
    /// this never changes the result of [`Requirement::satisfied_by`].
    pub fn and(self, other: Requirement) -> Requirement {
        let mut children = match self {
            Requirement::Compound(children) => children,
            requirement => vec![requirement],
        };
        match other {
            Requirement::Compound(more) => children.extend(more),
            requirement => children.push(requirement),
        }
        Requirement::Compound(children)
    }

    /// Determine how well `selected` satisfies this requirement.
    pub fn satisfied_by(&self, selected: &SelectedVersion) -> Suitability {
        let version = selected.version();
        match self {
            Requirement::Any => Suitability::Suitable,
            Requirement::AtLeast(min) => (version >= min).into(),
            Requirement::Exactly(exact) => (version == exact).into(),
            Requirement::CompatibleWith(base, strictness) => {
                is_compatible(base, version, *strictness).into()
            }
            Requirement::Custom(custom) => custom.evaluate(selected),
            Requirement::Compound(children) => {
                Suitability::combine(children.iter().map(|child| child.satisfied_by(selected)))
            }
        }
    }

    /// The contexts of every custom requirement, depth first.
    pub fn custom_contexts(&self) -> Vec<&Metadata> {
        let mut out = Vec::new();
        self.collect_contexts(&mut out);
        out
    }

    fn collect_contexts<'a>(&'a self, out: &mut Vec<&'a Metadata>) {
        match self {
            Requirement::Custom(custom) => out.push(custom.context()),
            Requirement::Compound(children) => {
                for child in children {
                    child.collect_contexts(out);
                }
            }
            _ => {}
        }
    }
}

fn is_compatible(base: &SemanticVersion, candidate: &SemanticVersion, strictness: Strictness) -> bool {
    if candidate < base || candidate.major() != base.major() {
        return false;
    }
    if base.major() > 0 {
        return true;
    }
    if candidate.minor() != base.minor() {
        return false;
    }
    match strictness {
        Strictness::Strict => candidate.patch() == base.patch(),
        Strictness::AllowVersionZeroPatches => candidate.patch() >= base.patch(),
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Any => f.write_str("*"),
            Requirement::AtLeast(v) => write!(f, ">={v}"),
            Requirement::CompatibleWith(v, Strictness::Strict) => write!(f, "~>{v}"),
            Requirement::CompatibleWith(v, Strictness::AllowVersionZeroPatches) => write!(f, "^{v}"),
            Requirement::Exactly(v) => write!(f, "=={v}"),
            Requirement::Custom(custom) => f.write_str(&custom.description),
            Requirement::Compound(children) if children.is_empty() => f.write_str("*"),
            Requirement::Compound(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for Requirement {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() == 1 {
            return parse_single(s, parts[0]);
        }
        parts
            .into_iter()
            .map(|part| parse_single(s, part))
            .collect::<Result<Vec<_>, _>>()
            .map(Requirement::Compound)
    }
}

fn parse_single(input: &str, part: &str) -> Result<Requirement, ModelError> {
    let malformed = |reason: String| ModelError::MalformedRequirement {
        input: input.to_string(),
        reason,
    };
    let version = |text: &str| {
        SemanticVersion::parse(text.trim()).map_err(|e| match e {
            ModelError::MalformedVersion { reason, .. } => malformed(reason),
            other => other,
        })
    };

    if part.is_empty() {
        return Err(malformed("empty requirement".to_string()));
    }
    if part == "*" {
        return Ok(Requirement::Any);
    }
    if let Some(rest) = part.strip_prefix(">=") {
        return Ok(Requirement::AtLeast(version(rest)?));
    }
    if let Some(rest) = part.strip_prefix("~>") {
        return Ok(Requirement::CompatibleWith(version(rest)?, Strictness::Strict));
    }
    if let Some(rest) = part.strip_prefix('^') {
        return Ok(Requirement::CompatibleWith(
            version(rest)?,
            Strictness::AllowVersionZeroPatches,
        ));
    }
    if let Some(rest) = part.strip_prefix("==") {
        return Ok(Requirement::Exactly(version(rest)?));
    }
    if let Some(reference) = part.strip_prefix('@') {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(malformed("empty pin reference".to_string()));
        }
        return Ok(Requirement::pinned(reference));
    }
    Ok(Requirement::Exactly(version(part)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    fn sel(s: &str) -> SelectedVersion {
        SelectedVersion::from(v(s))
    }

    #[test]
    fn any_accepts_everything() {
        assert_eq!(Requirement::any().satisfied_by(&sel("0.0.1")), Suitability::Suitable);
        assert_eq!(Requirement::any().satisfied_by(&sel("9.9.9-rc.1")), Suitability::Suitable);
    }

    #[test]
    fn at_least() {
        let req = Requirement::at_least(v("1.2.0"));
        assert_eq!(req.satisfied_by(&sel("1.2.0")), Suitability::Suitable);
        assert_eq!(req.satisfied_by(&sel("3.0.0")), Suitability::Suitable);
        assert_eq!(req.satisfied_by(&sel("1.1.9")), Suitability::Unsuitable);
    }

    #[test]
    fn exactly_ignores_build_metadata() {
        let req = Requirement::exactly(v("1.0.0+linux"));
        assert_eq!(req.satisfied_by(&sel("1.0.0+mac")), Suitability::Suitable);
        assert_eq!(req.satisfied_by(&sel("1.0.0-rc.1")), Suitability::Unsuitable);
        assert_eq!(req.satisfied_by(&sel("1.0.1")), Suitability::Unsuitable);
    }

    #[test]
    fn compatible_with_major_versions() {
        let req = Requirement::compatible_with(v("1.2.0"), Strictness::Strict);
        assert_eq!(req.satisfied_by(&sel("1.2.0")), Suitability::Suitable);
        assert_eq!(req.satisfied_by(&sel("1.9.9")), Suitability::Suitable);
        assert_eq!(req.satisfied_by(&sel("2.0.0")), Suitability::Unsuitable);
        assert_eq!(req.satisfied_by(&sel("1.1.9")), Suitability::Unsuitable);
    }

    #[test]
    fn compatible_with_version_zero() {
        let strict = Requirement::compatible_with(v("0.2.3"), Strictness::Strict);
        assert_eq!(strict.satisfied_by(&sel("0.2.3")), Suitability::Suitable);
        assert_eq!(strict.satisfied_by(&sel("0.2.9")), Suitability::Unsuitable);

        let loose = Requirement::compatible_with(v("0.2.3"), Strictness::AllowVersionZeroPatches);
        assert_eq!(loose.satisfied_by(&sel("0.2.9")), Suitability::Suitable);
        assert_eq!(loose.satisfied_by(&sel("0.2.2")), Suitability::Unsuitable);
        assert_eq!(loose.satisfied_by(&sel("0.3.0")), Suitability::Unsuitable);
        assert_eq!(loose.satisfied_by(&sel("1.0.0")), Suitability::Unsuitable);
    }

    #[test]
    fn combine_rules() {
        use Suitability::*;
        assert_eq!(Suitability::combine([]), Suitable);
        assert_eq!(Suitability::combine([Suitable, BestPossibleChoice]), BestPossibleChoice);
        assert_eq!(Suitability::combine([BestPossibleChoice, Unsuitable]), Unsuitable);
        assert_eq!(Suitability::combine([Suitable, Suitable]), Suitable);
    }

    #[test]
    fn compound_unsuitable_dominates() {
        let req = Requirement::compound([
            Requirement::custom(
                |_: &SelectedVersion, _: &Metadata| Suitability::BestPossibleChoice,
                "best",
            ),
            Requirement::at_least(v("2.0.0")),
        ]);
        assert_eq!(req.satisfied_by(&sel("1.0.0")), Suitability::Unsuitable);
        assert_eq!(req.satisfied_by(&sel("2.0.0")), Suitability::BestPossibleChoice);
    }

    #[test]
    fn compound_best_dominates_suitable() {
        let target = v("1.5.0");
        let req = Requirement::compound([
            Requirement::at_least(v("1.0.0")),
            Requirement::custom(
                move |s: &SelectedVersion, _: &Metadata| {
                    if *s.version() == target {
                        Suitability::BestPossibleChoice
                    } else {
                        Suitability::Suitable
                    }
                },
                "pin",
            ),
        ]);
        assert_eq!(req.satisfied_by(&sel("1.5.0")), Suitability::BestPossibleChoice);
        assert_eq!(req.satisfied_by(&sel("2.0.0")), Suitability::Suitable);
    }

    #[test]
    fn custom_receives_context() {
        let req = Requirement::custom(
            |s: &SelectedVersion, cx: &Metadata| {
                (Some(&s.version().major()) == cx.downcast_ref::<u64>()).into()
            },
            Metadata::new(3u64),
        );
        assert_eq!(req.satisfied_by(&sel("3.1.0")), Suitability::Suitable);
        assert_eq!(req.satisfied_by(&sel("4.0.0")), Suitability::Unsuitable);
    }

    #[test]
    fn pinned_matches_metadata_only() {
        let req = Requirement::pinned("main");
        let main = SelectedVersion::with_metadata(v("1.0.0"), "main");
        let other = SelectedVersion::with_metadata(v("1.0.0"), "dev");
        assert_eq!(req.satisfied_by(&main), Suitability::BestPossibleChoice);
        assert_eq!(req.satisfied_by(&other), Suitability::Unsuitable);
        assert_eq!(req.satisfied_by(&sel("1.0.0")), Suitability::Unsuitable);
    }

    #[test]
    fn and_flattens() {
        let req = Requirement::at_least(v("1.0.0"))
            .and(Requirement::compound([Requirement::any(), Requirement::exactly(v("1.2.0"))]));
        match &req {
            Requirement::Compound(children) => assert_eq!(children.len(), 3),
            other => panic!("expected compound, got {other:?}"),
        }
        assert_eq!(req.satisfied_by(&sel("1.2.0")), Suitability::Suitable);
        assert_eq!(req.satisfied_by(&sel("1.3.0")), Suitability::Unsuitable);
    }

    #[test]
    fn custom_contexts_are_collected() {
        let req = Requirement::pinned("a").and(Requirement::compound([
            Requirement::any(),
            Requirement::pinned("b"),
        ]));
        let contexts: Vec<String> = req.custom_contexts().iter().map(|m| m.to_string()).collect();
        assert_eq!(contexts, vec!["a", "b"]);
    }

    #[test]
    fn parse_and_display() {
        for text in ["*", ">=1.2.0", "~>1.2.0", "^0.2.3", "==1.0.0-beta.1", "@main", ">=1.0.0, ~>1.4.0"] {
            let req: Requirement = text.parse().unwrap();
            assert_eq!(req.to_string(), text);
        }
        let bare: Requirement = "2.0.0".parse().unwrap();
        assert_eq!(bare, Requirement::exactly(v("2.0.0")));
    }

    #[test]
    fn parse_errors() {
        for text in ["", ">=", "~>1.2", "1.0.0,", "@", ">=x.y.z"] {
            let err = text.parse::<Requirement>().unwrap_err();
            assert!(
                matches!(err, ModelError::MalformedRequirement { ref input, .. } if input == text),
                "{text}: {err:?}"
            );
        }
    }
}
