//! Error types for dependency graph construction

/// Dependency graph construction failures
///
/// Both variants reflect invalid extractor output rather than a transient
/// fault: they abort workflow generation for the document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A step depends on a step that does not exist
    #[error("step {step} depends on unknown step {missing_id}")]
    MissingDependency {
        /// Step declaring the dependency
        step: u32,
        /// The dependency that names no step
        missing_id: u32,
    },

    /// Two steps share a number
    #[error("duplicate step number {0}")]
    DuplicateStep(u32),

    /// Circular dependency
    #[error("circular dependency: {}", format_cycle(.cycle_path))]
    Cycle {
        /// Steps on the cycle in prerequisite -> dependent order, first step repeated at the end
        cycle_path: Vec<u32>,
    },
}

impl GraphError {
    /// Whether this is a cycle rejection
    #[inline]
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle { .. })
    }

    /// Whether this is a referential-integrity rejection
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingDependency { .. } | Self::DuplicateStep(_))
    }
}

fn format_cycle(path: &[u32]) -> String {
    path.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_display_names_every_step() {
        let err = GraphError::Cycle {
            cycle_path: vec![1, 2, 3, 1],
        };
        assert_eq!(err.to_string(), "circular dependency: 1 -> 2 -> 3 -> 1");
        assert!(err.is_cycle());
        assert!(!err.is_validation());
    }

    #[test]
    fn missing_dependency_is_validation() {
        let err = GraphError::MissingDependency {
            step: 2,
            missing_id: 9,
        };
        assert!(err.is_validation());
        assert!(err.to_string().contains("unknown step 9"));
    }
}
