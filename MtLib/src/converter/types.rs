//! Types for model conversion progress tracking

// ============================================================================
// Progress Types
// ============================================================================

/// Progress callback type for model conversion operations
pub type ModelProgressCallback<'a> = &'a (dyn Fn(&ModelProgress) + Sync + Send);

/// Progress information during model conversion operations
#[derive(Debug, Clone)]
pub struct ModelProgress {
    /// Current operation phase
    pub phase: ModelPhase,
    /// Current item number (1-indexed)
    pub current: usize,
    /// Total number of items
    pub total: usize,
    /// Current primitive or file being processed (if applicable)
    pub current_item: Option<String>,
}

impl ModelProgress {
    /// Create a new progress update
    #[must_use]
    pub fn new(phase: ModelPhase, current: usize, total: usize) -> Self {
        Self {
            phase,
            current,
            total,
            current_item: None,
        }
    }

    /// Create a progress update with an item name
    #[must_use]
    pub fn with_item(phase: ModelPhase, current: usize, total: usize, item: impl Into<String>) -> Self {
        Self {
            phase,
            current,
            total,
            current_item: Some(item.into()),
        }
    }

    /// Get the progress percentage (0.0 - 1.0)
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f32 / self.total as f32
        }
    }
}

/// Phase of a model conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPhase {
    /// Reading the input file
    ReadingFile,
    /// Decoding primitive vertex and index data
    DecodingPrimitives,
    /// Running the mesh optimizer on each primitive
    OptimizingPrimitives,
    /// Quantizing vertices into the vertex buffer
    EncodingVertices,
    /// Writing the output file
    WritingFile,
    /// Operation complete
    Complete,
}

impl ModelPhase {
    /// Get a human-readable description of this phase
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadingFile => "Reading file",
            Self::DecodingPrimitives => "Decoding primitives",
            Self::OptimizingPrimitives => "Optimizing primitives",
            Self::EncodingVertices => "Encoding vertices",
            Self::WritingFile => "Writing file",
            Self::Complete => "Complete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(ModelProgress::new(ModelPhase::EncodingVertices, 1, 4).percentage(), 0.25);
        assert_eq!(ModelProgress::new(ModelPhase::Complete, 0, 0).percentage(), 1.0);
        let p = ModelProgress::with_item(ModelPhase::OptimizingPrimitives, 2, 3, "body");
        assert_eq!(p.current_item.as_deref(), Some("body"));
        assert_eq!(p.phase.as_str(), "Optimizing primitives");
    }
}
