//! Per-domain preprocessors: `RawStream` in, `ProcessedStream` out (spec §4.2).
//!
//! Each domain filters nodes/edges through the shared stoplist/degree-cap
//! contract in [`common`], then assigns its own closed tag set and computes
//! `step_features` via the quality/nav_noise/stability triplet. Dispatch is
//! by an exhaustive enum rather than trait objects, matching the "no duck
//! typing" requirement for registry-style lookups.

pub mod common;
pub mod conversation;
pub mod conversation_brainstorm;
pub mod creation_blueprint;
pub mod curriculum;
pub mod research_learning;

use axiom_core::config::CoreConfig;
use axiom_core::errors::AxiomError;
use axiom_core::model::{ProcessedStream, RawStream};

pub use conversation::ConversationPreprocessor;
pub use conversation_brainstorm::ConversationBrainstormPreprocessor;
pub use creation_blueprint::CreationBlueprintPreprocessor;
pub use curriculum::CurriculumPreprocessor;
pub use research_learning::ResearchLearningPreprocessor;

/// A fully-resolved, domain-specific preprocessor. One variant per name the
/// registry accepts (spec §6); constructed once per course.
pub enum DomainPreprocessor {
    Curriculum(CurriculumPreprocessor),
    Conversation(ConversationPreprocessor),
    ConversationBrainstorm(ConversationBrainstormPreprocessor),
    ResearchLearning(ResearchLearningPreprocessor),
    CreationBlueprint(CreationBlueprintPreprocessor),
}

impl DomainPreprocessor {
    /// Resolve a domain name (as carried in `meta.domain`, or an adapter
    /// name with its `_stream` suffix stripped) to a preprocessor.
    pub fn for_domain(domain: &str, core: &CoreConfig) -> Result<Self, AxiomError> {
        match domain {
            "curriculum" => Ok(Self::Curriculum(CurriculumPreprocessor::new(core))),
            "conversation" => Ok(Self::Conversation(ConversationPreprocessor::new(core))),
            "conversation_brainstorm" => {
                Ok(Self::ConversationBrainstorm(ConversationBrainstormPreprocessor::new(core)))
            }
            "research_learning" => Ok(Self::ResearchLearning(ResearchLearningPreprocessor::new(core))),
            "creation_blueprint" => Ok(Self::CreationBlueprint(CreationBlueprintPreprocessor::new(core))),
            other => Err(AxiomError::UnknownAdapter(other.to_string())),
        }
    }

    pub fn process(&self, raw: RawStream) -> ProcessedStream {
        match self {
            Self::Curriculum(p) => p.process(raw),
            Self::Conversation(p) => p.process(raw),
            Self::ConversationBrainstorm(p) => p.process(raw),
            Self::ResearchLearning(p) => p.process(raw),
            Self::CreationBlueprint(p) => p.process(raw),
        }
    }
}
