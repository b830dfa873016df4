use crate::models::domain::generation::LearningPurpose;

/// A quiz category the model may tag an item with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub description: &'static str,
}

pub const GENERAL_CATEGORIES: [Category; 5] = [
    Category {
        id: "concept",
        description: "definitions and core ideas",
    },
    Category {
        id: "mechanism",
        description: "how something works, processes and causes",
    },
    Category {
        id: "application",
        description: "applying the material to a concrete case",
    },
    Category {
        id: "comparison",
        description: "similarities and differences between ideas",
    },
    Category {
        id: "problem-solving",
        description: "using the material to solve a problem",
    },
];

pub const RESEARCH_CATEGORIES: [Category; 7] = [
    Category {
        id: "motivation",
        description: "the problem the work addresses and why it matters",
    },
    Category {
        id: "related-work",
        description: "prior work and how this work differs",
    },
    Category {
        id: "method",
        description: "the proposed approach and its design",
    },
    Category {
        id: "experiment",
        description: "experimental setup, datasets and results",
    },
    Category {
        id: "limitation",
        description: "weaknesses and threats to validity",
    },
    Category {
        id: "summary",
        description: "main contributions and conclusions",
    },
    Category {
        id: "critical-thinking",
        description: "evaluating claims and proposing extensions",
    },
];

pub fn taxonomy(purpose: LearningPurpose) -> &'static [Category] {
    match purpose {
        LearningPurpose::General => &GENERAL_CATEGORIES,
        LearningPurpose::Research => &RESEARCH_CATEGORIES,
    }
}

/// Returns the canonical id when `candidate` names a category of the taxonomy.
pub fn resolve_category(purpose: LearningPurpose, candidate: &str) -> Option<&'static str> {
    let wanted = candidate.trim().to_ascii_lowercase().replace(['_', ' '], "-");
    taxonomy(purpose)
        .iter()
        .find(|c| c.id == wanted)
        .map(|c| c.id)
}
