use super::tone::Tone;

pub const TEMPLATE_PLACEHOLDER: &str = "{template}";
pub const INSTRUCTION_PLACEHOLDER: &str = "{instruction}";
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

/// A canned prompt body, optionally specialised per tone.
///
/// Tone bodies may contain `{template}`, which is replaced by the generic body.
#[derive(Debug)]
pub struct Template {
    pub name: &'static str,
    /// Keyword looked for in the lowercased instruction. Empty only for the default.
    pub instruction: &'static str,
    pub template: &'static str,
    pub tones: &'static [(Tone, &'static str)],
}

impl Template {
    pub fn tone_body(&self, tone: Tone) -> Option<&'static str> {
        self.tones
            .iter()
            .find(|(t, _)| *t == tone)
            .map(|(_, body)| *body)
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_TEMPLATE.name
    }
}

pub static DEFAULT_TEMPLATE: Template = Template {
    name: "default",
    instruction: "",
    template: "{instruction}{context}",
    tones: &[
        (Tone::Formal, "Provide a formal response to the following: {template}"),
        (Tone::Casual, "In a casual way, address the following: {template}"),
        (Tone::Technical, "Provide a technical analysis of: {template}"),
        (Tone::Simple, "Explain in simple terms: {template}"),
        (Tone::Creative, "Creatively address: {template}"),
    ],
};

/// Keyword templates in match order.
pub static TEMPLATES: &[Template] = &[
    Template {
        name: "joke",
        instruction: "tell me a joke",
        template: "Generate a clean, light-hearted, and amusing joke suitable for general audiences. The joke should be original and incorporate clever wordplay or situational humor.",
        tones: &[
            (Tone::Formal, "Create a sophisticated humorous anecdote suitable for professional settings."),
            (Tone::Casual, "Tell a fun, relatable joke that friends might share."),
            (Tone::Technical, "Construct a joke involving technical or scientific concepts."),
            (Tone::Simple, "Share a simple, easy-to-understand joke."),
            (Tone::Creative, "Create a unique, imaginative joke with unexpected elements."),
        ],
    },
    Template {
        name: "story",
        instruction: "tell me a story",
        template: "Create an engaging short story that captures the imagination and delivers a satisfying conclusion.",
        tones: &[
            (Tone::Formal, "Compose a refined narrative suitable for literary publication."),
            (Tone::Casual, "Share an entertaining story as if telling it to friends."),
            (Tone::Technical, "Construct a narrative incorporating technical or scientific elements."),
            (Tone::Simple, "Tell an easy-to-follow story for general audiences."),
            (Tone::Creative, "Craft an imaginative tale with unique elements."),
        ],
    },
    Template {
        name: "explain",
        instruction: "explain",
        template: "Provide a clear, comprehensive explanation suitable for a general audience, using analogies where helpful.",
        tones: &[
            (Tone::Formal, "Present a structured, academic explanation."),
            (Tone::Casual, "Explain in a friendly, conversational way."),
            (Tone::Technical, "Provide a detailed technical explanation with proper terminology."),
            (Tone::Simple, "Explain in the simplest possible terms."),
            (Tone::Creative, "Explain using creative analogies and examples."),
        ],
    },
    Template {
        name: "summarize",
        instruction: "summarize",
        template: "Create a concise summary that captures the key points while maintaining clarity and context.",
        tones: &[
            (Tone::Formal, "Provide a formal executive summary."),
            (Tone::Casual, "Give a quick, friendly overview."),
            (Tone::Technical, "Create a technical abstract with key specifications."),
            (Tone::Simple, "Summarize in plain, accessible language."),
            (Tone::Creative, "Create an engaging summary with creative elements."),
        ],
    },
    Template {
        name: "analyze",
        instruction: "analyze",
        template: "Provide a thorough analysis considering multiple aspects and perspectives.",
        tones: &[
            (Tone::Formal, "Conduct a formal analytical assessment."),
            (Tone::Casual, "Break down the analysis in an approachable way."),
            (Tone::Technical, "Perform a detailed technical analysis."),
            (Tone::Simple, "Analyze in clear, straightforward terms."),
            (Tone::Creative, "Provide an innovative analytical perspective."),
        ],
    },
    Template {
        name: "compare",
        instruction: "compare",
        template: "Create a detailed comparison highlighting key similarities and differences.",
        tones: &[
            (Tone::Formal, "Present a structured comparative analysis."),
            (Tone::Casual, "Compare in a friendly, relatable way."),
            (Tone::Technical, "Provide a technical comparison with specific metrics."),
            (Tone::Simple, "Compare using simple, clear terms."),
            (Tone::Creative, "Create an imaginative comparison."),
        ],
    },
];

/// Picks the first keyword template contained in `instruction`, falling back
/// to the default template. Never fails.
pub fn select_template(instruction: &str) -> &'static Template {
    let lowercase = instruction.to_lowercase();

    TEMPLATES
        .iter()
        // An empty keyword is a substring of everything; only the fallback may match that way.
        .filter(|t| !t.instruction.is_empty())
        .find(|t| lowercase.contains(t.instruction))
        .unwrap_or(&DEFAULT_TEMPLATE)
}
