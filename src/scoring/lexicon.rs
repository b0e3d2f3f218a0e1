//! Built-in eight-dimension evaluation lexicon.

use super::config::DimensionSpec;

struct Entry {
    name: &'static str,
    weight: f64,
    description: &'static str,
    positive: &'static [&'static str],
    negative: &'static [&'static str],
    suggestions: &'static [&'static str],
}

const ENTRIES: &[Entry] = &[
    Entry {
        name: "performance",
        weight: 0.25,
        description: "Quantity and quality of work output",
        positive: &[
            "excellent", "outstanding", "exceptional", "achieved", "completed", "success",
            "efficient", "productive", "exceeded", "quality", "accurate", "prompt", "thorough",
            "professional", "systematic", "reliable", "optimized", "skilled",
        ],
        negative: &[
            "lacking", "insufficient", "delayed", "failed", "failure", "problem", "error",
            "late", "missed", "inaccurate", "incomplete", "sloppy", "below target",
        ],
        suggestions: &[
            "Agree on measurable weekly delivery targets and review them together.",
            "Break large deliverables into checkpoints with explicit quality criteria.",
            "Pair with a senior colleague on the next deliverable to tighten quality.",
        ],
    },
    Entry {
        name: "kpi_achievement",
        weight: 0.20,
        description: "Attainment of key performance indicators",
        positive: &[
            "kpi met", "target met", "exceeded target", "above target", "revenue growth",
            "growth", "increase", "improved", "surpassed", "record",
        ],
        negative: &[
            "kpi missed", "target missed", "underperformed", "decline", "decrease",
            "stagnant", "shortfall", "below plan",
        ],
        suggestions: &[
            "Review the KPI definitions and confirm the targets are understood.",
            "Track leading indicators monthly instead of waiting for quarter end.",
            "Identify the single KPI with the largest gap and plan focused actions.",
        ],
    },
    Entry {
        name: "attitude",
        weight: 0.15,
        description: "Work attitude and mindset",
        positive: &[
            "proactive", "positive", "passionate", "diligent", "responsible", "committed",
            "dedicated", "motivated", "eager", "ownership", "enthusiastic", "willing",
        ],
        negative: &[
            "passive", "negative", "indifferent", "careless", "avoids", "cynical",
            "complacent", "unmotivated", "lazy", "disengaged",
        ],
        suggestions: &[
            "Set one stretch goal owned end to end for the next cycle.",
            "Discuss what drives engagement and adjust assignments accordingly.",
            "Schedule regular check-ins to recognise progress and effort.",
        ],
    },
    Entry {
        name: "communication",
        weight: 0.15,
        description: "Clarity and effectiveness of communication",
        positive: &[
            "clear", "concise", "responsive", "listens", "communicates", "transparent",
            "articulate", "persuasive", "shares", "open", "effective", "kind",
        ],
        negative: &[
            "unclear", "unresponsive", "ignores", "misunderstanding", "silent", "one-sided",
            "closed", "miscommunication", "conflict", "abrupt",
        ],
        suggestions: &[
            "Send a short written summary after key meetings to confirm understanding.",
            "Practise active listening by restating requests before acting on them.",
            "Agree on response-time expectations with the team.",
        ],
    },
    Entry {
        name: "leadership",
        weight: 0.10,
        description: "Leadership and collaboration",
        positive: &[
            "leadership", "teamwork", "collaborates", "supportive", "mentoring", "mentors",
            "motivates", "coordinates", "delegates", "coaching", "influence", "respectful",
        ],
        negative: &[
            "autocratic", "uncooperative", "isolated", "divisive", "selfish", "obstructive",
            "authoritarian", "domineering", "individualistic",
        ],
        suggestions: &[
            "Take the lead on a small cross-team initiative with a clear scope.",
            "Mentor a newer colleague for one quarter.",
            "Ask for 360-degree feedback on collaboration style.",
        ],
    },
    Entry {
        name: "expertise",
        weight: 0.08,
        description: "Professional expertise and learning",
        positive: &[
            "expert", "expertise", "knowledgeable", "technical", "learning", "learns quickly",
            "competent", "capable", "certified", "research", "mastery", "develops skills",
        ],
        negative: &[
            "inexperienced", "unskilled", "outdated", "lacks knowledge", "incompetent",
            "slow to learn", "skill gap",
        ],
        suggestions: &[
            "Build a learning plan with one certification or course this half-year.",
            "Reserve weekly time for deliberate practice on a core skill.",
            "Present a topic to the team to consolidate knowledge.",
        ],
    },
    Entry {
        name: "innovation",
        weight: 0.05,
        description: "Creativity and drive for change",
        positive: &[
            "creative", "innovative", "idea", "initiative", "novel", "original", "pioneering",
            "experiment", "improvement", "inventive",
        ],
        negative: &[
            "rigid", "conservative", "resists change", "conventional", "stuck", "inflexible",
            "routine-bound",
        ],
        suggestions: &[
            "Propose one process improvement per quarter and measure its effect.",
            "Join a brainstorming session outside the usual area of work.",
            "Run a small time-boxed experiment on a recurring pain point.",
        ],
    },
    Entry {
        name: "organizational_fit",
        weight: 0.02,
        description: "Adaptation to organizational culture and ethics",
        positive: &[
            "adapts", "integrates", "harmonious", "culture", "compliant", "ethical", "trusted",
            "consistent", "loyal", "stable",
        ],
        negative: &[
            "maladjusted", "violation", "unethical", "distrust", "deviant", "misconduct",
            "noncompliant", "friction",
        ],
        suggestions: &[
            "Review the code of conduct and team working agreements together.",
            "Assign an onboarding buddy to support cultural integration.",
            "Clarify escalation paths for concerns about policy or ethics.",
        ],
    },
];

/// The built-in dimension set. Weights sum to 1.0.
pub fn default_dimensions() -> Vec<DimensionSpec> {
    ENTRIES
        .iter()
        .map(|e| DimensionSpec {
            name: e.name.to_string(),
            weight: e.weight,
            description: e.description.to_string(),
            positive: e.positive.iter().map(|s| s.to_string()).collect(),
            negative: e.negative.iter().map(|s| s.to_string()).collect(),
            suggestions: e.suggestions.iter().map(|s| s.to_string()).collect(),
        })
        .collect()
}
